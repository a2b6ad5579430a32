// Platform discovery: registering new accessories and restoring cached ones.

use parking_lot::Mutex;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use wiiu_bridge::accessory::{CharacteristicPusher, CharacteristicUpdate};
use wiiu_bridge::catalog::TitleList;
use wiiu_bridge::config::{Config, DeviceConfig};
use wiiu_bridge::platform::{
    AccessoryCategory, AccessoryContext, AccessoryHost, PLATFORM_NAME, PLUGIN_NAME,
    PlatformAccessory, WiiUPlatform, accessory_uuid,
};

#[derive(Default)]
struct RecordingHost {
    registered: Mutex<Vec<(String, String, PlatformAccessory)>>,
    updated: Mutex<Vec<PlatformAccessory>>,
    pushed: Arc<Mutex<Vec<CharacteristicUpdate>>>,
}

impl AccessoryHost for RecordingHost {
    fn register_accessories(&self, plugin: &str, platform: &str, accessories: &[PlatformAccessory]) {
        let mut registered = self.registered.lock();
        for accessory in accessories {
            registered.push((plugin.to_string(), platform.to_string(), accessory.clone()));
        }
    }

    fn update_accessories(&self, accessories: &[PlatformAccessory]) {
        self.updated.lock().extend_from_slice(accessories);
    }

    fn characteristic_pusher(&self, _accessory: &PlatformAccessory) -> CharacteristicPusher {
        let pushed = self.pushed.clone();
        Arc::new(move |update| pushed.lock().push(update))
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

async fn console(serial: Option<&str>) -> MockServer {
    let server = MockServer::start().await;
    let serial_response = match serial {
        Some(serial) => ResponseTemplate::new(200).set_body_string(serial),
        None => ResponseTemplate::new(500),
    };
    Mock::given(method("GET"))
        .and(path("/device/serial_id"))
        .respond_with(serial_response)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/title/list"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"{"000500001010ed00":"Mario Kart 8"}"#),
        )
        .mount(&server)
        .await;
    server
}

fn config_for(server: &MockServer, cache_dir: &TempDir) -> (Config, DeviceConfig) {
    let device = DeviceConfig::new("Living Room", "127.0.0.1", server.address().port());
    let config = Config {
        cache_dir: Some(cache_dir.path().to_path_buf()),
        devices: vec![device.clone()],
        ..Config::default()
    };
    (config, device)
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_new_device_is_registered_and_cached() {
    let server = console(Some("FW123456789")).await;
    let dir = tempfile::tempdir().unwrap();
    let (config, device) = config_for(&server, &dir);
    let cache_path = config.title_cache_path(&device);

    let host = Arc::new(RecordingHost::default());
    let platform = WiiUPlatform::new(config, host.clone());
    let televisions = platform.discover_devices().await;
    platform.shutdown();

    assert_eq!(televisions.len(), 1);
    let registered = host.registered.lock();
    assert_eq!(registered.len(), 1);
    let (plugin, platform_name, accessory) = &registered[0];
    assert_eq!(plugin, PLUGIN_NAME);
    assert_eq!(platform_name, PLATFORM_NAME);
    assert_eq!(accessory.display_name, "Living Room");
    assert_eq!(accessory.category, AccessoryCategory::Television);
    assert_eq!(accessory.uuid, accessory_uuid(Some("FW123456789"), &device));
    assert!(host.updated.lock().is_empty());

    // Title cache written for this device
    let cached: TitleList =
        serde_json::from_str(&std::fs::read_to_string(cache_path).unwrap()).unwrap();
    assert_eq!(cached.name_of("000500001010ed00"), Some("Mario Kart 8"));

    let pushed = host.pushed.lock();
    assert!(matches!(
        pushed.first(),
        Some(CharacteristicUpdate::Information(info)) if info.serial_number == "FW123456789"
    ));
    assert!(pushed
        .iter()
        .any(|update| matches!(update, CharacteristicUpdate::InputSources(s) if s.len() == 5)));
}

#[tokio::test]
async fn test_cached_accessory_is_restored_not_registered() {
    let server = console(Some("FW123456789")).await;
    let dir = tempfile::tempdir().unwrap();
    let (config, device) = config_for(&server, &dir);

    let uuid = accessory_uuid(Some("FW123456789"), &device);
    let stale_device = DeviceConfig::new("Living Room", "192.168.1.50", 8572);
    let host = Arc::new(RecordingHost::default());
    let platform = WiiUPlatform::new(config, host.clone());
    platform.configure_accessory(PlatformAccessory {
        uuid,
        display_name: "Living Room".to_string(),
        category: AccessoryCategory::Television,
        context: AccessoryContext {
            device: stale_device,
        },
    });

    platform.discover_devices().await;
    platform.shutdown();

    assert!(host.registered.lock().is_empty());
    let updated = host.updated.lock();
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].uuid, uuid);
    // Context follows the current configuration
    assert_eq!(updated[0].context.device, device);
}

#[tokio::test]
async fn test_missing_serial_identifies_by_address() {
    let server = console(None).await;
    let dir = tempfile::tempdir().unwrap();
    let (config, device) = config_for(&server, &dir);

    let host = Arc::new(RecordingHost::default());
    let platform = WiiUPlatform::new(config, host.clone());
    platform.discover_devices().await;
    platform.shutdown();

    let registered = host.registered.lock();
    assert_eq!(registered[0].2.uuid, accessory_uuid(None, &device));
}

#[tokio::test]
async fn test_offline_console_still_starts() {
    let dir = tempfile::tempdir().unwrap();
    let device = DeviceConfig::new("Bedroom", "127.0.0.1", 9);
    let config = Config {
        cache_dir: Some(dir.path().to_path_buf()),
        devices: vec![device.clone()],
        ..Config::default()
    };

    let host = Arc::new(RecordingHost::default());
    let platform = WiiUPlatform::new(config, host.clone());
    let televisions = platform.discover_devices().await;
    platform.shutdown();

    assert_eq!(televisions.len(), 1);
    assert_eq!(televisions[0].input_sources().len(), 4);
    assert_eq!(
        host.registered.lock()[0].2.uuid,
        accessory_uuid(None, &device)
    );
}

#[tokio::test]
async fn test_offline_console_reuses_accessory_cached_for_its_address() {
    let dir = tempfile::tempdir().unwrap();
    let device = DeviceConfig::new("Bedroom", "127.0.0.1", 9);
    let config = Config {
        cache_dir: Some(dir.path().to_path_buf()),
        devices: vec![device.clone()],
        ..Config::default()
    };

    // Seen online in an earlier run, so keyed by serial
    let uuid = accessory_uuid(Some("FW123456789"), &device);
    let host = Arc::new(RecordingHost::default());
    let platform = WiiUPlatform::new(config, host.clone());
    platform.configure_accessory(PlatformAccessory {
        uuid,
        display_name: "Bedroom".to_string(),
        category: AccessoryCategory::Television,
        context: AccessoryContext {
            device: device.clone(),
        },
    });

    let televisions = platform.discover_devices().await;
    platform.shutdown();

    assert_eq!(televisions.len(), 1);
    assert!(host.registered.lock().is_empty());
    let updated = host.updated.lock();
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].uuid, uuid);
}

#[tokio::test]
async fn test_invalid_device_is_skipped() {
    let server = console(Some("FW123456789")).await;
    let dir = tempfile::tempdir().unwrap();
    let (mut config, device) = config_for(&server, &dir);
    config
        .devices
        .insert(0, DeviceConfig::new("Broken", "bad host", 8572));

    let host = Arc::new(RecordingHost::default());
    let platform = WiiUPlatform::new(config, host.clone());
    let televisions = platform.discover_devices().await;
    platform.shutdown();

    assert_eq!(televisions.len(), 1);
    assert_eq!(televisions[0].name(), device.name);
    assert_eq!(platform.televisions().len(), 1);
    assert_eq!(host.registered.lock().len(), 1);
}
