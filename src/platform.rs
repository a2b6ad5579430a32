//! Platform: one television accessory per configured console.
//!
//! The host restores cached accessories (via [`WiiUPlatform::configure_accessory`])
//! before discovery runs. Discovery then reuses a restored accessory with the
//! same UUID or registers a new one, and starts each accessory.

use crate::accessory::{
    CharacteristicPusher, CharacteristicUpdate, REBOOT_SWITCH_NAME, WiiUTelevision,
};
use crate::catalog::{FileTitleStore, TitleCatalog};
use crate::config::{Config, DeviceConfig};
use crate::error::Result;
use crate::ristretto::{ConsoleFacade, RistrettoClient};
use futures_util::future::join_all;
use log::{error, info, warn};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinHandle;
use uuid::Uuid;

pub const PLUGIN_NAME: &str = "homebridge-wiiu";
pub const PLATFORM_NAME: &str = "WiiU";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessoryCategory {
    Television,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessoryContext {
    pub device: DeviceConfig,
}

/// An accessory as the host persists it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformAccessory {
    pub uuid: Uuid,
    pub display_name: String,
    pub category: AccessoryCategory,
    pub context: AccessoryContext,
}

/// The accessory-bridge runtime hosting this platform.
pub trait AccessoryHost: Send + Sync {
    fn register_accessories(&self, plugin: &str, platform: &str, accessories: &[PlatformAccessory]);

    fn update_accessories(&self, accessories: &[PlatformAccessory]);

    /// Callback receiving characteristic updates for one accessory.
    fn characteristic_pusher(&self, accessory: &PlatformAccessory) -> CharacteristicPusher;
}

/// Stable accessory UUID: the console serial when known, else its address.
pub fn accessory_uuid(serial: Option<&str>, device: &DeviceConfig) -> Uuid {
    let key = match serial {
        Some(serial) => serial.to_string(),
        None => device.address(),
    };
    Uuid::new_v5(
        &Uuid::NAMESPACE_OID,
        format!("{PLUGIN_NAME}:{key}").as_bytes(),
    )
}

pub struct WiiUPlatform {
    config: Config,
    host: Arc<dyn AccessoryHost>,
    /// Accessories restored from the host's cache.
    accessories: RwLock<Vec<PlatformAccessory>>,
    televisions: RwLock<Vec<Arc<WiiUTelevision>>>,
    polls: Mutex<Vec<JoinHandle<()>>>,
}

impl WiiUPlatform {
    pub fn new(config: Config, host: Arc<dyn AccessoryHost>) -> Self {
        info!("[Platform] Finished initializing platform: {}", config.name);
        Self {
            config,
            host,
            accessories: RwLock::new(Vec::new()),
            televisions: RwLock::new(Vec::new()),
            polls: Mutex::new(Vec::new()),
        }
    }

    /// Record an accessory the host restored from its cache.
    pub fn configure_accessory(&self, mut accessory: PlatformAccessory) {
        info!(
            "[Platform] Loading accessory from cache: {}",
            accessory.display_name
        );
        accessory.category = AccessoryCategory::Television;
        self.accessories.write().push(accessory);
    }

    pub fn televisions(&self) -> Vec<Arc<WiiUTelevision>> {
        self.televisions.read().clone()
    }

    /// Build, register and start an accessory for every configured device.
    ///
    /// Devices start concurrently so one slow console does not hold up the rest.
    /// A device that cannot be started is logged and skipped.
    pub async fn discover_devices(&self) -> Vec<Arc<WiiUTelevision>> {
        let results = join_all(
            self.config
                .devices
                .iter()
                .map(|device| async move { (device, self.start_device(device).await) }),
        )
        .await;

        results
            .into_iter()
            .filter_map(|(device, result)| match result {
                Ok(tv) => Some(tv),
                Err(e) => {
                    error!(
                        "[Platform] Failed to start {} at {}: {}",
                        device.name,
                        device.address(),
                        e
                    );
                    None
                }
            })
            .collect()
    }

    async fn start_device(&self, device: &DeviceConfig) -> Result<Arc<WiiUTelevision>> {
        let client = RistrettoClient::for_device(device, self.config.request_timeout())?;
        let facade = Arc::new(ConsoleFacade::new(client));
        let store = FileTitleStore::new(self.config.title_cache_path(device));
        let catalog = Arc::new(TitleCatalog::new(Box::new(store)));
        let tv = Arc::new(WiiUTelevision::new(device.name.as_str(), facade, catalog));

        let information = tv.refresh_information().await;
        let system_info = tv.facade().cached_system_info();
        let serial = system_info.known_serial();
        if serial.is_none() {
            warn!(
                "[Platform] {} did not report a serial; identifying it by address",
                device.address()
            );
        }
        let uuid = accessory_uuid(serial, device);
        let accessory = self.register_or_restore(uuid, serial.is_none(), device);

        tv.set_state_pusher(self.host.characteristic_pusher(&accessory));
        tv.push_update(CharacteristicUpdate::Information(information));
        tv.refresh_titles().await;

        let poll = tv.start_polling(self.config.poll_interval());
        self.polls.lock().push(poll);
        self.televisions.write().push(tv.clone());
        Ok(tv)
    }

    /// Reuse the restored accessory with `uuid`, or register a new one.
    ///
    /// Without a serial the UUID is address-based and will not match an
    /// accessory first seen online, so a restored accessory for the same
    /// address is reused instead.
    fn register_or_restore(
        &self,
        uuid: Uuid,
        match_address: bool,
        device: &DeviceConfig,
    ) -> PlatformAccessory {
        let existing = {
            let accessories = self.accessories.read();
            accessories
                .iter()
                .find(|accessory| accessory.uuid == uuid)
                .or_else(|| {
                    accessories.iter().find(|accessory| {
                        match_address && accessory.context.device.address() == device.address()
                    })
                })
                .cloned()
        };

        match existing {
            Some(mut accessory) => {
                info!(
                    "[Platform] Restoring existing accessory from cache: {}",
                    accessory.display_name
                );
                accessory.context.device = device.clone();
                accessory.category = AccessoryCategory::Television;
                if let Some(cached) = self
                    .accessories
                    .write()
                    .iter_mut()
                    .find(|cached| cached.uuid == accessory.uuid)
                {
                    *cached = accessory.clone();
                }
                self.host.update_accessories(std::slice::from_ref(&accessory));
                accessory
            }
            None => {
                info!("[Platform] Adding new accessory: {}", device.name);
                let accessory = PlatformAccessory {
                    uuid,
                    display_name: device.name.clone(),
                    category: AccessoryCategory::Television,
                    context: AccessoryContext {
                        device: device.clone(),
                    },
                };
                self.host.register_accessories(
                    PLUGIN_NAME,
                    PLATFORM_NAME,
                    std::slice::from_ref(&accessory),
                );
                accessory
            }
        }
    }

    /// Stop all poll tasks.
    pub fn shutdown(&self) {
        for poll in self.polls.lock().drain(..) {
            poll.abort();
        }
    }
}

/// Host that only logs; used by the headless bridge binary.
pub struct LoggingHost;

impl AccessoryHost for LoggingHost {
    fn register_accessories(&self, plugin: &str, platform: &str, accessories: &[PlatformAccessory]) {
        for accessory in accessories {
            info!(
                "[Platform] Registered {} ({}) for {}/{}",
                accessory.display_name, accessory.uuid, plugin, platform
            );
        }
    }

    fn update_accessories(&self, accessories: &[PlatformAccessory]) {
        for accessory in accessories {
            info!(
                "[Platform] Updated {} ({})",
                accessory.display_name, accessory.uuid
            );
        }
    }

    fn characteristic_pusher(&self, accessory: &PlatformAccessory) -> CharacteristicPusher {
        let name = accessory.display_name.clone();
        Arc::new(move |update| match update {
            CharacteristicUpdate::InputSources(sources) => {
                info!("[HomeKit] {}: {} input sources", name, sources.len());
                for source in sources {
                    info!("[HomeKit]   {:>3} {}", source.identifier, source.name);
                }
            }
            CharacteristicUpdate::RebootSwitch(on) => {
                info!("[HomeKit] {}: {} -> {}", name, REBOOT_SWITCH_NAME, on)
            }
            other => info!("[HomeKit] {}: {:?}", name, other),
        })
    }
}
