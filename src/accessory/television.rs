//! The Wii U television accessory.
//!
//! Glues the [`TitleCatalog`] and [`ConsoleFacade`] into the behaviours the
//! HomeKit characteristic handlers need. Every handler resolves to a value;
//! device failures show up as stale data or a no-op, never as an error.

use super::characteristics::{
    AccessoryInformation, Active, BatteryStatus, CharacteristicUpdate, InputSourceDescriptor,
    RemoteKey,
};
use super::poll;
use crate::catalog::{DEFAULT_IDENTIFIER, InputSource, RefreshOutcome, TitleCatalog};
use crate::ristretto::{ConsoleFacade, CurrentTitle, Reachability};
use log::{debug, info, warn};
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Callback the host registers to receive characteristic updates.
pub type CharacteristicPusher = Arc<dyn Fn(CharacteristicUpdate) + Send + Sync>;

pub struct WiiUTelevision {
    name: String,
    facade: Arc<ConsoleFacade>,
    catalog: Arc<TitleCatalog>,
    /// Last resolved ActiveIdentifier; 0 until the first resolution.
    last_identifier: AtomicU32,
    last_battery: RwLock<Option<BatteryStatus>>,
    reboot_requested: AtomicBool,
    /// Set once a title refresh has succeeded.
    titles_synced: AtomicBool,
    pusher: RwLock<Option<CharacteristicPusher>>,
}

impl WiiUTelevision {
    /// Create the accessory. The title cache is loaded before this returns.
    pub fn new(
        name: impl Into<String>,
        facade: Arc<ConsoleFacade>,
        catalog: Arc<TitleCatalog>,
    ) -> Self {
        catalog.load();
        Self {
            name: name.into(),
            facade,
            catalog,
            last_identifier: AtomicU32::new(0),
            last_battery: RwLock::new(None),
            reboot_requested: AtomicBool::new(false),
            titles_synced: AtomicBool::new(false),
            pusher: RwLock::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn facade(&self) -> &Arc<ConsoleFacade> {
        &self.facade
    }

    pub fn catalog(&self) -> &Arc<TitleCatalog> {
        &self.catalog
    }

    /// Register the callback used to push state changes to the host.
    pub fn set_state_pusher(&self, pusher: CharacteristicPusher) {
        *self.pusher.write() = Some(pusher);
    }

    pub fn push_update(&self, update: CharacteristicUpdate) {
        // Released before calling out; the host may replace the pusher
        let pusher = self.pusher.read().clone();
        if let Some(pusher) = pusher {
            pusher(update);
        }
    }

    /// System info then title refresh; both best-effort.
    ///
    /// Polling is started separately with [`start_polling`](Self::start_polling).
    pub async fn initialize(&self) {
        self.refresh_information().await;
        self.refresh_titles().await;
    }

    pub async fn refresh_information(&self) -> AccessoryInformation {
        let info = AccessoryInformation::from(self.facade.get_system_info().await);
        self.push_update(CharacteristicUpdate::Information(info.clone()));
        info
    }

    pub async fn refresh_titles(&self) -> RefreshOutcome {
        let outcome = self
            .catalog
            .refresh_from_device(self.facade.as_ref())
            .await;
        if let RefreshOutcome::Updated { .. } = outcome {
            self.titles_synced.store(true, Ordering::SeqCst);
            self.push_update(CharacteristicUpdate::InputSources(self.input_sources()));
        }
        outcome
    }

    /// Spawn the periodic liveness poll for this accessory.
    pub fn start_polling(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        poll::spawn_liveness_poll(self.clone(), interval)
    }

    pub fn accessory_information(&self) -> AccessoryInformation {
        AccessoryInformation::from(self.facade.cached_system_info())
    }

    /// InputSource services, system screens first.
    pub fn input_sources(&self) -> Vec<InputSourceDescriptor> {
        self.catalog
            .input_sources()
            .iter()
            .map(|(slot, source)| InputSourceDescriptor::new(*slot, source))
            .collect()
    }

    pub fn get_active(&self) -> Active {
        if self.facade.availability().is_reachable() {
            Active::Active
        } else {
            Active::Inactive
        }
    }

    /// The console cannot be powered on remotely, so only `Inactive` does anything.
    pub async fn set_active(&self, value: Active) {
        match value {
            Active::Active => debug!("[HomeKit] {}: ignoring Active=ACTIVE", self.name),
            Active::Inactive => {
                info!("[HomeKit] {}: shutting down", self.name);
                self.facade.power_off().await;
            }
        }
    }

    fn last_known_identifier(&self) -> u32 {
        match self.last_identifier.load(Ordering::SeqCst) {
            0 => DEFAULT_IDENTIFIER,
            slot => slot,
        }
    }

    pub async fn get_active_identifier(&self) -> u32 {
        let title_id = match self.facade.get_current_title().await {
            CurrentTitle::Running(id) => id,
            CurrentTitle::Unknown => return self.last_known_identifier(),
        };
        let slot = match self.catalog.resolve_title_to_slot(&title_id) {
            Some(slot) => slot,
            None => {
                warn!(
                    "[HomeKit] {}: running title {} is not in the title cache",
                    self.name, title_id
                );
                DEFAULT_IDENTIFIER
            }
        };
        self.last_identifier.store(slot, Ordering::SeqCst);
        slot
    }

    pub async fn set_active_identifier(&self, slot: u32) {
        let sent = match self.catalog.input_source(slot) {
            Some(InputSource::Fixed(source)) => {
                info!("[HomeKit] {}: opening {}", self.name, source.name);
                self.facade.launch_command(source.command).await
            }
            Some(InputSource::Dynamic(title)) => {
                info!("[HomeKit] {}: launching {} ({})", self.name, title.name, title.id);
                self.facade.launch_title(&title.id).await
            }
            None => {
                warn!("[HomeKit] {}: no input source at identifier {}", self.name, slot);
                false
            }
        };
        if sent {
            self.last_identifier.store(slot, Ordering::SeqCst);
        }
    }

    pub async fn set_remote_key(&self, raw: u8) {
        match RemoteKey::from_raw(raw) {
            Some(key) => {
                debug!("[HomeKit] {}: remote key {}", self.name, key);
                self.facade.send_remote_key(key.button_mask()).await;
            }
            None => warn!("[HomeKit] {}: unsupported remote key {}", self.name, raw),
        }
    }

    /// Momentary switch: always reads off.
    pub fn get_reboot(&self) -> bool {
        false
    }

    pub async fn set_reboot(&self, on: bool) {
        if !on {
            return;
        }
        info!("[HomeKit] {}: rebooting", self.name);
        self.reboot_requested.store(true, Ordering::SeqCst);
        self.facade.reboot().await;
    }

    /// Battery from the device, falling back to the last reading.
    pub async fn get_battery(&self) -> BatteryStatus {
        match self.facade.get_battery_level().await {
            Some(raw) => {
                let status = BatteryStatus::from_raw(raw);
                *self.last_battery.write() = Some(status);
                status
            }
            None => (*self.last_battery.read()).unwrap_or_else(|| BatteryStatus::from_raw(0)),
        }
    }

    /// One poll tick: liveness, then identifier and battery when reachable.
    ///
    /// Coming online, or still lacking a title list, re-reads system info and
    /// titles first, so a console that was off at startup catches up.
    pub async fn poll(&self) {
        let version = self.facade.availability().version();
        let reachability = self.facade.poll_liveness().await;
        let changed = self.facade.availability().version() != version;
        if changed {
            self.push_update(CharacteristicUpdate::Active(self.get_active()));
        }

        if self.reboot_requested.swap(false, Ordering::SeqCst) {
            self.push_update(CharacteristicUpdate::RebootSwitch(false));
        }

        if reachability != Reachability::Reachable {
            return;
        }

        if changed || !self.titles_synced.load(Ordering::SeqCst) {
            info!("[Poll] {}: console online, syncing titles", self.name);
            self.refresh_information().await;
            self.refresh_titles().await;
        }

        let previous = self.last_identifier.load(Ordering::SeqCst);
        let identifier = self.get_active_identifier().await;
        if identifier != previous {
            self.push_update(CharacteristicUpdate::ActiveIdentifier(identifier));
        }

        if let Some(raw) = self.facade.get_battery_level().await {
            let status = BatteryStatus::from_raw(raw);
            let previous = self.last_battery.write().replace(status);
            if previous != Some(status) {
                self.push_update(CharacteristicUpdate::Battery(status));
            }
        }
    }
}
