//! Device liveness and control façade.
//!
//! Wraps [`RistrettoClient`] so that no device failure ever reaches a
//! characteristic handler: reads fall back to safe defaults, commands are
//! best-effort, and every outcome feeds the shared [`Availability`] flag.

use super::availability::{Availability, Reachability};
use super::client::RistrettoClient;
use crate::catalog::{TitleList, TitleSource};
use crate::error::{BridgeError, Result};
use async_trait::async_trait;
use log::{debug, error, info, warn};
use parking_lot::RwLock;
use std::sync::Arc;

/// Display value used when the device never reported a field.
pub const UNKNOWN_VALUE: &str = "Unknown";

/// Serial, model and firmware version as last reported by the console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemInfo {
    pub serial: String,
    pub model: String,
    pub firmware_version: String,
}

impl SystemInfo {
    /// Serial number, if the device has reported one.
    pub fn known_serial(&self) -> Option<&str> {
        (self.serial != UNKNOWN_VALUE).then_some(self.serial.as_str())
    }
}

impl Default for SystemInfo {
    fn default() -> Self {
        Self {
            serial: UNKNOWN_VALUE.to_string(),
            model: UNKNOWN_VALUE.to_string(),
            firmware_version: UNKNOWN_VALUE.to_string(),
        }
    }
}

/// Result of asking which title is running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CurrentTitle {
    Running(String),
    /// The device could not be asked or gave no usable answer.
    Unknown,
}

pub struct ConsoleFacade {
    client: RistrettoClient,
    availability: Arc<Availability>,
    system_info: RwLock<SystemInfo>,
}

impl ConsoleFacade {
    pub fn new(client: RistrettoClient) -> Self {
        Self {
            client,
            availability: Arc::new(Availability::new()),
            system_info: RwLock::new(SystemInfo::default()),
        }
    }

    pub fn client(&self) -> &RistrettoClient {
        &self.client
    }

    pub fn availability(&self) -> Arc<Availability> {
        self.availability.clone()
    }

    /// Last known system info without touching the network.
    pub fn cached_system_info(&self) -> SystemInfo {
        self.system_info.read().clone()
    }

    /// Feed a request outcome into the availability flag.
    fn record<T>(&self, what: &str, result: &Result<T>) {
        match result {
            Ok(_) => self.mark(Reachability::Reachable),
            Err(e) if e.is_transport_failure() => {
                debug!("[Ristretto] {} failed, device offline: {}", what, e);
                self.mark(Reachability::Unreachable);
            }
            Err(e) => warn!("[Ristretto] {} failed: {}", what, e),
        }
    }

    fn mark(&self, value: Reachability) {
        if self.availability.set(value) {
            info!(
                "[Ristretto] {} is now {}",
                self.client.base_url(),
                value
            );
        }
    }

    /// Refresh serial, model and firmware version.
    ///
    /// Fields that fail or come back empty keep their previous value.
    pub async fn get_system_info(&self) -> SystemInfo {
        let serial = self.client.serial_id().await;
        self.record("serial_id", &serial);
        let model = self.client.model_number().await;
        self.record("model_number", &model);
        let version = self.client.version().await;
        self.record("version", &version);

        let mut info = self.system_info.write();
        merge_field(&mut info.serial, "serial", serial);
        merge_field(&mut info.model, "model", model);
        merge_field(&mut info.firmware_version, "firmware version", version);
        info.clone()
    }

    /// Currently running title. Any failure marks the device unreachable.
    pub async fn get_current_title(&self) -> CurrentTitle {
        match self.client.current_title().await {
            Ok(id) => {
                self.mark(Reachability::Reachable);
                CurrentTitle::Running(id)
            }
            Err(e) => {
                debug!("[Ristretto] current title unavailable: {}", e);
                self.mark(Reachability::Unreachable);
                CurrentTitle::Unknown
            }
        }
    }

    pub async fn get_title_list(&self) -> Result<TitleList> {
        let result = self.client.title_list().await;
        self.record("title_list", &result);
        result
    }

    /// Raw battery unit (`0..=6`), `None` on failure.
    pub async fn get_battery_level(&self) -> Option<u8> {
        let result = self.client.battery().await;
        self.record("battery", &result);
        result.ok()
    }

    /// Lightweight reachability probe, run on the poll timer.
    pub async fn poll_liveness(&self) -> Reachability {
        let result = self.client.ping().await;
        let value = match &result {
            Ok(()) => Reachability::Reachable,
            Err(e) => {
                debug!("[Ristretto] liveness probe failed: {}", e);
                Reachability::Unreachable
            }
        };
        self.mark(value);
        value
    }

    pub async fn power_off(&self) -> bool {
        self.command("shutdown", self.client.shutdown().await)
    }

    pub async fn reboot(&self) -> bool {
        self.command("reboot", self.client.reboot().await)
    }

    pub async fn launch_title(&self, title_id: &str) -> bool {
        self.command("launch title", self.client.launch_title(title_id).await)
    }

    /// Issue a fixed bodiless command, e.g. opening a settings screen.
    pub async fn launch_command(&self, path: &str) -> bool {
        self.command(path, self.client.post_command(path).await)
    }

    pub async fn send_remote_key(&self, button: u32) -> bool {
        self.command("remote key", self.client.remote_key(button).await)
    }

    /// Log a command failure; commands never report errors to callers.
    fn command(&self, what: &str, result: Result<()>) -> bool {
        self.record(what, &result);
        if let Err(e) = &result {
            error!("[Ristretto] {} command failed: {}", what, e);
        }
        result.is_ok()
    }
}

fn merge_field(slot: &mut String, what: &str, value: Result<String>) {
    match value {
        Ok(v) if !v.is_empty() => *slot = v,
        Ok(_) => warn!("[Ristretto] device reported an empty {}", what),
        // Already logged by record()
        Err(_) => {}
    }
}

#[async_trait]
impl TitleSource for ConsoleFacade {
    async fn fetch_titles(&self) -> std::result::Result<TitleList, BridgeError> {
        self.get_title_list().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_field_keeps_previous_on_empty_or_error() {
        let mut serial = "FW123".to_string();

        merge_field(&mut serial, "serial", Ok(String::new()));
        assert_eq!(serial, "FW123");

        merge_field(
            &mut serial,
            "serial",
            Err(BridgeError::Config("boom".to_string())),
        );
        assert_eq!(serial, "FW123");

        merge_field(&mut serial, "serial", Ok("FW456".to_string()));
        assert_eq!(serial, "FW456");
    }

    #[test]
    fn test_known_serial() {
        let mut info = SystemInfo::default();
        assert_eq!(info.known_serial(), None);
        info.serial = "FW123".to_string();
        assert_eq!(info.known_serial(), Some("FW123"));
    }
}
