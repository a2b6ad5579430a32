use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Default port the Ristretto control server listens on.
pub const DEFAULT_RISTRETTO_PORT: u16 = 8572;

/// Default liveness poll interval in seconds.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Load environment variables from .env file with robust parsing.
/// Handles values with spaces without requiring quotes.
pub fn load_dotenv() {
    let env_path = Path::new(".env");
    let Ok(content) = fs::read_to_string(env_path) else {
        return;
    };

    for (key, value) in parse_dotenv(&content) {
        // Only set if not already set (env vars take precedence)
        if std::env::var(key).is_err() {
            // SAFETY: We're single-threaded at this point (called before any async runtime)
            unsafe { std::env::set_var(key, value) };
        }
    }
}

fn parse_dotenv(content: &str) -> Vec<(&str, &str)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            let mut value = value.trim();
            if value.len() >= 2
                && ((value.starts_with('"') && value.ends_with('"'))
                    || (value.starts_with('\'') && value.ends_with('\'')))
            {
                value = &value[1..value.len() - 1];
            }
            Some((key.trim(), value))
        })
        .collect()
}

/// Platform configuration, shaped like a Homebridge platform block.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "default_platform")]
    pub platform: String,
    #[serde(default = "default_device_name")]
    pub name: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// `None` leaves request timeouts to the HTTP transport.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

/// One console reachable over Ristretto.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    #[serde(default = "default_device_name")]
    pub name: String,
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_platform() -> String {
    "WiiU".to_string()
}

fn default_device_name() -> String {
    "Wii U".to_string()
}

fn default_port() -> u16 {
    DEFAULT_RISTRETTO_PORT
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

impl DeviceConfig {
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
        }
    }

    /// `host:port`, used as the fallback accessory identity.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Base URL of the console's control server.
    pub fn base_url(&self) -> Result<Url> {
        Url::parse(&format!("http://{}/", self.address()))
            .map_err(|e| BridgeError::InvalidAddress(format!("{}: {}", self.address(), e)))
    }

    /// Filesystem-safe key distinguishing this device's files from other devices'.
    pub fn cache_key(&self) -> String {
        self.address()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' { c } else { '_' })
            .collect()
    }

    fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(BridgeError::Config(format!(
                "device '{}' has an empty host",
                self.name
            )));
        }
        if self.port == 0 {
            return Err(BridgeError::Config(format!(
                "device '{}' has port 0",
                self.name
            )));
        }
        self.base_url().map_err(|e| {
            BridgeError::Config(format!("device '{}': {}", self.name, e))
        })?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            platform: default_platform(),
            name: default_device_name(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            request_timeout_secs: None,
            cache_dir: None,
            devices: Vec::new(),
        }
    }
}

impl Config {
    /// Read a JSON platform config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            BridgeError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config = serde_json::from_str(&content).map_err(|e| {
            BridgeError::Config(format!("failed to parse {}: {}", path.display(), e))
        })?;
        Ok(config)
    }

    /// Defaults plus environment overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Load from an optional file, then apply environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in production).
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup("WIIU_HOST") {
            let name = lookup("WIIU_NAME").unwrap_or_else(|| self.name.clone());
            let port = lookup("WIIU_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_RISTRETTO_PORT);
            let device = DeviceConfig::new(name, host, port);
            let count = self.devices.len();
            match self.devices.first_mut() {
                Some(first) if count == 1 => *first = device,
                Some(_) => log::warn!("WIIU_HOST ignored: config file lists several devices"),
                None => self.devices.push(device),
            }
        }
        if let Some(interval) = lookup("WIIU_POLL_INTERVAL_SECS")
            && let Ok(i) = interval.parse()
        {
            self.poll_interval_secs = i;
        }
        if let Some(timeout) = lookup("WIIU_REQUEST_TIMEOUT_SECS")
            && let Ok(t) = timeout.parse()
        {
            self.request_timeout_secs = Some(t);
        }
        if let Some(dir) = lookup("WIIU_CACHE_DIR") {
            self.cache_dir = Some(PathBuf::from(dir));
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_secs == 0 {
            return Err(BridgeError::Config(
                "pollIntervalSecs must be at least 1".to_string(),
            ));
        }
        self.devices.iter().try_for_each(DeviceConfig::validate)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Directory holding the per-device title caches.
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .map(|dir| dir.join("wiiu-bridge"))
                .unwrap_or_else(|| PathBuf::from(".wiiu-bridge"))
        })
    }

    /// Title cache file for one device.
    pub fn title_cache_path(&self, device: &DeviceConfig) -> PathBuf {
        self.cache_dir()
            .join(format!("titles-{}.json", device.cache_key()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_parse_platform_block_with_defaults() {
        let config: Config = serde_json::from_str(
            r#"{ "platform": "WiiU", "devices": [ { "host": "192.168.1.195" } ] }"#,
        )
        .unwrap();

        assert_eq!(config.poll_interval(), Duration::from_secs(10));
        assert_eq!(config.request_timeout(), None);
        assert_eq!(
            config.devices,
            vec![DeviceConfig::new("Wii U", "192.168.1.195", 8572)]
        );
        config.validate().unwrap();
    }

    #[test]
    fn test_env_defines_single_device() {
        let mut config = Config::default();
        config.apply_env(lookup(&[
            ("WIIU_HOST", "10.0.0.5"),
            ("WIIU_PORT", "9000"),
            ("WIIU_NAME", "Living Room"),
            ("WIIU_POLL_INTERVAL_SECS", "3"),
            ("WIIU_REQUEST_TIMEOUT_SECS", "2"),
        ]));

        assert_eq!(
            config.devices,
            vec![DeviceConfig::new("Living Room", "10.0.0.5", 9000)]
        );
        assert_eq!(config.poll_interval_secs, 3);
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_env_host_replaces_single_file_device() {
        let mut config = Config::default();
        config
            .devices
            .push(DeviceConfig::new("Den", "192.168.1.195", 8572));
        config.apply_env(lookup(&[("WIIU_HOST", "10.0.0.9")]));

        assert_eq!(
            config.devices,
            vec![DeviceConfig::new("Wii U", "10.0.0.9", 8572)]
        );

        // Several devices: the variable is ignored
        let mut config = Config::default();
        config.devices = vec![
            DeviceConfig::new("A", "192.168.1.195", 8572),
            DeviceConfig::new("B", "192.168.1.196", 8572),
        ];
        config.apply_env(lookup(&[("WIIU_HOST", "10.0.0.9")]));
        assert_eq!(config.devices[0].host, "192.168.1.195");
        assert_eq!(config.devices[1].host, "192.168.1.196");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = Config::default();
        config.devices.push(DeviceConfig::new("Wii U", " ", 8572));
        assert!(matches!(config.validate(), Err(BridgeError::Config(_))));

        let mut config = Config::default();
        config.devices.push(DeviceConfig::new("Wii U", "bad host", 8572));
        assert!(matches!(config.validate(), Err(BridgeError::Config(_))));

        let config = Config {
            poll_interval_secs: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cache_path_keyed_per_device() {
        let config = Config {
            cache_dir: Some(PathBuf::from("/var/cache/wiiu")),
            ..Config::default()
        };
        let a = DeviceConfig::new("A", "192.168.1.195", 8572);
        let b = DeviceConfig::new("B", "192.168.1.196", 8572);

        assert_eq!(
            config.title_cache_path(&a),
            PathBuf::from("/var/cache/wiiu/titles-192.168.1.195_8572.json")
        );
        assert_ne!(config.title_cache_path(&a), config.title_cache_path(&b));
    }

    #[test]
    fn test_parse_dotenv() {
        let parsed = parse_dotenv("# comment\nWIIU_HOST = 10.0.0.5\nWIIU_NAME=\"Wii U Den\"\n\n");
        assert_eq!(
            parsed,
            vec![("WIIU_HOST", "10.0.0.5"), ("WIIU_NAME", "Wii U Den")]
        );
    }
}
