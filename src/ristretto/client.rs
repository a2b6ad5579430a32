//! Raw HTTP surface of the Ristretto control server.
//!
//! Every method is a single request with no retry. Plain-text endpoints are
//! trimmed; anything that does not parse into the expected shape is reported
//! as `BridgeError::UnexpectedPayload`.

use crate::catalog::TitleList;
use crate::config::DeviceConfig;
use crate::error::{BridgeError, Result};
use log::debug;
use serde::Serialize;
use std::time::Duration;
use url::Url;

pub const PATH_SERIAL: &str = "/device/serial_id";
pub const PATH_MODEL: &str = "/device/model_number";
pub const PATH_VERSION: &str = "/device/version";
pub const PATH_CURRENT_TITLE: &str = "/title/current";
pub const PATH_TITLE_LIST: &str = "/title/list";
pub const PATH_BATTERY: &str = "/gamepad/battery";
pub const PATH_PING: &str = "/";
pub const PATH_SHUTDOWN: &str = "/power/shutdown";
pub const PATH_REBOOT: &str = "/power/reboot";
pub const PATH_LAUNCH_TITLE: &str = "/launch/title";
pub const PATH_REMOTE_KEY: &str = "/remote/key";

/// Highest raw value `/gamepad/battery` reports.
pub const BATTERY_MAX: u8 = 6;

#[derive(Debug, Serialize)]
struct LaunchTitleRequest<'a> {
    title: &'a str,
}

#[derive(Debug, Serialize)]
struct RemoteKeyRequest {
    button: u32,
}

/// HTTP client for one console.
#[derive(Debug, Clone)]
pub struct RistrettoClient {
    http: reqwest::Client,
    base_url: Url,
}

impl RistrettoClient {
    /// Build a client; `timeout` of `None` keeps the transport default.
    pub fn new(base_url: Url, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self::with_client(builder.build()?, base_url))
    }

    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    pub fn for_device(device: &DeviceConfig, timeout: Option<Duration>) -> Result<Self> {
        Self::new(device.base_url()?, timeout)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| BridgeError::InvalidAddress(format!("{}{}: {}", self.base_url, path, e)))
    }

    fn check_status(path: &str, resp: reqwest::Response) -> Result<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            Ok(resp)
        } else {
            Err(BridgeError::Status {
                path: path.to_string(),
                status,
            })
        }
    }

    async fn get_text(&self, path: &str) -> Result<String> {
        let url = self.url(path)?;
        debug!("[Ristretto] GET {}", url);
        let resp = self.http.get(url).send().await?;
        let body = Self::check_status(path, resp)?.text().await?;
        Ok(body)
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: Option<&B>) -> Result<()> {
        let url = self.url(path)?;
        debug!("[Ristretto] POST {}", url);
        let mut builder = self.http.post(url);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let resp = builder.send().await?;
        Self::check_status(path, resp)?;
        Ok(())
    }

    /// GET a plain-string endpoint, trimmed and unquoted.
    async fn get_plain(&self, path: &str) -> Result<String> {
        let body = self.get_text(path).await?;
        Ok(unquote(body.trim()).to_string())
    }

    pub async fn serial_id(&self) -> Result<String> {
        self.get_plain(PATH_SERIAL).await
    }

    pub async fn model_number(&self) -> Result<String> {
        self.get_plain(PATH_MODEL).await
    }

    pub async fn version(&self) -> Result<String> {
        self.get_plain(PATH_VERSION).await
    }

    pub async fn current_title(&self) -> Result<String> {
        let id = self.get_plain(PATH_CURRENT_TITLE).await?;
        if id.is_empty() {
            return Err(BridgeError::UnexpectedPayload {
                path: PATH_CURRENT_TITLE.to_string(),
                reason: "empty title id".to_string(),
            });
        }
        Ok(id)
    }

    pub async fn title_list(&self) -> Result<TitleList> {
        let body = self.get_text(PATH_TITLE_LIST).await?;
        serde_json::from_str(&body).map_err(|e| BridgeError::UnexpectedPayload {
            path: PATH_TITLE_LIST.to_string(),
            reason: e.to_string(),
        })
    }

    /// Raw battery reading, `0..=6`.
    pub async fn battery(&self) -> Result<u8> {
        let body = self.get_plain(PATH_BATTERY).await?;
        match body.parse::<u8>() {
            Ok(v) if v <= BATTERY_MAX => Ok(v),
            _ => Err(BridgeError::UnexpectedPayload {
                path: PATH_BATTERY.to_string(),
                reason: format!("expected 0..={BATTERY_MAX}, got {body:?}"),
            }),
        }
    }

    /// Liveness probe; any 2xx counts.
    pub async fn ping(&self) -> Result<()> {
        self.get_text(PATH_PING).await.map(|_| ())
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.post::<()>(PATH_SHUTDOWN, None).await
    }

    pub async fn reboot(&self) -> Result<()> {
        self.post::<()>(PATH_REBOOT, None).await
    }

    pub async fn launch_title(&self, title_id: &str) -> Result<()> {
        self.post(PATH_LAUNCH_TITLE, Some(&LaunchTitleRequest { title: title_id }))
            .await
    }

    /// Bodiless POST to a fixed command path (system screens).
    pub async fn post_command(&self, path: &str) -> Result<()> {
        self.post::<()>(path, None).await
    }

    pub async fn remote_key(&self, button: u32) -> Result<()> {
        self.post(PATH_REMOTE_KEY, Some(&RemoteKeyRequest { button }))
            .await
    }
}

fn unquote(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_join() {
        let client = RistrettoClient::new(
            Url::parse("http://192.168.1.195:8572/").unwrap(),
            None,
        )
        .unwrap();
        assert_eq!(
            client.url(PATH_TITLE_LIST).unwrap().as_str(),
            "http://192.168.1.195:8572/title/list"
        );
        assert_eq!(
            client.url(PATH_PING).unwrap().as_str(),
            "http://192.168.1.195:8572/"
        );
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("\"WUP-101\""), "WUP-101");
        assert_eq!(unquote("WUP-101"), "WUP-101");
        assert_eq!(unquote("\""), "\"");
    }
}
