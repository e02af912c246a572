//! HTTP client for the SwitchBot cloud API (v1.1).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::DeviceClient;
use crate::auth::Credentials;
use crate::device::{DeviceList, DeviceStatus};
use crate::error::{ClientError, Result};

/// Production API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.switch-bot.com";

/// API version path segment.
const API_VERSION: &str = "v1.1";

/// Status code reported by the API on success.
const STATUS_SUCCESS: i64 = 100;

/// Response envelope shared by all endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    status_code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    body: serde_json::Value,
}

/// Client for the SwitchBot cloud API.
///
/// Each call performs exactly one signed HTTP request. There is no retry;
/// the caller decides what to do with a failure. Dropping the returned
/// future aborts the in-flight request.
#[derive(Debug, Clone)]
pub struct SwitchBotClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: Credentials,
}

impl SwitchBotClient {
    /// Create a client against the production API with no request timeout.
    pub fn new(credentials: Credentials) -> Result<Self> {
        Self::with_options(credentials, DEFAULT_BASE_URL, None)
    }

    /// Create a client against a custom base URL with an optional timeout.
    pub fn with_options(
        credentials: Credentials,
        base_url: &str,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| {
            ClientError::invalid_request(format!("invalid base URL '{}': {}", base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::invalid_request(format!(
                "base URL '{}' cannot be used as a base",
                base_url
            )));
        }

        let mut builder = reqwest::Client::builder()
            .user_agent(format!("switchbot-exporter/{}", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            base_url,
            credentials,
        })
    }

    /// The base URL requests are sent to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::invalid_request("base URL cannot be a base"))?
            .pop_if_empty()
            .push(API_VERSION)
            .extend(segments);
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let headers = self.credentials.sign_now()?;

        debug!(url = %url, "SwitchBot API request");

        let response = self
            .http
            .get(url.clone())
            .header("Authorization", &headers.token)
            .header("sign", &headers.sign)
            .header("t", &headers.t)
            .header("nonce", &headers.nonce)
            .header(CONTENT_TYPE, "application/json; charset=utf8")
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        trace!(url = %url, status = %status, body = %text, "SwitchBot API response");

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ClientError::Unauthorized(text));
        }
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let envelope: ApiResponse = serde_json::from_str(&text)?;
        if envelope.status_code != STATUS_SUCCESS {
            return Err(ClientError::Api {
                code: envelope.status_code,
                message: envelope.message,
            });
        }

        Ok(serde_json::from_value(envelope.body)?)
    }
}

#[async_trait]
impl DeviceClient for SwitchBotClient {
    async fn list_devices(&self) -> Result<DeviceList> {
        let url = self.endpoint(&["devices"])?;
        let list: DeviceList = self.get(url).await?;
        debug!(
            devices = list.devices.len(),
            infrared = list.infrared.len(),
            "Fetched device list"
        );
        Ok(list)
    }

    async fn status(&self, device_id: &str) -> Result<DeviceStatus> {
        let url = self.endpoint(&["devices", device_id, "status"])?;
        self.get(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> SwitchBotClient {
        SwitchBotClient::with_options(Credentials::new("t", "s"), base, None).unwrap()
    }

    #[test]
    fn test_endpoint_paths() {
        let c = client("https://api.switch-bot.com");
        assert_eq!(
            c.endpoint(&["devices"]).unwrap().as_str(),
            "https://api.switch-bot.com/v1.1/devices"
        );
        assert_eq!(
            c.endpoint(&["devices", "ABC123", "status"]).unwrap().as_str(),
            "https://api.switch-bot.com/v1.1/devices/ABC123/status"
        );
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let c = client("http://proxy.local/switchbot/");
        assert_eq!(
            c.endpoint(&["devices"]).unwrap().as_str(),
            "http://proxy.local/switchbot/v1.1/devices"
        );
    }

    #[test]
    fn test_endpoint_escapes_device_id() {
        let c = client("https://api.switch-bot.com");
        let url = c.endpoint(&["devices", "a/b", "status"]).unwrap();
        assert_eq!(url.path(), "/v1.1/devices/a%2Fb/status");
    }

    #[test]
    fn test_invalid_base_url() {
        let result = SwitchBotClient::with_options(Credentials::new("t", "s"), "not a url", None);
        assert!(matches!(result, Err(ClientError::InvalidRequest(_))));
    }

    #[test]
    fn test_parse_error_envelope() {
        let envelope: ApiResponse =
            serde_json::from_str(r#"{"statusCode":152,"message":"device not found","body":{}}"#)
                .unwrap();
        assert_eq!(envelope.status_code, 152);
        assert_eq!(envelope.message, "device not found");
    }
}
