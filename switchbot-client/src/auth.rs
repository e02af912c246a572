//! Request signing for the SwitchBot API.
//!
//! Every request carries four headers: the open token, a millisecond
//! timestamp `t`, a random `nonce`, and `sign`, the upper-cased base64
//! HMAC-SHA256 of `token + t + nonce` keyed with the secret.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{ClientError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Open token and secret key pair issued by the SwitchBot app.
#[derive(Clone)]
pub struct Credentials {
    open_token: String,
    secret_key: String,
}

impl Credentials {
    pub fn new(open_token: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            open_token: open_token.into(),
            secret_key: secret_key.into(),
        }
    }

    pub fn open_token(&self) -> &str {
        &self.open_token
    }

    /// Sign a request made at `timestamp_millis` with the given nonce.
    pub fn sign(&self, timestamp_millis: i64, nonce: &str) -> Result<SignedHeaders> {
        let t = timestamp_millis.to_string();
        let mut mac = HmacSha256::new_from_slice(self.secret_key.as_bytes())
            .map_err(|e| ClientError::invalid_request(format!("invalid secret key: {}", e)))?;
        mac.update(self.open_token.as_bytes());
        mac.update(t.as_bytes());
        mac.update(nonce.as_bytes());
        let sign = STANDARD
            .encode(mac.finalize().into_bytes())
            .to_uppercase();

        Ok(SignedHeaders {
            token: self.open_token.clone(),
            t,
            nonce: nonce.to_string(),
            sign,
        })
    }

    /// Sign a request made now with a fresh random nonce.
    pub fn sign_now(&self) -> Result<SignedHeaders> {
        let nonce = uuid::Uuid::new_v4().to_string();
        self.sign(current_timestamp_millis(), &nonce)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("open_token", &"<redacted>")
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Header values for one signed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub token: String,
    pub t: String,
    pub nonce: String,
    pub sign: String,
}

/// Get the current timestamp in milliseconds since Unix epoch.
///
/// Returns 0 if system time is before Unix epoch.
pub fn current_timestamp_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_is_deterministic() {
        let creds = Credentials::new("token", "secret");
        let a = creds.sign(1_700_000_000_000, "nonce-1").unwrap();
        let b = creds.sign(1_700_000_000_000, "nonce-1").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.t, "1700000000000");
        assert_eq!(a.token, "token");
    }

    #[test]
    fn test_sign_matches_reference_hmac() {
        let creds = Credentials::new("token", "secret");
        let headers = creds.sign(1_700_000_000_000, "abc").unwrap();

        let mut mac = HmacSha256::new_from_slice(b"secret").unwrap();
        mac.update(b"token1700000000000abc");
        let expected = STANDARD.encode(mac.finalize().into_bytes()).to_uppercase();

        assert_eq!(headers.sign, expected);
        assert_eq!(headers.sign, headers.sign.to_uppercase());
    }

    #[test]
    fn test_sign_changes_with_nonce() {
        let creds = Credentials::new("token", "secret");
        let a = creds.sign(1, "a").unwrap();
        let b = creds.sign(1, "b").unwrap();
        assert_ne!(a.sign, b.sign);
    }

    #[test]
    fn test_sign_now_uses_fresh_nonce() {
        let creds = Credentials::new("token", "secret");
        let a = creds.sign_now().unwrap();
        let b = creds.sign_now().unwrap();
        assert_ne!(a.nonce, b.nonce);
        assert!(a.t.parse::<i64>().unwrap() > 0);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = Credentials::new("my-token", "my-secret");
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("my-token"));
        assert!(!debug.contains("my-secret"));
    }
}
