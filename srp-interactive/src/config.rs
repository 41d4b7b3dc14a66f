//! Client identity configuration.
//!
//! [`ClientConfig`] is the typed form of the three configuration keys. It is
//! filled by an external loader and turned into a [`ClientIdentity`] holding
//! parsed key objects before any network activity.

use serde::{Deserialize, Serialize};
use srp_lib::{PrivateKey, PublicKey};
use std::collections::HashMap;
use std::fmt;

pub const KEY_SERIAL_ID: &str = "client_serial_id";
pub const KEY_CLIENT_PRIVKEY: &str = "client_privkey_hex";
pub const KEY_SERVER_PUBKEY: &str = "server_pubkey_hex";

/// Every key a client configuration must supply.
pub const REQUIRED_KEYS: [&str; 3] = [KEY_SERIAL_ID, KEY_CLIENT_PRIVKEY, KEY_SERVER_PUBKEY];

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("missing config key: {0}")]
    MissingKey(&'static str),
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
    #[error("cannot read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Raw client configuration values.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub client_serial_id: String,
    pub client_privkey_hex: String,
    pub server_pubkey_hex: String,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("client_serial_id", &self.client_serial_id)
            .field("client_privkey_hex", &"<redacted>")
            .field("server_pubkey_hex", &self.server_pubkey_hex)
            .finish()
    }
}

impl ClientConfig {
    /// Pick the required keys out of a parsed key/value map.
    pub fn from_map(values: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |key: &'static str| {
            values
                .get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::MissingKey(key))
        };
        Ok(Self {
            client_serial_id: get(KEY_SERIAL_ID)?,
            client_privkey_hex: get(KEY_CLIENT_PRIVKEY)?,
            server_pubkey_hex: get(KEY_SERVER_PUBKEY)?,
        })
    }

    /// Parse and validate the key material.
    pub fn identity(&self) -> Result<ClientIdentity, ConfigError> {
        if self.client_serial_id.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: KEY_SERIAL_ID,
                reason: "must not be empty".into(),
            });
        }
        let client_key =
            PrivateKey::from_hex(&self.client_privkey_hex).map_err(|e| ConfigError::InvalidValue {
                key: KEY_CLIENT_PRIVKEY,
                reason: e.to_string(),
            })?;
        let server_key =
            PublicKey::from_hex(&self.server_pubkey_hex).map_err(|e| ConfigError::InvalidValue {
                key: KEY_SERVER_PUBKEY,
                reason: e.to_string(),
            })?;
        Ok(ClientIdentity {
            serial_id: self.client_serial_id.as_bytes().to_vec(),
            client_key,
            server_key,
        })
    }
}

/// Parsed key material for one client.
#[derive(Clone, Debug)]
pub struct ClientIdentity {
    pub serial_id: Vec<u8>,
    pub client_key: PrivateKey,
    pub server_key: PublicKey,
}
