//! Typed configuration built from a [`ConfigReader`].
//!
//! The shop stores plugin configuration as loosely typed key/value pairs. Every
//! component receives one of the typed values below at construction time instead
//! of reading keys on its own.

use crate::domain::ports::ConfigReader;
use crate::error::{PayhookError, Result};
use serde_json::{Map, Value};
use std::path::Path;
use std::time::Duration;

pub const KEY_PUBLIC_KEY: &str = "public_key";
pub const KEY_PRIVATE_KEY: &str = "private_key";
pub const KEY_API_BASE_URL: &str = "api_base_url";
pub const KEY_REQUEST_TIMEOUT_SECS: &str = "request_timeout_secs";
pub const KEY_AUTOMATIC_PAYMENT_STATUS: &str = "automatic_payment_status";
pub const KEY_AUTOMATIC_PAYMENT_NOTIFICATION: &str = "automatic_payment_notification";
pub const KEY_SHIPPING_STATUS: &str = "shipping_status";

pub const DEFAULT_API_BASE_URL: &str = "https://api.unzer.com";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Flags gating what the order status service may do on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusUpdateConfig {
    /// Persist computed statuses. When off, statuses are only computed and logged.
    pub auto_status_update: bool,
    /// Ask the shop to notify the customer about each status change.
    pub auto_notify_customer: bool,
}

impl Default for StatusUpdateConfig {
    fn default() -> Self {
        Self {
            auto_status_update: true,
            auto_notify_customer: false,
        }
    }
}

impl StatusUpdateConfig {
    pub fn from_reader(reader: &dyn ConfigReader) -> Self {
        let defaults = Self::default();
        Self {
            auto_status_update: flag(reader, KEY_AUTOMATIC_PAYMENT_STATUS)
                .unwrap_or(defaults.auto_status_update),
            auto_notify_customer: flag(reader, KEY_AUTOMATIC_PAYMENT_NOTIFICATION)
                .unwrap_or(defaults.auto_notify_customer),
        }
    }
}

/// Settings of the order-side shipment notification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShipmentConfig {
    /// Fulfilment status that triggers the shipment notification. Unset disables it.
    pub shipping_status: Option<String>,
    pub auto_status_update: bool,
}

impl ShipmentConfig {
    pub fn from_reader(reader: &dyn ConfigReader) -> Self {
        Self {
            shipping_status: text(reader, KEY_SHIPPING_STATUS),
            auto_status_update: StatusUpdateConfig::from_reader(reader).auto_status_update,
        }
    }
}

/// Credentials and transport settings of the HTTP gateway client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub private_key: String,
    pub api_base_url: String,
    pub request_timeout: Duration,
}

impl GatewayConfig {
    pub fn from_reader(reader: &dyn ConfigReader) -> Result<Self> {
        let private_key = required(reader, KEY_PRIVATE_KEY)?;
        let api_base_url = text(reader, KEY_API_BASE_URL)
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let timeout_secs = reader
            .get(KEY_REQUEST_TIMEOUT_SECS)
            .and_then(|v| v.as_u64())
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        Ok(Self {
            private_key,
            api_base_url,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// Public key webhook deliveries must carry.
pub fn public_key(reader: &dyn ConfigReader) -> Result<String> {
    required(reader, KEY_PUBLIC_KEY)
}

fn required(reader: &dyn ConfigReader, key: &str) -> Result<String> {
    text(reader, key).ok_or_else(|| PayhookError::Config(format!("{key} is not configured")))
}

fn text(reader: &dyn ConfigReader, key: &str) -> Option<String> {
    match reader.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// Shop backends store flags as booleans, 0/1 or strings.
fn flag(reader: &dyn ConfigReader, key: &str) -> Option<bool> {
    match reader.get(key)? {
        Value::Bool(b) => Some(b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Configuration read from a flat JSON object.
#[derive(Debug, Clone, Default)]
pub struct JsonConfigReader {
    values: Map<String, Value>,
}

impl JsonConfigReader {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        match serde_json::from_str(content) {
            Ok(Value::Object(values)) => Ok(Self { values }),
            Ok(_) => Err(PayhookError::Config(
                "configuration must be a JSON object".to_string(),
            )),
            Err(e) => Err(PayhookError::Config(format!("invalid configuration: {e}"))),
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }
}

impl ConfigReader for JsonConfigReader {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }
}
