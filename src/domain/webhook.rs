use crate::error::{PayhookError, Result};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

/// Registration key that matches every event type.
pub const WILDCARD_EVENT: &str = "all";

/// An inbound gateway notification.
///
/// The gateway only announces that a resource changed; the resource itself is
/// fetched through `retrieve_url`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    #[serde(rename = "event")]
    pub event_type: String,
    pub public_key: String,
    pub retrieve_url: String,
    #[serde(default)]
    pub payment_id: Option<String>,
    #[serde(skip)]
    pub payload: String,
}

impl WebhookEvent {
    /// Parses a raw delivery body, keeping the body for re-submission to the gateway.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut event: Self = serde_json::from_slice(bytes).map_err(PayhookError::InvalidPayload)?;
        event.payload = String::from_utf8_lossy(bytes).into_owned();
        Ok(event)
    }

    /// Resource group of the event, e.g. `charge` for `charge.succeeded`.
    pub fn resource_group(&self) -> &str {
        self.event_type
            .split_once('.')
            .map_or(self.event_type.as_str(), |(group, _)| group)
    }

    /// Whether a handler registered under `hook` receives this event.
    pub fn matches_hook(&self, hook: &str) -> bool {
        hook == WILDCARD_EVENT || hook == self.event_type || hook == self.resource_group()
    }

    /// Rejects events that were not signed with the configured public key.
    pub fn verify_public_key(&self, expected: &str) -> Result<()> {
        if bool::from(self.public_key.as_bytes().ct_eq(expected.as_bytes())) {
            Ok(())
        } else {
            Err(PayhookError::Security)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = r#"{
        "event": "charge.succeeded",
        "publicKey": "s-pub-123",
        "retrieveUrl": "https://api.example.test/v1/payments/s-pay-1/charges/s-chg-1",
        "paymentId": "s-pay-1"
    }"#;

    #[test]
    fn test_parse_delivery() {
        let event = WebhookEvent::from_bytes(PAYLOAD.as_bytes()).unwrap();
        assert_eq!(event.event_type, "charge.succeeded");
        assert_eq!(event.public_key, "s-pub-123");
        assert_eq!(event.payment_id.as_deref(), Some("s-pay-1"));
        assert_eq!(event.payload, PAYLOAD);
        assert_eq!(event.resource_group(), "charge");
    }

    #[test]
    fn test_parse_rejects_malformed_body() {
        let result = WebhookEvent::from_bytes(b"{\"event\": 42}");
        assert!(matches!(result, Err(PayhookError::InvalidPayload(_))));
    }

    #[test]
    fn test_hook_matching() {
        let event = WebhookEvent::from_bytes(PAYLOAD.as_bytes()).unwrap();
        assert!(event.matches_hook("charge"));
        assert!(event.matches_hook("charge.succeeded"));
        assert!(event.matches_hook(WILDCARD_EVENT));
        assert!(!event.matches_hook("charge.canceled"));
        assert!(!event.matches_hook("payment"));
    }

    #[test]
    fn test_public_key_verification() {
        let event = WebhookEvent::from_bytes(PAYLOAD.as_bytes()).unwrap();
        assert!(event.verify_public_key("s-pub-123").is_ok());
        assert!(matches!(
            event.verify_public_key("s-pub-124"),
            Err(PayhookError::Security)
        ));
        assert!(matches!(
            event.verify_public_key(""),
            Err(PayhookError::Security)
        ));
    }
}
