//! Inbound webhook verification.
//!
//! # Design
//! `handle` passes a request through four gates in a fixed order: signature
//! present, signature authentic, body is a JSON object, event is known. The
//! HMAC is computed over the raw body bytes exactly as received, and nothing
//! is parsed until the signature has checked out.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;
use tracing::{debug, warn};

use crate::error::{ConfigError, WebhookError};
use crate::http::find_header;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the hex-encoded HMAC-SHA256 of the body.
pub const WEBHOOK_SIGNATURE_HEADER: &str = "X-Webhook-Signature";
pub const ENV_WEBHOOK_SECRET: &str = "POBO_WEBHOOK_SECRET";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WebhookEvent {
    #[serde(rename = "Products.update")]
    ProductsUpdate,
    #[serde(rename = "Categories.update")]
    CategoriesUpdate,
}

impl WebhookEvent {
    pub const ALL: [WebhookEvent; 2] = [WebhookEvent::ProductsUpdate, WebhookEvent::CategoriesUpdate];

    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookEvent::ProductsUpdate => "Products.update",
            WebhookEvent::CategoriesUpdate => "Categories.update",
        }
    }

    /// Exact, case-sensitive match on the wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.as_str() == name)
    }

    pub fn values() -> Vec<&'static str> {
        Self::ALL.iter().map(WebhookEvent::as_str).collect()
    }
}

impl fmt::Display for WebhookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A verified webhook notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookPayload {
    pub event: WebhookEvent,
    pub timestamp: DateTime<Utc>,
    pub eshop_id: i64,
}

/// Verifies and decodes webhook notifications signed with a shared secret.
#[derive(Clone)]
pub struct WebhookHandler {
    secret: Vec<u8>,
}

impl fmt::Debug for WebhookHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookHandler").finish_non_exhaustive()
    }
}

impl WebhookHandler {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into().into_bytes(),
        }
    }

    /// Read the shared secret from `POBO_WEBHOOK_SECRET`.
    pub fn from_env() -> Result<Self, ConfigError> {
        std::env::var(ENV_WEBHOOK_SECRET)
            .ok()
            .filter(|s| !s.is_empty())
            .map(Self::new)
            .ok_or(ConfigError::Missing(ENV_WEBHOOK_SECRET))
    }

    /// Verify `signature` over `body` and decode the notification.
    pub fn handle(&self, body: &[u8], signature: &str) -> Result<WebhookPayload, WebhookError> {
        if signature.is_empty() {
            warn!("webhook rejected: missing signature");
            return Err(WebhookError::MissingSignature);
        }
        if !self.verify_signature(body, signature) {
            warn!("webhook rejected: signature mismatch");
            return Err(WebhookError::InvalidSignature);
        }
        let payload = parse_payload(body).inspect_err(|err| {
            warn!(error = %err, "webhook rejected after signature check");
        })?;
        debug!(event = %payload.event, eshop_id = payload.eshop_id, "webhook accepted");
        Ok(payload)
    }

    /// Like `handle`, taking the signature from the `X-Webhook-Signature`
    /// header. A missing header counts as an empty signature.
    pub fn handle_request(
        &self,
        headers: &[(String, String)],
        body: &[u8],
    ) -> Result<WebhookPayload, WebhookError> {
        let signature = find_header(headers, WEBHOOK_SIGNATURE_HEADER).unwrap_or_default();
        self.handle(body, signature)
    }

    /// Constant-time check of a lowercase hex signature against the body's
    /// HMAC. Uppercase hex never matches, as the sender only emits lowercase.
    pub fn verify_signature(&self, body: &[u8], signature: &str) -> bool {
        if signature.bytes().any(|b| b.is_ascii_uppercase()) {
            return false;
        }
        let Ok(expected) = hex::decode(signature) else {
            return false;
        };
        let mut mac = self.mac();
        mac.update(body);
        mac.verify_slice(&expected).is_ok()
    }

    /// Lowercase hex HMAC-SHA256 of `body`, as the sender computes it.
    pub fn sign(&self, body: &[u8]) -> String {
        let mut mac = self.mac();
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts keys of any length")
    }
}

fn parse_payload(body: &[u8]) -> Result<WebhookPayload, WebhookError> {
    let data: Value = serde_json::from_slice(body).map_err(|_| WebhookError::InvalidPayload)?;
    let Value::Object(data) = data else {
        return Err(WebhookError::InvalidPayload);
    };

    let event = match data.get("event") {
        Some(Value::String(name)) => {
            WebhookEvent::from_name(name).ok_or_else(|| WebhookError::UnknownEvent(name.clone()))?
        }
        None | Some(Value::Null) => return Err(WebhookError::UnknownEvent(String::new())),
        Some(other) => return Err(WebhookError::UnknownEvent(other.to_string())),
    };

    let timestamp = data
        .get("timestamp")
        .and_then(Value::as_str)
        .and_then(parse_timestamp)
        .ok_or(WebhookError::InvalidPayload)?;
    let eshop_id = data
        .get("eshop_id")
        .and_then(Value::as_i64)
        .ok_or(WebhookError::InvalidPayload)?;

    Ok(WebhookPayload {
        event,
        timestamp,
        eshop_id,
    })
}

/// RFC 3339, or `YYYY-MM-DD HH:MM:SS` taken as UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc())
        })
}
