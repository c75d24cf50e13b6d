//! Error types for the catalog API client.
//!
//! # Design
//! `Unauthorized` gets a dedicated variant because a bad token is the one
//! failure every integration hits first, and the server's 401 body carries
//! nothing useful. All other HTTP statuses >= 400 land in `Api` with the
//! status code and the decoded body, so callers can reconstruct the server's
//! diagnostic. Validation failures are raised before any request is built.

use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;

/// Errors returned by `PoboClient` operations.
#[derive(Debug, Error)]
pub enum PoboError {
    /// No response was obtained from the server at all.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server returned 401. The body is ignored.
    #[error("Authorization token required or invalid")]
    Unauthorized,

    /// The server returned a status >= 400 other than 401.
    #[error("{message}")]
    Api {
        message: String,
        status: u16,
        body: Option<Value>,
    },

    /// The batch was rejected locally; nothing was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// A successful response did not have the expected shape.
    #[error("deserialization failed: {0}")]
    Deserialization(String),
}

impl PoboError {
    /// Build an `Api` error from an HTTP status and the decoded response body.
    ///
    /// The message is taken from the body's `message` field, then `error`,
    /// then falls back to a generic description of the status.
    pub fn from_response(status: u16, body: Option<Value>) -> Self {
        let message = body
            .as_ref()
            .and_then(|b| {
                b.get("message")
                    .and_then(Value::as_str)
                    .or_else(|| b.get("error").and_then(Value::as_str))
            })
            .map(str::to_string)
            .unwrap_or_else(|| format!("API request failed with HTTP {status}"));
        PoboError::Api {
            message,
            status,
            body,
        }
    }

    /// HTTP status associated with this error, if the server produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            PoboError::Unauthorized => Some(401),
            PoboError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// The transport failed before a response was received.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("transport error: {description}")]
pub struct TransportError {
    pub description: String,
}

impl TransportError {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

/// A bulk import batch that cannot be submitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Payload cannot be empty")]
    EmptyPayload,

    #[error("Too many items: {count} provided, maximum is {max}")]
    TooManyItems { count: usize, max: usize },
}

impl ValidationError {
    /// Per-field messages, keyed by the offending field name.
    pub fn field_errors(&self) -> BTreeMap<String, Vec<String>> {
        let message = match self {
            ValidationError::EmptyPayload => "At least one item is required".to_string(),
            ValidationError::TooManyItems { max, .. } => {
                format!("Maximum {max} items allowed for bulk import")
            }
        };
        BTreeMap::from([("bulk".to_string(), vec![message])])
    }
}

/// Errors raised while verifying and decoding an inbound webhook.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookError {
    #[error("Missing webhook signature header")]
    MissingSignature,

    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Invalid webhook payload - could not parse JSON")]
    InvalidPayload,

    #[error("Unknown webhook event: {0}")]
    UnknownEvent(String),
}

/// Errors raised while reading configuration from the environment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}
