//! Blocking client SDK for the Pobo catalog REST API.
//!
//! # Overview
//! Bulk-imports products, categories, parameters and blogs, lists and
//! iterates paged collections, and verifies signed webhook notifications.
//!
//! # Design
//! - `PoboClient` is stateless apart from its configuration; every call is
//!   independent.
//! - Each request is split into `build_request` / `parse_response` around a
//!   `Transport`, so the I/O boundary is explicit and swappable.
//! - Import batches are validated locally before anything is sent.
//! - `PageIter` fetches pages lazily and trusts the server's paging metadata.
//! - `WebhookHandler` checks the HMAC over the raw body before parsing it.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod import;
pub mod pagination;
pub mod types;
pub mod webhook;

pub use client::PoboClient;
pub use config::{ClientConfig, CONNECT_TIMEOUT, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
pub use error::{ConfigError, PoboError, TransportError, ValidationError, WebhookError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
pub use import::{validate_bulk_size, ImportResult, ItemError, MAX_BULK_ITEMS};
pub use pagination::{ListFilter, ListParams, PageIter, PaginatedResponse};
pub use types::{
    Blog, CatalogEntity, Category, CategoryRef, Content, EntityKind, Language, Listable,
    LocalizedString, Parameter, ParameterValue, Product,
};
pub use webhook::{WebhookEvent, WebhookHandler, WebhookPayload, WEBHOOK_SIGNATURE_HEADER};
