//! Request executor and the catalog operations built on it.
//!
//! # Design
//! `PoboClient` holds only its configuration and a transport; no state
//! carries over between calls. Every operation goes through
//! `build_request` (produces an `HttpRequest`) and `parse_response`
//! (interprets an `HttpResponse`), with the transport doing the round-trip
//! in between. Both halves are public so a host with its own HTTP stack can
//! do the I/O itself.

use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::PoboError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
use crate::import::{validate_bulk_size, ImportResult};
use crate::pagination::{ListFilter, ListParams, PageIter, PaginatedResponse};
use crate::types::{Blog, CatalogEntity, Category, EntityKind, Listable, Parameter, Product};

/// Blocking client for the catalog REST API.
#[derive(Clone)]
pub struct PoboClient<T = UreqTransport> {
    config: ClientConfig,
    transport: T,
}

impl<T> fmt::Debug for PoboClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoboClient")
            .field("base_url", &self.config.base_url)
            .field("timeout", &self.config.timeout)
            .finish_non_exhaustive()
    }
}

impl PoboClient<UreqTransport> {
    /// Client against the production API with default timeouts.
    pub fn new(token: impl Into<String>) -> Self {
        Self::from_config(ClientConfig::new(token))
    }

    pub fn from_config(config: ClientConfig) -> Self {
        let transport = UreqTransport::new(config.timeout);
        Self { config, transport }
    }
}

impl<T> PoboClient<T> {
    /// Client that sends every request through `transport`.
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Build the request for `method` on `path` (which may carry a query).
    pub fn build_request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
    ) -> Result<HttpRequest, PoboError> {
        let body = match (method, body) {
            (HttpMethod::Post, Some(body)) => Some(
                serde_json::to_string(body).map_err(|e| PoboError::Serialization(e.to_string()))?,
            ),
            _ => None,
        };
        Ok(HttpRequest {
            method,
            url: format!("{}{path}", self.config.base_url),
            headers: vec![
                (
                    "Authorization".to_string(),
                    format!("Bearer {}", self.config.token),
                ),
                ("Content-Type".to_string(), "application/json".to_string()),
                ("Accept".to_string(), "application/json".to_string()),
            ],
            body,
        })
    }

    /// Interpret a response: 401 is always `Unauthorized`, any other status
    /// >= 400 is an `Api` error, anything else yields the decoded body.
    ///
    /// An empty or undecodable body decodes to an empty object.
    pub fn parse_response(&self, response: HttpResponse) -> Result<Value, PoboError> {
        let body = serde_json::from_str::<Value>(&response.body)
            .ok()
            .filter(|v| !v.is_null());

        if response.status == 401 {
            warn!("request rejected: unauthorized");
            return Err(PoboError::Unauthorized);
        }
        if response.status >= 400 {
            let err = PoboError::from_response(response.status, body);
            warn!(status = response.status, error = %err, "request failed");
            return Err(err);
        }
        Ok(body.unwrap_or_else(|| Value::Object(Map::new())))
    }
}

impl<T: Transport> PoboClient<T> {
    /// Send one request and interpret its response.
    pub fn execute(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, PoboError> {
        let request = self.build_request(method, path, body)?;
        debug!(method = method.as_str(), url = %request.url, "sending request");
        let response = self.transport.send(&request)?;
        debug!(status = response.status, "received response");
        self.parse_response(response)
    }

    /// Bulk-import up to `MAX_BULK_ITEMS` entities in one request.
    pub fn import<E: CatalogEntity>(&self, items: &[E]) -> Result<ImportResult, PoboError> {
        validate_bulk_size(items)?;
        let payload = items
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| PoboError::Serialization(e.to_string()))?;
        self.submit_import(E::KIND, payload)
    }

    /// Bulk-import already-shaped JSON objects into `kind`.
    pub fn import_raw(&self, kind: EntityKind, items: &[Value]) -> Result<ImportResult, PoboError> {
        validate_bulk_size(items)?;
        self.submit_import(kind, items.to_vec())
    }

    fn submit_import(&self, kind: EntityKind, payload: Vec<Value>) -> Result<ImportResult, PoboError> {
        debug!(kind = kind.as_str(), count = payload.len(), "importing batch");
        let response = self.execute(HttpMethod::Post, &kind.path(), Some(&Value::Array(payload)))?;
        decode(response)
    }

    /// Fetch a single page of a collection.
    pub fn list<E: Listable>(&self, params: &ListParams) -> Result<PaginatedResponse<E>, PoboError> {
        let path = format!("{}{}", E::KIND.path(), params.query_string());
        let response = self.execute(HttpMethod::Get, &path, None)?;
        PaginatedResponse::from_value(response)
    }

    /// Walk every page of a collection. Nothing is fetched until the first
    /// call to `next`.
    pub fn iter<E: Listable>(&self, filter: &ListFilter) -> PageIter<'_, E, T> {
        PageIter::new(self, filter.clone())
    }

    pub fn import_products(&self, products: &[Product]) -> Result<ImportResult, PoboError> {
        self.import(products)
    }

    pub fn import_categories(&self, categories: &[Category]) -> Result<ImportResult, PoboError> {
        self.import(categories)
    }

    pub fn import_parameters(&self, parameters: &[Parameter]) -> Result<ImportResult, PoboError> {
        self.import(parameters)
    }

    pub fn import_blogs(&self, blogs: &[Blog]) -> Result<ImportResult, PoboError> {
        self.import(blogs)
    }

    pub fn get_products(&self, params: &ListParams) -> Result<PaginatedResponse<Product>, PoboError> {
        self.list(params)
    }

    pub fn get_categories(
        &self,
        params: &ListParams,
    ) -> Result<PaginatedResponse<Category>, PoboError> {
        self.list(params)
    }

    pub fn get_blogs(&self, params: &ListParams) -> Result<PaginatedResponse<Blog>, PoboError> {
        self.list(params)
    }

    pub fn iter_products(&self, filter: &ListFilter) -> PageIter<'_, Product, T> {
        self.iter(filter)
    }

    pub fn iter_categories(&self, filter: &ListFilter) -> PageIter<'_, Category, T> {
        self.iter(filter)
    }

    pub fn iter_blogs(&self, filter: &ListFilter) -> PageIter<'_, Blog, T> {
        self.iter(filter)
    }
}

fn decode<R: DeserializeOwned>(value: Value) -> Result<R, PoboError> {
    serde_json::from_value(value).map_err(|e| PoboError::Deserialization(e.to_string()))
}
