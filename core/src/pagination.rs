//! Paged listing and the lazy iterator over every page.
//!
//! # Design
//! The API pages with `page`/`per_page` and reports `current_page`,
//! `per_page` and `total` in a `meta` object. Whether another page exists is
//! decided purely from that metadata; item counts are never cross-checked.
//! `PageIter` replaces a generator with an explicit cursor: it holds the next
//! page number and the unconsumed items of the last fetched page, and only
//! fetches again once those run out.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::client::PoboClient;
use crate::error::PoboError;
use crate::http::Transport;
use crate::import::MAX_BULK_ITEMS;
use crate::types::Listable;

const DEFAULT_PER_PAGE: u32 = 100;
const LAST_UPDATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Filters shared by single-page listing and full iteration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    /// Only entities updated at or after this instant.
    pub last_update_from: Option<DateTime<Utc>>,
    pub is_edited: Option<bool>,
}

impl ListFilter {
    pub fn updated_since(mut self, since: DateTime<Utc>) -> Self {
        self.last_update_from = Some(since);
        self
    }

    pub fn edited(mut self, is_edited: bool) -> Self {
        self.is_edited = Some(is_edited);
        self
    }
}

/// Parameters for one listing call. Unset fields are left out of the query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListParams {
    pub page: Option<u32>,
    /// Capped at `MAX_BULK_ITEMS` when the query is built.
    pub per_page: Option<u32>,
    pub filter: ListFilter,
}

impl ListParams {
    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn per_page(mut self, per_page: u32) -> Self {
        self.per_page = Some(per_page);
        self
    }

    pub fn filter(mut self, filter: ListFilter) -> Self {
        self.filter = filter;
        self
    }

    /// `?page=..&per_page=..&last_update_time_from=..&is_edited=..`, or an
    /// empty string when nothing is set. Values are form-encoded, so a space
    /// becomes `+`.
    pub fn query_string(&self) -> String {
        let mut pairs: Vec<(&str, String)> = Vec::new();
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(per_page) = self.per_page {
            let capped = per_page.min(MAX_BULK_ITEMS as u32);
            pairs.push(("per_page", capped.to_string()));
        }
        if let Some(since) = self.filter.last_update_from {
            pairs.push((
                "last_update_time_from",
                since.format(LAST_UPDATE_FORMAT).to_string(),
            ));
        }
        if let Some(is_edited) = self.filter.is_edited {
            let flag = if is_edited { "true" } else { "false" };
            pairs.push(("is_edited", flag.to_string()));
        }

        if pairs.is_empty() {
            return String::new();
        }
        let query = pairs
            .iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(v).replace("%20", "+")))
            .collect::<Vec<_>>()
            .join("&");
        format!("?{query}")
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub current_page: u32,
    pub per_page: u32,
    pub total: u64,
}

impl<T> PaginatedResponse<T> {
    pub fn has_more_pages(&self) -> bool {
        u64::from(self.current_page) * u64::from(self.per_page) < self.total
    }

    pub fn total_pages(&self) -> u64 {
        if self.per_page == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.per_page))
    }
}

impl<T: DeserializeOwned> PaginatedResponse<T> {
    /// Decode `{data: [...], meta: {current_page, per_page, total}}`.
    ///
    /// Missing meta fields default to page 1, 100 per page, and a total equal
    /// to the number of returned items.
    pub fn from_value(mut value: Value) -> Result<Self, PoboError> {
        let data = match value.get_mut("data").map(Value::take) {
            Some(Value::Array(data)) => data,
            None | Some(Value::Null) => Vec::new(),
            Some(other) => {
                return Err(PoboError::Deserialization(format!(
                    "expected `data` to be an array, got {other}"
                )))
            }
        };
        let items = data
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<T>, _>>()
            .map_err(|e| PoboError::Deserialization(e.to_string()))?;

        let meta = value.get("meta");
        let field = |name: &str| meta.and_then(|m| m.get(name)).and_then(Value::as_u64);
        let current_page = field("current_page")
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(1);
        let per_page = field("per_page")
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(DEFAULT_PER_PAGE);
        let total = field("total").unwrap_or(items.len() as u64);

        Ok(Self {
            items,
            current_page,
            per_page,
            total,
        })
    }
}

/// Lazily walks every page of a collection, starting at page 1.
///
/// Each page is requested with the maximum page size. The first page is
/// always fetched; iteration continues while the page just fetched reports
/// `has_more_pages()`. After an error the iterator yields it once and ends.
pub struct PageIter<'a, T, Tr> {
    client: &'a PoboClient<Tr>,
    filter: ListFilter,
    next_page: u32,
    items: std::vec::IntoIter<T>,
    finished: bool,
    max_pages: Option<u32>,
}

impl<'a, T, Tr> PageIter<'a, T, Tr> {
    pub(crate) fn new(client: &'a PoboClient<Tr>, filter: ListFilter) -> Self {
        Self {
            client,
            filter,
            next_page: 1,
            items: Vec::new().into_iter(),
            finished: false,
            max_pages: None,
        }
    }

    /// Stop after `limit` fetches even if the server reports more pages.
    pub fn max_pages(mut self, limit: u32) -> Self {
        self.max_pages = Some(limit);
        self
    }

    /// Number of pages fetched so far.
    pub fn pages_fetched(&self) -> u32 {
        self.next_page - 1
    }
}

impl<T, Tr> Iterator for PageIter<'_, T, Tr>
where
    T: Listable,
    Tr: Transport,
{
    type Item = Result<T, PoboError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.items.next() {
                return Some(Ok(item));
            }
            if self.finished {
                return None;
            }
            if self.max_pages.is_some_and(|limit| self.pages_fetched() >= limit) {
                debug!(kind = T::KIND.as_str(), pages = self.pages_fetched(), "page limit reached");
                self.finished = true;
                return None;
            }

            let params = ListParams {
                page: Some(self.next_page),
                per_page: Some(MAX_BULK_ITEMS as u32),
                filter: self.filter.clone(),
            };
            match self.client.list::<T>(&params) {
                Ok(page) => {
                    debug!(
                        kind = T::KIND.as_str(),
                        page = self.next_page,
                        items = page.items.len(),
                        total = page.total,
                        "fetched page"
                    );
                    self.next_page += 1;
                    self.finished = !page.has_more_pages();
                    self.items = page.items.into_iter();
                }
                Err(err) => {
                    self.finished = true;
                    return Some(Err(err));
                }
            }
        }
    }
}
