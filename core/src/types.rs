//! Catalog entities and their JSON shapes.
//!
//! # Design
//! The wire format is snake_case JSON. Fields the server fills in (`guid`,
//! timestamps, `is_loaded`, ...) deserialize but are never sent back on
//! import. Optional fields are omitted when absent and list fields when
//! empty, so an import payload only carries what the caller set.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Language tags understood by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Default,
    Cs,
    Sk,
    En,
    De,
    Pl,
    Hu,
}

impl Language {
    pub const ALL: [Language; 7] = [
        Language::Default,
        Language::Cs,
        Language::Sk,
        Language::En,
        Language::De,
        Language::Pl,
        Language::Hu,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Default => "default",
            Language::Cs => "cs",
            Language::Sk => "sk",
            Language::En => "en",
            Language::De => "de",
            Language::Pl => "pl",
            Language::Hu => "hu",
        }
    }

    pub fn values() -> Vec<&'static str> {
        Self::ALL.iter().map(Language::as_str).collect()
    }

    pub fn is_valid(tag: &str) -> bool {
        Self::ALL.iter().any(|l| l.as_str() == tag)
    }
}

/// A translatable value: language tag to (possibly null) text.
///
/// Tags outside `Language` are kept as received.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalizedString {
    values: BTreeMap<String, Option<String>>,
}

impl LocalizedString {
    /// A value with only the `default` translation set.
    pub fn create(default: impl Into<String>) -> Self {
        Self::default().with_translation(Language::Default, Some(default.into()))
    }

    /// Returns a copy with `language` set to `value`; `self` is unchanged.
    pub fn with_translation(&self, language: Language, value: Option<String>) -> Self {
        let mut values = self.values.clone();
        values.insert(language.as_str().to_string(), value);
        Self { values }
    }

    pub fn get(&self, language: Language) -> Option<&str> {
        self.values.get(language.as_str()).and_then(|v| v.as_deref())
    }

    pub fn get_default(&self) -> Option<&str> {
        self.get(Language::Default)
    }

    pub fn as_map(&self) -> &BTreeMap<String, Option<String>> {
        &self.values
    }
}

impl From<BTreeMap<String, Option<String>>> for LocalizedString {
    fn from(values: BTreeMap<String, Option<String>>) -> Self {
        Self { values }
    }
}

/// Rendered rich content of a blog post, per language.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, deserialize_with = "nullable")]
    pub html: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "nullable")]
    pub marketplace: BTreeMap<String, String>,
}

impl Content {
    pub fn html(&self, language: Language) -> Option<&str> {
        self.html.get(language.as_str()).map(String::as_str)
    }

    pub fn marketplace(&self, language: Language) -> Option<&str> {
        self.marketplace.get(language.as_str()).map(String::as_str)
    }

    /// `default`, falling back to `cs`.
    pub fn html_default(&self) -> Option<&str> {
        self.html(Language::Default).or_else(|| self.html(Language::Cs))
    }

    /// `default`, falling back to `cs`.
    pub fn marketplace_default(&self) -> Option<&str> {
        self.marketplace(Language::Default)
            .or_else(|| self.marketplace(Language::Cs))
    }
}

/// Summary of a category a product belongs to, as embedded in product listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: String,
    #[serde(default)]
    pub name: LocalizedString,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub is_visible: bool,
    pub name: LocalizedString,
    pub url: LocalizedString,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_description: Option<LocalizedString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<LocalizedString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seo_title: Option<LocalizedString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seo_description: Option<LocalizedString>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub categories_ids: Vec<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub parameters_ids: Vec<i64>,

    #[serde(default, skip_serializing)]
    pub guid: Option<Uuid>,
    #[serde(default, skip_serializing)]
    pub is_loaded: Option<bool>,
    #[serde(default, deserialize_with = "nullable", skip_serializing)]
    pub categories: Vec<CategoryRef>,
    #[serde(default, skip_serializing)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Product {
    pub fn new(
        id: impl Into<String>,
        is_visible: bool,
        name: LocalizedString,
        url: LocalizedString,
    ) -> Self {
        Self {
            id: id.into(),
            is_visible,
            name,
            url,
            short_description: None,
            description: None,
            seo_title: None,
            seo_description: None,
            images: Vec::new(),
            categories_ids: Vec::new(),
            parameters_ids: Vec::new(),
            guid: None,
            is_loaded: None,
            categories: Vec::new(),
            created_at: None,
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub is_visible: bool,
    pub name: LocalizedString,
    pub url: LocalizedString,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<LocalizedString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seo_title: Option<LocalizedString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seo_description: Option<LocalizedString>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,

    #[serde(default, skip_serializing)]
    pub guid: Option<Uuid>,
    #[serde(default, skip_serializing)]
    pub is_loaded: Option<bool>,
    #[serde(default, skip_serializing)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Category {
    pub fn new(
        id: impl Into<String>,
        is_visible: bool,
        name: LocalizedString,
        url: LocalizedString,
    ) -> Self {
        Self {
            id: id.into(),
            is_visible,
            name,
            url,
            description: None,
            seo_title: None,
            seo_description: None,
            images: Vec::new(),
            guid: None,
            is_loaded: None,
            created_at: None,
            updated_at: None,
        }
    }
}

/// A blog post. Every field is optional on import; the server assigns `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blog {
    #[serde(default, skip_serializing)]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default = "default_visible", deserialize_with = "visible_or_default")]
    pub is_visible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<LocalizedString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<LocalizedString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<LocalizedString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seo_title: Option<LocalizedString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seo_description: Option<LocalizedString>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,

    #[serde(default, skip_serializing)]
    pub content: Option<Content>,
    #[serde(default, skip_serializing)]
    pub is_loaded: Option<bool>,
    #[serde(default, skip_serializing)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for Blog {
    fn default() -> Self {
        Self {
            id: None,
            guid: None,
            category: None,
            is_visible: true,
            name: None,
            url: None,
            description: None,
            seo_title: None,
            seo_description: None,
            images: Vec::new(),
            content: None,
            is_loaded: None,
            created_at: None,
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterValue {
    pub id: i64,
    pub value: String,
}

/// A product parameter (e.g. "Color") with its allowed values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub id: i64,
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub values: Vec<ParameterValue>,
}

/// The resource collections exposed by the REST API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Products,
    Categories,
    Parameters,
    Blogs,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Products => "products",
            EntityKind::Categories => "categories",
            EntityKind::Parameters => "parameters",
            EntityKind::Blogs => "blogs",
        }
    }

    /// Collection path, relative to the API base URL.
    pub fn path(&self) -> String {
        format!("/api/v2/rest/{}", self.as_str())
    }

    /// Parameters can be imported but not listed.
    pub fn is_listable(&self) -> bool {
        !matches!(self, EntityKind::Parameters)
    }
}

/// An entity that can be bulk-imported.
pub trait CatalogEntity: Serialize + DeserializeOwned {
    const KIND: EntityKind;
}

/// An entity whose collection supports paged listing.
pub trait Listable: CatalogEntity {}

impl CatalogEntity for Product {
    const KIND: EntityKind = EntityKind::Products;
}

impl CatalogEntity for Category {
    const KIND: EntityKind = EntityKind::Categories;
}

impl CatalogEntity for Parameter {
    const KIND: EntityKind = EntityKind::Parameters;
}

impl CatalogEntity for Blog {
    const KIND: EntityKind = EntityKind::Blogs;
}

impl Listable for Product {}
impl Listable for Category {}
impl Listable for Blog {}

fn default_visible() -> bool {
    true
}

/// Blog visibility: missing and `null` both mean visible.
fn visible_or_default<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or_else(default_visible))
}

/// Treats an explicit JSON `null` like a missing field.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
