use std::{collections::HashSet, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

pub const MAX_BULK_ITEMS: usize = 100;

/// Stored catalog, one JSON object per entity, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub products: Vec<Value>,
    pub categories: Vec<Value>,
    pub blogs: Vec<Value>,
    pub parameters: Vec<Value>,
}

impl Catalog {
    fn collection_mut(&mut self, collection: Collection) -> &mut Vec<Value> {
        match collection {
            Collection::Products => &mut self.products,
            Collection::Categories => &mut self.categories,
            Collection::Blogs => &mut self.blogs,
            Collection::Parameters => &mut self.parameters,
        }
    }

    fn collection(&self, collection: Collection) -> &[Value] {
        match collection {
            Collection::Products => &self.products,
            Collection::Categories => &self.categories,
            Collection::Blogs => &self.blogs,
            Collection::Parameters => &self.parameters,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Collection {
    Products,
    Categories,
    Blogs,
    Parameters,
}

impl Collection {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "products" => Some(Collection::Products),
            "categories" => Some(Collection::Categories),
            "blogs" => Some(Collection::Blogs),
            "parameters" => Some(Collection::Parameters),
            _ => None,
        }
    }
}

pub type Db = Arc<RwLock<Catalog>>;

#[derive(Clone)]
struct AppState {
    db: Db,
    token: Arc<str>,
}

type ApiResult = Result<Json<Value>, (StatusCode, Json<Value>)>;

/// Router with an empty catalog that accepts `Bearer <token>`.
pub fn app(token: &str) -> Router {
    app_with_catalog(token, Catalog::default())
}

pub fn app_with_catalog(token: &str, catalog: Catalog) -> Router {
    let state = AppState {
        db: Arc::new(RwLock::new(catalog)),
        token: Arc::from(token),
    };
    Router::new()
        .route(
            "/api/v2/rest/{collection}",
            get(list_collection).post(import_collection),
        )
        .with_state(state)
}

pub async fn run(listener: TcpListener, token: &str) -> Result<(), std::io::Error> {
    axum::serve(listener, app(token)).await
}

pub async fn run_with_catalog(
    listener: TcpListener,
    token: &str,
    catalog: Catalog,
) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_catalog(token, catalog)).await
}

fn failure(status: StatusCode, body: Value) -> (StatusCode, Json<Value>) {
    (status, Json(body))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), (StatusCode, Json<Value>)> {
    let expected = format!("Bearer {}", state.token);
    let given = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    if given == Some(expected.as_str()) {
        Ok(())
    } else {
        Err(failure(
            StatusCode::UNAUTHORIZED,
            json!({"error": "Unauthenticated."}),
        ))
    }
}

fn resolve(name: &str) -> Result<Collection, (StatusCode, Json<Value>)> {
    Collection::parse(name).ok_or_else(|| {
        failure(
            StatusCode::NOT_FOUND,
            json!({"message": format!("Unknown collection: {name}")}),
        )
    })
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub last_update_time_from: Option<String>,
    pub is_edited: Option<String>,
}

async fn list_collection(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> ApiResult {
    authorize(&state, &headers)?;
    let collection = resolve(&name)?;
    if collection == Collection::Parameters {
        return Err(failure(
            StatusCode::METHOD_NOT_ALLOWED,
            json!({"message": "Parameters cannot be listed"}),
        ));
    }

    let is_edited = match query.is_edited.as_deref() {
        None => None,
        Some("true") => Some(true),
        Some("false") => Some(false),
        Some(other) => {
            return Err(failure(
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({"message": format!("Invalid is_edited value: {other}")}),
            ))
        }
    };
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query
        .per_page
        .unwrap_or(MAX_BULK_ITEMS as u64)
        .clamp(1, MAX_BULK_ITEMS as u64);

    let db = state.db.read().await;
    let matching: Vec<&Value> = db
        .collection(collection)
        .iter()
        .filter(|item| match is_edited {
            Some(flag) => item.get("is_edited").and_then(Value::as_bool).unwrap_or(false) == flag,
            None => true,
        })
        .collect();
    let total = matching.len();
    let start = (page - 1).saturating_mul(per_page) as usize;
    let data: Vec<Value> = matching
        .into_iter()
        .skip(start)
        .take(per_page as usize)
        .cloned()
        .collect();
    debug!(collection = %name, page, per_page, total, "list");

    Ok(Json(json!({
        "data": data,
        "meta": {"current_page": page, "per_page": per_page, "total": total}
    })))
}

#[derive(Debug, Default)]
struct ImportTally {
    imported: u64,
    updated: u64,
    skipped: u64,
    errors: Vec<Value>,
    values_imported: u64,
    values_updated: u64,
}

async fn import_collection(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> ApiResult {
    authorize(&state, &headers)?;
    let collection = resolve(&name)?;

    let Value::Array(items) = payload else {
        return Err(failure(
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({"message": "Payload must be an array"}),
        ));
    };
    if items.is_empty() {
        return Err(failure(
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({"message": "Payload cannot be empty"}),
        ));
    }
    if items.len() > MAX_BULK_ITEMS {
        return Err(failure(
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({
                "message": format!("Too many items: {} provided, maximum is {MAX_BULK_ITEMS}", items.len()),
                "errors": {"bulk": [format!("Maximum {MAX_BULK_ITEMS} items allowed for bulk import")]}
            }),
        ));
    }

    let mut tally = ImportTally::default();
    let mut db = state.db.write().await;
    let stored = db.collection_mut(collection);
    for (index, item) in items.into_iter().enumerate() {
        let problems = validate_item(collection, &item);
        if !problems.is_empty() {
            tally.skipped += 1;
            tally.errors.push(json!({
                "index": index,
                "id": item_id(&item),
                "errors": problems,
            }));
            continue;
        }
        upsert(collection, stored, item, &mut tally);
    }
    info!(
        collection = %name,
        imported = tally.imported,
        updated = tally.updated,
        skipped = tally.skipped,
        "import"
    );

    let mut body = json!({
        "success": tally.errors.is_empty(),
        "imported": tally.imported,
        "updated": tally.updated,
        "skipped": tally.skipped,
        "errors": tally.errors,
    });
    if collection == Collection::Parameters {
        body["values_imported"] = json!(tally.values_imported);
        body["values_updated"] = json!(tally.values_updated);
    }
    Ok(Json(body))
}

/// The item's `id` exactly as submitted: a string, a number or null.
fn item_id(item: &Value) -> Value {
    item.get("id").cloned().unwrap_or(Value::Null)
}

fn has_default_name(item: &Value, field: &str) -> bool {
    item.get(field)
        .and_then(|v| v.get("default"))
        .and_then(Value::as_str)
        .is_some_and(|s| !s.is_empty())
}

fn validate_item(collection: Collection, item: &Value) -> Vec<String> {
    let mut problems = Vec::new();
    if !item.is_object() {
        problems.push("Item must be an object".to_string());
        return problems;
    }
    match collection {
        Collection::Products | Collection::Categories => {
            if !item.get("id").is_some_and(Value::is_string) {
                problems.push("The id field is required.".to_string());
            }
            if !item.get("is_visible").is_some_and(Value::is_boolean) {
                problems.push("The is_visible field is required.".to_string());
            }
            if !has_default_name(item, "name") {
                problems.push("The name.default field is required.".to_string());
            }
            if !has_default_name(item, "url") {
                problems.push("The url.default field is required.".to_string());
            }
        }
        Collection::Parameters => {
            if !item.get("id").is_some_and(Value::is_i64) {
                problems.push("The id field is required.".to_string());
            }
            if !item.get("name").is_some_and(Value::is_string) {
                problems.push("The name field is required.".to_string());
            }
        }
        Collection::Blogs => {
            if !has_default_name(item, "name") {
                problems.push("The name.default field is required.".to_string());
            }
        }
    }
    problems
}

fn upsert(collection: Collection, stored: &mut Vec<Value>, mut item: Value, tally: &mut ImportTally) {
    let key_field = match collection {
        Collection::Blogs => "guid",
        _ => "id",
    };
    let existing = item
        .get(key_field)
        .filter(|k| !k.is_null())
        .and_then(|key| stored.iter().position(|s| s.get(key_field) == Some(key)));

    if collection == Collection::Parameters {
        let previous = existing.map(|pos| value_ids(&stored[pos])).unwrap_or_default();
        for id in value_ids(&item) {
            if previous.contains(&id) {
                tally.values_updated += 1;
            } else {
                tally.values_imported += 1;
            }
        }
    }

    match existing {
        Some(pos) => {
            let obj = item.as_object_mut().map(std::mem::take).unwrap_or_default();
            merge(&mut stored[pos], obj);
            tally.updated += 1;
        }
        None => {
            if let Some(obj) = item.as_object_mut() {
                if collection != Collection::Parameters {
                    obj.entry("guid")
                        .or_insert_with(|| json!(Uuid::new_v4().to_string()));
                }
                if collection == Collection::Blogs {
                    obj.insert("id".to_string(), json!(stored.len() + 1));
                }
            }
            stored.push(item);
            tally.imported += 1;
        }
    }
}

fn merge(target: &mut Value, update: Map<String, Value>) {
    if let Some(target) = target.as_object_mut() {
        for (k, v) in update {
            target.insert(k, v);
        }
    }
}

fn value_ids(parameter: &Value) -> HashSet<i64> {
    parameter
        .get("values")
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(|v| v.get("id").and_then(Value::as_i64))
                .collect()
        })
        .unwrap_or_default()
}
