use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, app_with_catalog, Catalog};
use serde_json::{json, Value};
use tower::ServiceExt;

const TOKEN: &str = "test-token";

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn get_request(uri: &str) -> Request<String> {
    Request::builder()
        .uri(uri)
        .header(http::header::AUTHORIZATION, format!("Bearer {TOKEN}"))
        .body(String::new())
        .unwrap()
}

fn json_request(uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(http::header::AUTHORIZATION, format!("Bearer {TOKEN}"))
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn product(i: usize) -> Value {
    json!({
        "id": format!("PROD-{i:03}"),
        "is_visible": true,
        "name": {"default": format!("Product {i}")},
        "url": {"default": format!("https://example.com/{i}")}
    })
}

fn catalog_with_products(n: usize) -> Catalog {
    Catalog {
        products: (0..n).map(product).collect(),
        ..Catalog::default()
    }
}

// --- auth ---

#[tokio::test]
async fn missing_token_returns_401() {
    let resp = app(TOKEN)
        .oneshot(
            Request::builder()
                .uri("/api/v2/rest/products")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_token_returns_401() {
    let resp = app("other-token")
        .oneshot(get_request("/api/v2/rest/products"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(resp).await;
    assert_eq!(body["error"], "Unauthenticated.");
}

// --- list ---

#[tokio::test]
async fn list_empty_collection() {
    let resp = app(TOKEN)
        .oneshot(get_request("/api/v2/rest/categories"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["data"], json!([]));
    assert_eq!(body["meta"], json!({"current_page": 1, "per_page": 100, "total": 0}));
}

#[tokio::test]
async fn list_pages_through_catalog() {
    let resp = app_with_catalog(TOKEN, catalog_with_products(250))
        .oneshot(get_request("/api/v2/rest/products?page=3&per_page=100"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 50);
    assert_eq!(data[0]["id"], "PROD-200");
    assert_eq!(body["meta"]["total"], 250);
}

#[tokio::test]
async fn list_caps_per_page() {
    let resp = app_with_catalog(TOKEN, catalog_with_products(150))
        .oneshot(get_request("/api/v2/rest/products?per_page=500"))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 100);
    assert_eq!(body["meta"]["per_page"], 100);
}

#[tokio::test]
async fn list_filters_by_edited_flag() {
    let mut catalog = catalog_with_products(3);
    catalog.products[1]["is_edited"] = json!(true);
    let resp = app_with_catalog(TOKEN, catalog)
        .oneshot(get_request("/api/v2/rest/products?is_edited=true"))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["meta"]["total"], 1);
    assert_eq!(body["data"][0]["id"], "PROD-001");
}

#[tokio::test]
async fn list_parameters_not_allowed() {
    let resp = app(TOKEN)
        .oneshot(get_request("/api/v2/rest/parameters"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn unknown_collection_returns_404() {
    let resp = app(TOKEN)
        .oneshot(get_request("/api/v2/rest/orders"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = body_json(resp).await;
    assert_eq!(body["message"], "Unknown collection: orders");
}

// --- import ---

#[tokio::test]
async fn import_reports_item_errors() {
    let payload = json!([product(1), {"id": "PROD-002"}]).to_string();
    let resp = app(TOKEN)
        .oneshot(json_request("/api/v2/rest/products", &payload))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["imported"], 1);
    assert_eq!(body["skipped"], 1);
    assert_eq!(body["errors"][0]["index"], 1);
    assert_eq!(body["errors"][0]["id"], "PROD-002");
    assert!(body.get("values_imported").is_none());
}

#[tokio::test]
async fn import_rejects_oversized_batch() {
    let items: Vec<Value> = (0..101).map(product).collect();
    let resp = app(TOKEN)
        .oneshot(json_request("/api/v2/rest/products", &Value::Array(items).to_string()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(resp).await;
    assert_eq!(body["message"], "Too many items: 101 provided, maximum is 100");
}

#[tokio::test]
async fn import_rejects_non_array() {
    let resp = app(TOKEN)
        .oneshot(json_request("/api/v2/rest/products", r#"{"id":"PROD-001"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn import_malformed_json_is_rejected() {
    let resp = app(TOKEN)
        .oneshot(json_request("/api/v2/rest/products", "[{"))
        .await
        .unwrap();
    assert!(resp.status().is_client_error());
    assert!(!body_bytes(resp).await.is_empty());
}

#[tokio::test]
async fn import_parameters_reports_value_counts() {
    let payload = json!([{"id": 1, "name": "Color", "values": [
        {"id": 1, "value": "Red"}, {"id": 2, "value": "Blue"}
    ]}])
    .to_string();
    let resp = app(TOKEN)
        .oneshot(json_request("/api/v2/rest/parameters", &payload))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["values_imported"], 2);
    assert_eq!(body["values_updated"], 0);
}

#[tokio::test]
async fn import_parameter_errors_echo_numeric_id() {
    let payload = json!([{"id": 5, "values": []}]).to_string();
    let resp = app(TOKEN)
        .oneshot(json_request("/api/v2/rest/parameters", &payload))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["errors"][0]["id"], 5);
    assert_eq!(body["errors"][0]["errors"][0], "The name field is required.");
}

// --- import then list ---

#[tokio::test]
async fn import_then_list() {
    use tower::Service;

    let mut app = app(TOKEN).into_service();

    let payload = json!([product(1), product(2)]).to_string();
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("/api/v2/rest/products", &payload))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["imported"], 2);

    // re-import one: counts as update
    let payload = json!([product(1)]).to_string();
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("/api/v2/rest/products", &payload))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["imported"], 0);
    assert_eq!(body["updated"], 1);

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get_request("/api/v2/rest/products"))
        .await
        .unwrap();
    let body = body_json(resp).await;
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["id"], "PROD-001");
    assert!(data[0]["guid"].is_string());
}
