// qravy-cloud/tests/api.rs
// Router-level tests: auth middleware, JSON payloads, error status mapping

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use qravy_cloud::AppState;
use qravy_cloud::api::create_router;
use qravy_cloud::auth::tenant_auth::create_token;
use qravy_cloud::auth::{CallerIdentity, Role};
use qravy_cloud::db::MemoryStore;
use shared::error::ErrorCode;
use shared::models::Location;

const SECRET: &str = "api-test-secret";
const TENANT: &str = "tenant-api";
const L1: i64 = 11;
const L2: i64 = 12;

fn app() -> Router {
    let store = Arc::new(MemoryStore::new());
    for id in [L1, L2] {
        store.insert_location(Location {
            id,
            tenant_id: TENANT.into(),
            name: format!("Branch {id}"),
        });
    }
    create_router(AppState::with_store(store, SECRET.into(), 16))
}

fn bearer(identity: &CallerIdentity) -> String {
    format!("Bearer {}", create_token(identity, SECRET).unwrap())
}

fn owner() -> String {
    bearer(&CallerIdentity::central(TENANT, "owner@example.com", Role::Owner))
}

async fn send(app: &Router, method: &str, uri: &str, auth: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_health_is_public() {
    let app = app();
    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["store"]["backend"], "memory");
    assert_eq!(body["store"]["status"], "ok");
}

#[tokio::test]
async fn test_health_reports_unreachable_store() {
    let store = Arc::new(MemoryStore::new());
    store.set_unavailable(true);
    let app = create_router(AppState::with_store(store.clone(), SECRET.into(), 16));

    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["store"]["status"], "error");
    assert!(body["store"].get("latency_ms").is_none());

    store.set_unavailable(false);
    let (_, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_tenant_routes_require_token() {
    let app = app();
    let (status, body) = send(&app, "GET", "/api/tenant/categories", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], ErrorCode::NotAuthenticated.code());

    let (status, _) = send(&app, "GET", "/api/tenant/categories", Some("Bearer nope"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_and_list_by_scope() {
    let app = app();
    let auth = owner();

    let (status, created) = send(
        &app,
        "POST",
        "/api/tenant/categories",
        Some(&auth),
        Some(json!({ "name": "Drinks", "exclude_location_ids": [L1] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["name"], "Drinks");
    assert_eq!(created["channel_scope"], "all");

    let (_, at_l1) = send(&app, "GET", &format!("/api/tenant/categories?location_id={L1}"), Some(&auth), None).await;
    assert_eq!(at_l1, json!([]));

    let (_, at_l2) = send(
        &app,
        "GET",
        &format!("/api/tenant/categories?location_id={L2}&channel=dine-in"),
        Some(&auth),
        None,
    )
    .await;
    assert_eq!(at_l2.as_array().unwrap().len(), 1);

    let (status, body) = send(&app, "POST", "/api/tenant/categories", Some(&auth), Some(json!({ "name": "drinks" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], ErrorCode::CategoryNameExists.code());
}

#[tokio::test]
async fn test_unknown_collection_is_not_found() {
    let app = app();
    let (status, _) = send(&app, "GET", "/api/tenant/menus", Some(&owner()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bulk_visibility_and_scoped_delete() {
    let app = app();
    let auth = owner();

    let (_, category) = send(&app, "POST", "/api/tenant/categories", Some(&auth), Some(json!({ "name": "Food" }))).await;
    let (status, item) = send(
        &app,
        "POST",
        "/api/tenant/items",
        Some(&auth),
        Some(json!({ "name": "Burger", "category_id": category["id"], "location_id": L1, "channel": "dine-in" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let item_id = item["id"].as_i64().unwrap();

    let (status, result) = send(
        &app,
        "POST",
        "/api/tenant/items/visibility",
        Some(&auth),
        Some(json!({ "ids": [item_id], "visible": false, "location_id": L1 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["matched_count"], 1);
    assert_eq!(result["modified_count"], 1);

    // dine-in only item bound to L1: online and L2 are outside its scope
    let other_location = format!("location_id={L2}");
    for query in ["channel=online", other_location.as_str()] {
        let (status, body) = send(
            &app,
            "DELETE",
            &format!("/api/tenant/items/{item_id}?{query}"),
            Some(&auth),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], ErrorCode::InvalidScope.code());
    }

    let (status, deleted) = send(&app, "DELETE", &format!("/api/tenant/items/{item_id}"), Some(&auth), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted, json!({ "deleted": true, "affected_count": 0 }));

    let (status, _) = send(&app, "DELETE", &format!("/api/tenant/items/{item_id}"), Some(&auth), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_branch_token_is_confined() {
    let app = app();
    let branch = bearer(&CallerIdentity::branch(TENANT, "manager@example.com", Role::Manager, L1));

    let (status, body) = send(&app, "GET", &format!("/api/tenant/categories?location_id={L2}"), Some(&branch), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], ErrorCode::LocationForbidden.code());

    let (status, locations) = send(&app, "GET", "/api/tenant/locations", Some(&branch), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(locations.as_array().unwrap().len(), 1);
    assert_eq!(locations[0]["id"], L1);
}

#[tokio::test]
async fn test_viewer_cannot_write() {
    let app = app();
    let viewer = bearer(&CallerIdentity::central(TENANT, "viewer@example.com", Role::Viewer));
    let (status, _) = send(&app, "POST", "/api/tenant/categories", Some(&viewer), Some(json!({ "name": "Drinks" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, list) = send(&app, "GET", "/api/tenant/categories", Some(&viewer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn test_audit_log_rejects_out_of_range_page() {
    let app = app();
    let owner = owner();

    let uri = format!("/api/tenant/audit-log?page={}", i64::MAX);
    let (status, body) = send(&app, "GET", &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], ErrorCode::ValidationFailed.code());

    let (status, body) = send(&app, "GET", "/api/tenant/audit-log?page=2&per_page=5", Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}
