//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use sqlx::PgPool;
use stockline_cache::TtlProductCache;
use stockline_inventory::application::{InventoryContext, InventorySettings};
use stockline_store::PgProductStore;
use stockline_test_support::InMemoryEventChannel;
use tower::ServiceExt;

use stockline_api::routes;
use stockline_api::state::AppState;

/// The app under test plus the channel it publishes to.
pub struct TestApp {
    pub router: Router,
    pub channel: Arc<InMemoryEventChannel>,
}

/// Build the full app router over a real `PgProductStore`, an in-process
/// cache and a recording event channel. Uses the same route structure as
/// `main.rs`.
pub fn build_test_app(pool: PgPool) -> TestApp {
    let channel = Arc::new(InMemoryEventChannel::new());
    let inventory = InventoryContext::new(
        Arc::new(PgProductStore::new(pool)),
        Arc::new(TtlProductCache::new()),
        channel.clone(),
        InventorySettings::default(),
    );

    let router = Router::new()
        .merge(routes::health::router())
        .nest("/api/v1/products", routes::products::router())
        .with_state(AppState::new(inventory));

    TestApp { router, channel }
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}
