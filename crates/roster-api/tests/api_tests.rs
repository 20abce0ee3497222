//! Tests for the HTTP edge.
//!
//! The router is driven through `tower::ServiceExt` without a TCP
//! listener. The database is an unreachable lazy pool, so these tests cover
//! everything the edge decides on its own: header parsing, validation,
//! cache hits and error mapping.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, ETAG, IF_MATCH, IF_NONE_MATCH};
use axum::http::{Request, StatusCode};
use roster_api::{AppState, build_router};
use roster_core::ReadCache;
use roster_db::{PostgresConfig, PostgresPool};
use roster_services::{ClientImporter, ClientService, ContactService, PlayerService};
use roster_types::{Audit, Client, ClientId};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

fn make_state() -> Arc<AppState> {
    let pool = PostgresPool::connect_lazy(
        &PostgresConfig::new("postgres://nobody@127.0.0.1:1/none")
            .with_acquire_timeout(Duration::from_millis(200)),
    )
    .unwrap();
    let executor = pool.executor();
    Arc::new(AppState {
        players: PlayerService::new(
            executor.clone(),
            ReadCache::new("players", 1 << 20),
            Duration::from_secs(10),
        ),
        clients: ClientService::new(
            executor.clone(),
            ReadCache::new("clients", 1 << 20),
            Duration::from_secs(300),
        ),
        contacts: ContactService::new(executor.clone()),
        importer: ClientImporter::new(executor.clone(), 2, 8),
        executor,
        request_timeout: Some(Duration::from_secs(5)),
        shutdown: CancellationToken::new(),
    })
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1 << 20).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn cached_client(state: &AppState, id: i64) -> Client {
    let client = Client {
        id: ClientId(id),
        account_no: format!("AC{id:04}"),
        account_name: "XYZ Trading".to_owned(),
        audit: Audit::default(),
    };
    state
        .clients
        .cache()
        .put(client.id, client.clone(), client.cost(), Duration::from_secs(300));
    client
}

#[tokio::test]
async fn health_returns_ok() {
    let app = build_router(make_state());
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn checkin_without_if_match_is_rejected() {
    let app = build_router(make_state());
    let response = app
        .oneshot(Request::put("/api/players/1/checkin").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["status"], 400);
    assert!(body["error"].as_str().unwrap().contains("If-Match"));
}

#[tokio::test]
async fn garbage_if_match_is_rejected() {
    let app = build_router(make_state());
    let response = app
        .oneshot(
            Request::put("/api/players/1/checkin")
                .header(IF_MATCH, "W/\"yesterday\"")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unquoted_if_match_is_rejected() {
    let app = build_router(make_state());
    let response = app
        .oneshot(
            Request::delete("/api/players/1")
                .header(IF_MATCH, "0")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_with_never_modified_tag_is_rejected() {
    let app = build_router(make_state());
    let response = app
        .oneshot(
            Request::put("/api/players/1")
                .header(IF_MATCH, "W/\"0\"")
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"name":"Sam","description":null}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn non_numeric_id_is_rejected() {
    let app = build_router(make_state());
    let response = app
        .oneshot(Request::get("/api/players/abc").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_principal_header_is_rejected() {
    let app = build_router(make_state());
    let response = app
        .oneshot(
            Request::get("/api/clients")
                .header("x-principal-id", "alice")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn import_with_an_invalid_row_writes_nothing() {
    let app = build_router(make_state());
    let rows = r#"[
        {"account_no":"AC0001","account_name":"XYZ Trading"},
        {"account_no":"","account_name":"Blank Account"}
    ]"#;
    let response = app
        .oneshot(
            Request::post("/api/clients/import")
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(rows))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("row 1"));
}

#[tokio::test]
async fn cached_client_carries_its_etag() {
    let state = make_state();
    let client = cached_client(&state, 7);
    let app = build_router(state);

    let response = app
        .oneshot(Request::get("/api/clients/7").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[ETAG], "W/\"0\"");
    let body = body_json(response).await;
    assert_eq!(body["account_no"], client.account_no);
}

#[tokio::test]
async fn matching_if_none_match_returns_not_modified() {
    let state = make_state();
    cached_client(&state, 8);
    let app = build_router(state);

    let response = app
        .oneshot(
            Request::get("/api/clients/8")
                .header(IF_NONE_MATCH, "W/\"0\"")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
    assert_eq!(response.headers()[ETAG], "W/\"0\"");
}

#[tokio::test]
async fn unreachable_store_is_service_unavailable() {
    let app = build_router(make_state());
    let response = app
        .oneshot(Request::get("/api/clients?page=0&limit=5").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn shutdown_cancels_requests() {
    let state = make_state();
    state.shutdown.cancel();
    let app = build_router(state);
    let response = app
        .oneshot(Request::get("/api/clients/count").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn contact_with_a_malformed_email_is_rejected() {
    let app = build_router(make_state());
    let response = app
        .oneshot(
            Request::post("/api/contacts")
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(
                    r#"{"first_name":"Grace","surname":"Hopper","email":"grace at navy"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
