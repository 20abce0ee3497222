//! REST endpoint handlers.
//!
//! Handlers translate HTTP into service calls and back. Reads return the
//! entity's version as an `ETag` and honour `If-None-Match`; conditional
//! writes require `If-Match`.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/health` | Liveness check |
//! | `GET` | `/api/session/principal` | Principal bound to the request's session |
//! | `GET` | `/api/players` | Page of players |
//! | `POST` | `/api/players` | Create a player |
//! | `GET` | `/api/players/{id}` | Single player |
//! | `GET` | `/api/players/resource/{resource_id}` | Player by resource id |
//! | `PUT` | `/api/players/{id}` | Update a player (`If-Match`) |
//! | `DELETE` | `/api/players/{id}` | Delete a player (`If-Match`) |
//! | `PUT` | `/api/players/{id}/checkin` | Check a player in (`If-Match`) |
//! | `GET` | `/api/clients` | Page of clients |
//! | `POST` | `/api/clients` | Create a client |
//! | `GET` | `/api/clients/count` | Number of clients |
//! | `POST` | `/api/clients/import` | Bulk import clients |
//! | `GET` | `/api/clients/{id}` | Single client |
//! | `PUT` | `/api/clients/{id}` | Update a client (`If-Match`) |
//! | `DELETE` | `/api/clients/{id}` | Delete a client (`If-Match`) |
//! | `GET` | `/api/contacts` | Page of contacts |
//! | `POST` | `/api/contacts` | Create a contact |
//! | `GET` | `/api/contacts/{id}` | Single contact |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::header::{ETAG, IF_NONE_MATCH};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use futures::FutureExt as _;
use roster_db::current_principal;
use roster_types::{
    ClientChanges, ClientId, ContactId, NewClient, NewContact, NewPlayer, Paging, PlayerChanges,
    PlayerId, VersionToken,
};
use serde::Serialize;

use crate::error::ApiError;
use crate::etag::{make_etag, none_match};
use crate::extract::{Caller, IfMatch};
use crate::state::AppState;

/// Query parameters for list endpoints.
#[derive(Debug, Default, serde::Deserialize)]
pub struct PageQuery {
    /// Page number, starting at 0.
    pub page: Option<u32>,
    /// Rows per page (default 20, at most 100).
    pub limit: Option<u32>,
}

impl PageQuery {
    fn paging(&self) -> Paging {
        Paging::new(self.page.unwrap_or(0), self.limit.unwrap_or(0))
    }
}

/// Respond with `body` and its version tag, or 304 if the caller already
/// holds that version.
fn versioned<T: Serialize>(
    headers: &HeaderMap,
    status: StatusCode,
    version: VersionToken,
    body: &T,
) -> Response {
    let etag = make_etag(version);
    let cached = headers
        .get(IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| none_match(v, &etag));
    if cached {
        return (StatusCode::NOT_MODIFIED, [(ETAG, etag)]).into_response();
    }
    (status, [(ETAG, etag)], Json(body)).into_response()
}

// ---------------------------------------------------------------------------
// Health and session
// ---------------------------------------------------------------------------

/// Liveness check.
#[allow(clippy::unused_async)]
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Report the principal the store sees for this request's session.
pub async fn session_principal(
    State(state): State<Arc<AppState>>,
    Caller(ctx): Caller,
) -> Result<impl IntoResponse, ApiError> {
    let principal = state
        .executor
        .run(&ctx, |conn| async move { current_principal(conn).await }.boxed())
        .await?;
    Ok(Json(serde_json::json!({ "principal": principal })))
}

// ---------------------------------------------------------------------------
// Players
// ---------------------------------------------------------------------------

/// List one page of players.
pub async fn list_players(
    State(state): State<Arc<AppState>>,
    Caller(ctx): Caller,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let players = state.players.find_all(&ctx, query.paging()).await?;
    Ok(Json(players))
}

/// Fetch a single player.
pub async fn get_player(
    State(state): State<Arc<AppState>>,
    Caller(ctx): Caller,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let player = state.players.find_by_id(&ctx, PlayerId(id)).await?;
    Ok(versioned(&headers, StatusCode::OK, player.version(), &player))
}

/// Fetch a player by its external resource id.
pub async fn get_player_by_resource(
    State(state): State<Arc<AppState>>,
    Caller(ctx): Caller,
    Path(resource_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    if resource_id.trim().is_empty() {
        return Err(ApiError::BadRequest("invalid resource id".to_owned()));
    }
    let player = state.players.find_by_resource_id(&ctx, resource_id).await?;
    Ok(versioned(&headers, StatusCode::OK, player.version(), &player))
}

/// Create a player.
pub async fn create_player(
    State(state): State<Arc<AppState>>,
    Caller(ctx): Caller,
    headers: HeaderMap,
    Json(body): Json<NewPlayer>,
) -> Result<Response, ApiError> {
    let player = state.players.create(&ctx, body).await?;
    Ok(versioned(&headers, StatusCode::CREATED, player.version(), &player))
}

/// Record a check-in.
pub async fn checkin_player(
    State(state): State<Arc<AppState>>,
    Caller(ctx): Caller,
    Path(id): Path<i64>,
    IfMatch(token): IfMatch,
) -> Result<Response, ApiError> {
    let player = state.players.checkin(&ctx, PlayerId(id), token).await?;
    Ok(versioned(&HeaderMap::new(), StatusCode::OK, player.version(), &player))
}

/// Update a player's name and description.
pub async fn update_player(
    State(state): State<Arc<AppState>>,
    Caller(ctx): Caller,
    Path(id): Path<i64>,
    IfMatch(token): IfMatch,
    Json(body): Json<PlayerChanges>,
) -> Result<Response, ApiError> {
    let player = state.players.update(&ctx, PlayerId(id), token, body).await?;
    Ok(versioned(&HeaderMap::new(), StatusCode::OK, player.version(), &player))
}

/// Soft-delete a player.
pub async fn delete_player(
    State(state): State<Arc<AppState>>,
    Caller(ctx): Caller,
    Path(id): Path<i64>,
    IfMatch(token): IfMatch,
) -> Result<StatusCode, ApiError> {
    state.players.delete(&ctx, PlayerId(id), token).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Clients
// ---------------------------------------------------------------------------

/// List one page of clients.
pub async fn list_clients(
    State(state): State<Arc<AppState>>,
    Caller(ctx): Caller,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let clients = state.clients.find_all(&ctx, query.paging()).await?;
    Ok(Json(clients))
}

/// Count live clients.
pub async fn count_clients(
    State(state): State<Arc<AppState>>,
    Caller(ctx): Caller,
) -> Result<impl IntoResponse, ApiError> {
    let count = state.clients.count(&ctx).await?;
    Ok(Json(serde_json::json!({ "count": count })))
}

/// Fetch a single client, served from cache when fresh.
pub async fn get_client(
    State(state): State<Arc<AppState>>,
    Caller(ctx): Caller,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let client = state.clients.find_by_id(&ctx, ClientId(id)).await?;
    Ok(versioned(&headers, StatusCode::OK, client.version(), &client))
}

/// Create a client.
pub async fn create_client(
    State(state): State<Arc<AppState>>,
    Caller(ctx): Caller,
    headers: HeaderMap,
    Json(body): Json<NewClient>,
) -> Result<Response, ApiError> {
    let client = state.clients.create(&ctx, body).await?;
    Ok(versioned(&headers, StatusCode::CREATED, client.version(), &client))
}

/// Rename a client.
pub async fn update_client(
    State(state): State<Arc<AppState>>,
    Caller(ctx): Caller,
    Path(id): Path<i64>,
    IfMatch(token): IfMatch,
    Json(body): Json<ClientChanges>,
) -> Result<Response, ApiError> {
    let client = state.clients.update(&ctx, ClientId(id), token, body).await?;
    Ok(versioned(&HeaderMap::new(), StatusCode::OK, client.version(), &client))
}

/// Soft-delete a client.
pub async fn delete_client(
    State(state): State<Arc<AppState>>,
    Caller(ctx): Caller,
    Path(id): Path<i64>,
    IfMatch(token): IfMatch,
) -> Result<StatusCode, ApiError> {
    state.clients.delete(&ctx, ClientId(id), token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Import a batch of clients.
pub async fn import_clients(
    State(state): State<Arc<AppState>>,
    Caller(ctx): Caller,
    Json(rows): Json<Vec<NewClient>>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state.importer.import(&ctx, rows).await?;
    Ok(Json(serde_json::json!({ "imported": report.imported })))
}

// ---------------------------------------------------------------------------
// Contacts
// ---------------------------------------------------------------------------

/// List one page of contacts.
pub async fn list_contacts(
    State(state): State<Arc<AppState>>,
    Caller(ctx): Caller,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let contacts = state.contacts.find_all(&ctx, query.paging()).await?;
    Ok(Json(contacts))
}

/// Fetch a single contact.
pub async fn get_contact(
    State(state): State<Arc<AppState>>,
    Caller(ctx): Caller,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let contact = state.contacts.find_by_id(&ctx, ContactId(id)).await?;
    Ok(Json(contact))
}

/// Create a contact.
pub async fn create_contact(
    State(state): State<Arc<AppState>>,
    Caller(ctx): Caller,
    Json(body): Json<NewContact>,
) -> Result<impl IntoResponse, ApiError> {
    let contact = state.contacts.create(&ctx, body).await?;
    Ok((StatusCode::CREATED, Json(contact)))
}
