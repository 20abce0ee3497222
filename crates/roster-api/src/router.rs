//! Axum router construction.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the complete router. See [`handlers`] for the endpoint table.
///
/// CORS allows any origin; the service sits behind a gateway that
/// enforces its own policy.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([axum::http::header::ETAG]);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/session/principal", get(handlers::session_principal))
        // Players
        .route(
            "/api/players",
            get(handlers::list_players).post(handlers::create_player),
        )
        .route(
            "/api/players/{id}",
            get(handlers::get_player)
                .put(handlers::update_player)
                .delete(handlers::delete_player),
        )
        .route(
            "/api/players/resource/{resource_id}",
            get(handlers::get_player_by_resource),
        )
        .route("/api/players/{id}/checkin", put(handlers::checkin_player))
        // Clients
        .route(
            "/api/clients",
            get(handlers::list_clients).post(handlers::create_client),
        )
        .route("/api/clients/count", get(handlers::count_clients))
        .route("/api/clients/import", post(handlers::import_clients))
        .route(
            "/api/clients/{id}",
            get(handlers::get_client)
                .put(handlers::update_client)
                .delete(handlers::delete_client),
        )
        // Contacts
        .route(
            "/api/contacts",
            get(handlers::list_contacts).post(handlers::create_contact),
        )
        .route("/api/contacts/{id}", get(handlers::get_contact))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
