//! Request Router (§4.8): a stateless axum dispatcher over the HTTP API in
//! §6. Method/path matching, JSON in/out, and cookie parsing happen here;
//! the gates (auth → role → host-load) run inline in each handler and the
//! engines do the rest. This crate never holds engine logic itself.

pub mod dto;
pub mod extract;
pub mod handlers;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

pub use state::{AppState, SharedState};

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/login", post(handlers::auth::login))
        .route("/logout", post(handlers::auth::logout))
        .route("/session/keepalive", post(handlers::auth::keepalive))
        .route("/session/check", post(handlers::auth::session_check))
        .route("/trace", post(handlers::trace::trace))
        .route("/api/vlan_config", post(handlers::vlan::vlan_config))
        .route("/api/vlan/check", post(handlers::vlan::vlan_check))
        .route("/api/port/status", post(handlers::vlan::port_status))
        .route("/api/sites", get(handlers::inventory::sites))
        .route("/api/floors", get(handlers::inventory::floors))
        .route("/api/switches", get(handlers::inventory::switches))
        .route("/cpu-status", get(handlers::health::cpu_status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
