//! `GET /health` (public) and `GET /cpu-status` (§6).

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use common::prelude::*;
use governor::LoadState;
use models::Role;

use crate::dto::{CpuStatusResponse, HealthResponse};
use crate::extract::AuthenticatedPrincipal;
use crate::state::SharedState;

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now(),
    })
}

pub async fn cpu_status(
    State(state): State<SharedState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> Result<Json<CpuStatusResponse>, CoreError> {
    auth::require_role(&principal, Role::NetAdmin)?;

    let state_label = match state.host_load.status() {
        LoadState::Green => "green",
        LoadState::Yellow => "yellow",
        LoadState::Red => "red",
    };

    Ok(Json(CpuStatusResponse {
        state: state_label,
        average_utilization_pct: state.host_load.average_sample(),
    }))
}
