//! `POST /trace` (§4.4, §6).

use axum::extract::State;
use axum::Json;
use common::prelude::*;
use dal::AsEasyTransaction;
use models::{MacAddress, TraceResult};
use tokio_util::sync::CancellationToken;

use crate::dto::TraceRequest;
use crate::extract::AuthenticatedPrincipal;
use crate::state::SharedState;

pub async fn trace(
    State(state): State<SharedState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Json(req): Json<TraceRequest>,
) -> Result<Json<TraceResult>, CoreError> {
    let mac = MacAddress::parse(&req.mac)?;
    state.host_load.admit_privileged()?;

    let mut client = dal::new_client(&state.db).await.internal()?;
    let mut t = client.easy_transaction().await.internal()?;
    let site = models::find_site_by_name(&mut t, &req.site)
        .await
        .internal()?
        .ok_or(CoreError::SwitchUnknown)?;
    let floor = models::find_floor_by_name(&mut t, site.id, &req.floor)
        .await
        .internal()?
        .ok_or(CoreError::SwitchUnknown)?;
    let switches = models::enabled_switches_on_floor(&mut t, floor.id).await.internal()?;
    t.commit().await.internal()?;

    let cancel = CancellationToken::new();
    let result = state.trace_engine.trace(site.id, switches, mac, principal.role, &cancel).await;

    Ok(Json(result))
}
