//! `/api/vlan_config`, `/api/vlan/check`, `/api/port/status` (§4.5, §6).

use std::net::SocketAddr;
use std::time::Instant;

use axum::extract::{ConnectInfo, State};
use axum::Json;
use common::prelude::*;
use dal::AsEasyTransaction;
use models::{PortOutcome, PortRef, Role};
use switch_driver::parse_port_spec;
use tokio_util::sync::CancellationToken;

use crate::dto::{
    PortStatusEntry, PortStatusRequest, PreviewResponse, VlanCheckRequest, VlanCheckResponse,
    VlanConfigAction, VlanConfigRequest,
};
use crate::extract::AuthenticatedPrincipal;
use crate::state::SharedState;

pub async fn vlan_config(
    State(state): State<SharedState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<VlanConfigRequest>,
) -> Result<Json<serde_json::Value>, CoreError> {
    auth::require_role(&principal, Role::NetAdmin)?;
    state.host_load.admit_privileged()?;

    let mut client = dal::new_client(&state.db).await.internal()?;
    let mut t = client.easy_transaction().await.internal()?;
    let switch = models::get_switch(&mut t, req.switch_id).await.internal()?;
    let floor = switch.floor.get(&mut t).await.internal()?;
    t.commit().await.internal()?;
    let site = floor.site;

    let cancel = CancellationToken::new();
    let started = Instant::now();

    match req.action {
        VlanConfigAction::Preview => {
            let plan = state
                .vlan_engine
                .preview(&switch, site, &req.port_spec, req.vlan_id, req.flags, &cancel)
                .await?;
            let plan_hash = plan.drift_hash();
            Ok(Json(serde_json::to_value(PreviewResponse { plan, plan_hash }).internal()?))
        }
        VlanConfigAction::Execute => {
            let prior_plan_hash = req.prior_plan_hash.ok_or_else(|| {
                CoreError::Internal("execute requires prior_plan_hash from a preceding preview".into())
            })?;

            let result = state
                .vlan_engine
                .execute(
                    &switch,
                    site,
                    &req.port_spec,
                    req.vlan_id,
                    req.flags,
                    principal.role,
                    prior_plan_hash,
                    &cancel,
                )
                .await;

            let mut receipt = match result {
                Ok(receipt) => receipt,
                Err(e) => {
                    if let Err(audit_err) =
                        audit_vlan_execute(&state, &principal, &req, "failure", 0, started, addr).await
                    {
                        tracing::error!(error = %audit_err, "failed to audit a failed vlan_change execute");
                    }
                    return Err(e);
                }
            };

            let outcome = outcome_label(&receipt.outcomes);
            let audit_id = audit_vlan_execute(
                &state,
                &principal,
                &req,
                outcome,
                receipt.outcomes.len(),
                started,
                addr,
            )
            .await?;

            receipt.audit_id = audit_id;
            Ok(Json(serde_json::to_value(receipt).internal()?))
        }
    }
}

/// Writes the execute audit record on both the success and failure path
/// (I5: "failures are also audited"), mirroring `handlers::auth::login`'s
/// audit-on-both-branches shape.
async fn audit_vlan_execute(
    state: &SharedState,
    principal: &models::Principal,
    req: &VlanConfigRequest,
    outcome: &str,
    command_count: usize,
    started: Instant,
    addr: SocketAddr,
) -> Result<dal::ID, CoreError> {
    let mut audit_client = dal::new_client(&state.db).await.internal()?;
    engine::write_audit_standalone(
        &mut *audit_client,
        engine::AuditInput {
            principal: principal.name.clone(),
            role: principal.role,
            operation: "vlan_change.execute".to_owned(),
            inputs: serde_json::json!({
                "switch_id": req.switch_id,
                "port_spec": req.port_spec,
                "vlan_id": req.vlan_id,
                "flags": req.flags,
                "commands": command_count,
            }),
            outcome: outcome.to_owned(),
            duration_ms: started.elapsed().as_millis() as i64,
            source_addr: addr.to_string(),
        },
    )
    .await
}

pub async fn vlan_check(
    State(state): State<SharedState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Json(req): Json<VlanCheckRequest>,
) -> Result<Json<VlanCheckResponse>, CoreError> {
    auth::require_role(&principal, Role::NetAdmin)?;
    state.host_load.admit_privileged()?;

    let mut client = dal::new_client(&state.db).await.internal()?;
    let mut t = client.easy_transaction().await.internal()?;
    let switch = models::get_switch(&mut t, req.switch_id).await.internal()?;
    let floor = switch.floor.get(&mut t).await.internal()?;
    t.commit().await.internal()?;

    let cancel = CancellationToken::new();
    let (exists, vlan_name) =
        state.vlan_engine.check_vlan(&switch, floor.site, req.vlan_id, &cancel).await?;

    Ok(Json(VlanCheckResponse {
        exists,
        vlan_name,
        status: if exists { "found" } else { "not-found" },
    }))
}

pub async fn port_status(
    State(state): State<SharedState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Json(req): Json<PortStatusRequest>,
) -> Result<Json<Vec<PortStatusEntry>>, CoreError> {
    auth::require_role(&principal, Role::NetAdmin)?;
    state.host_load.admit_privileged()?;

    let refs = parse_port_spec(&req.ports).map_err(|e| CoreError::PortSpecFormat(e.to_string()))?;

    let mut client = dal::new_client(&state.db).await.internal()?;
    let mut t = client.easy_transaction().await.internal()?;
    let switch = models::get_switch(&mut t, req.switch_id).await.internal()?;
    let floor = switch.floor.get(&mut t).await.internal()?;
    t.commit().await.internal()?;

    let cancel = CancellationToken::new();
    let facts = state.vlan_engine.port_status(&switch, floor.site, &refs, &cancel).await?;

    let mut entries: Vec<PortStatusEntry> = facts
        .into_iter()
        .map(|(port, facts)| PortStatusEntry { port: port.to_string(), facts })
        .collect();
    entries.sort_by(|a, b| a.port.cmp(&b.port));

    Ok(Json(entries))
}

/// A single `Failed` outcome taints the whole receipt, since a caller can't
/// tell from `outcome` alone which ports were applied without reading
/// `outcomes` itself.
fn outcome_label(outcomes: &[(PortRef, PortOutcome)]) -> &'static str {
    if outcomes.iter().any(|(_, o)| matches!(o, PortOutcome::Failed(_))) {
        "partial-failure"
    } else {
        "success"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_applied_is_success() {
        let outcomes = vec![
            (PortRef::new("Gi", 1, 0, 1), PortOutcome::Applied),
            (PortRef::new("Gi", 1, 0, 2), PortOutcome::Skipped),
        ];
        assert_eq!(outcome_label(&outcomes), "success");
    }

    #[test]
    fn any_failure_is_partial_failure() {
        let outcomes = vec![
            (PortRef::new("Gi", 1, 0, 1), PortOutcome::Applied),
            (PortRef::new("Gi", 1, 0, 2), PortOutcome::Failed("timeout".to_owned())),
        ];
        assert_eq!(outcome_label(&outcomes), "partial-failure");
    }
}
