//! Request/response bodies that aren't already domain types (§6 External
//! interfaces). Where a domain type (`TraceResult`, `ChangePlan`,
//! `ChangeReceipt`, `PortFacts`, ...) already has the right shape, handlers
//! return it directly instead of duplicating a DTO around it.

use dal::FKey;
use models::{ChangeFlags, Role, Switch, VlanId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct SessionCheckResponse {
    pub valid: bool,
    pub role: Option<Role>,
    pub remaining_seconds: i64,
}

#[derive(Debug, Deserialize)]
pub struct TraceRequest {
    pub site: String,
    pub floor: String,
    pub mac: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VlanConfigAction {
    Preview,
    Execute,
}

/// Body for `POST /api/vlan_config` (§4.5). `prior_plan_hash` is required
/// for `execute` — it's the `plan_hash` a prior `preview` call returned —
/// and ignored for `preview`.
#[derive(Debug, Deserialize)]
pub struct VlanConfigRequest {
    pub switch_id: FKey<Switch>,
    pub port_spec: String,
    pub vlan_id: VlanId,
    pub action: VlanConfigAction,
    #[serde(default)]
    pub flags: ChangeFlags,
    #[serde(default)]
    pub prior_plan_hash: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub plan: models::ChangePlan,
    pub plan_hash: u64,
}

#[derive(Debug, Deserialize)]
pub struct VlanCheckRequest {
    pub switch_id: FKey<Switch>,
    pub vlan_id: VlanId,
}

#[derive(Debug, Serialize)]
pub struct VlanCheckResponse {
    pub exists: bool,
    pub vlan_name: Option<String>,
    pub status: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct PortStatusRequest {
    pub switch_id: FKey<Switch>,
    pub ports: String,
}

#[derive(Debug, Serialize)]
pub struct PortStatusEntry {
    pub port: String,
    pub facts: models::PortFacts,
}

#[derive(Debug, Deserialize)]
pub struct FloorsQuery {
    pub site_id: FKey<models::Site>,
}

#[derive(Debug, Deserialize)]
pub struct SwitchesQuery {
    pub floor_id: FKey<models::Floor>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct CpuStatusResponse {
    pub state: &'static str,
    pub average_utilization_pct: Option<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vlan_config_request_defaults_flags_and_prior_hash_when_omitted() {
        let body = serde_json::json!({
            "switch_id": "00000000-0000-0000-0000-000000000001",
            "port_spec": "Gi1/0/1-4",
            "vlan_id": 100,
            "action": "preview",
        });
        let req: VlanConfigRequest = serde_json::from_value(body).unwrap();
        assert!(matches!(req.action, VlanConfigAction::Preview));
        assert_eq!(req.flags, ChangeFlags::default());
        assert_eq!(req.prior_plan_hash, None);
    }

    #[test]
    fn vlan_config_request_accepts_an_explicit_execute_action_and_hash() {
        let body = serde_json::json!({
            "switch_id": "00000000-0000-0000-0000-000000000001",
            "port_spec": "Gi1/0/1-4",
            "vlan_id": 100,
            "action": "execute",
            "prior_plan_hash": 42,
        });
        let req: VlanConfigRequest = serde_json::from_value(body).unwrap();
        assert!(matches!(req.action, VlanConfigAction::Execute));
        assert_eq!(req.prior_plan_hash, Some(42));
    }
}
