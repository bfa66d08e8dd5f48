use dal::{FKey, ID};
use serde::{Deserialize, Serialize};

use crate::{inventory::Switch, port::PortRef, vlan::VlanId};

/// Flags accompanying a preview/execute request (§4.5).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeFlags {
    #[serde(default)]
    pub include_vlan_name: bool,
    #[serde(default)]
    pub override_uplink_protection: bool,
    #[serde(default)]
    pub skip_non_access_ports: bool,
}

/// Per-port classification assigned during preview (§3 ChangePlan, §4.5 step
/// 3). Order here doubles as precedence when more than one rule could apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Disposition {
    SkipUplink,
    SkipNonAccess,
    AlreadyTarget,
    UnknownPort,
    PortDownPolicy,
    WillChange,
}

impl Disposition {
    /// S1: only `WillChange` may ever produce a `switchport access vlan`
    /// command.
    pub fn permits_write(&self) -> bool {
        matches!(self, Disposition::WillChange)
    }
}

/// Coarse duration band surfaced to the caller alongside a plan (§3
/// ChangePlan "estimated duration band").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DurationBand {
    Seconds,
    TensOfSeconds,
    Minutes,
}

impl DurationBand {
    pub fn for_port_count(n: usize) -> Self {
        match n {
            0..=4 => DurationBand::Seconds,
            5..=24 => DurationBand::TensOfSeconds,
            _ => DurationBand::Minutes,
        }
    }
}

/// Structured safety summary returned with every plan (§4.5 step 5).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SafetySummary {
    pub all_validations_passed: bool,
    pub vlan_exists: bool,
    pub switch_reachable: bool,
    pub uplink_protection_active: bool,
}

/// A fully-resolved, previewable VLAN change (§3 ChangePlan).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePlan {
    pub switch_id: FKey<Switch>,
    pub target_vlan: VlanId,
    pub ports: Vec<(PortRef, Disposition)>,
    pub commands: Vec<String>,
    pub estimated_duration: DurationBand,
    pub safety: SafetySummary,
}

impl ChangePlan {
    /// Stable hash of the inputs that matter for plan-drift comparison
    /// (§4.5 step 1: "(refs, dispositions, vlan)"). Two plans with the same
    /// hash are interchangeable for the purpose of detecting drift between
    /// a caller's observed preview and a fresh one computed at execute time.
    pub fn drift_hash(&self) -> u64 {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.target_vlan.hash(&mut hasher);
        for (port, disposition) in &self.ports {
            port.hash(&mut hasher);
            disposition.hash(&mut hasher);
        }
        hasher.finish()
    }
}

impl std::hash::Hash for Disposition {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
    }
}

/// Outcome of applying a single port's change during execute (§3
/// ChangeReceipt).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "status", content = "reason")]
pub enum PortOutcome {
    Applied,
    Skipped,
    Failed(String),
}

/// The result of executing a plan (§3 ChangeReceipt).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeReceipt {
    pub plan_hash: u64,
    pub outcomes: Vec<(PortRef, PortOutcome)>,
    pub wall_time_ms: u64,
    pub saved_to_startup: bool,
    pub audit_id: ID,
}
