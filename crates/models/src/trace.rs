use dal::FKey;
use serde::{Deserialize, Serialize};

use crate::{inventory::Switch, port::PortFacts, port::PortRef};

/// One switch's result for a MAC trace query (§3 TraceHit).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceHit {
    pub switch_id: FKey<Switch>,
    pub switch_name: String,
    pub port: PortRef,
    pub facts: PortFacts,
    pub is_uplink: bool,
}

/// Per-switch failure reported alongside hits rather than aborting the whole
/// trace (§4.4 Failure semantics).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TraceFailureKind {
    Unreachable,
    AuthFailed,
    Timeout,
    ParseFailed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceFailure {
    pub switch_id: FKey<Switch>,
    pub switch_name: String,
    pub kind: TraceFailureKind,
}

/// The aggregate outcome of a trace (§4.4): hits and per-switch failures,
/// with an explicit flag for the all-failed case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceResult {
    pub hits: Vec<TraceHit>,
    pub failures: Vec<TraceFailure>,
    pub no_results_due_to_failures: bool,
}
