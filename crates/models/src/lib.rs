//! Plain data types from the data model (§3), plus the few of them that are
//! also persisted rows (Site, Floor, Switch, AuditRecord implement `dal`'s
//! `DBTable` directly, following the teacher's `models` crate).

pub mod audit;
pub mod change;
pub mod credential;
pub mod inventory;
pub mod mac;
pub mod port;
pub mod principal;
pub mod role;
pub mod trace;
pub mod vlan;

pub use audit::AuditRecord;
pub use change::{ChangeFlags, ChangePlan, ChangeReceipt, Disposition, DurationBand, PortOutcome, SafetySummary};
pub use credential::Credential;
pub use inventory::{
    all_sites, all_switches_on_floor, enabled_switches_on_floor, find_floor_by_name,
    find_site_by_name, floors_for_site, get_switch, Floor, Site, Switch, SwitchModel,
};
pub use mac::MacAddress;
pub use port::{unknown_port_facts, PortFacts, PortMode, PortRef};
pub use principal::Principal;
pub use role::Role;
pub use trace::{TraceFailure, TraceFailureKind, TraceHit, TraceResult};
pub use vlan::VlanId;
