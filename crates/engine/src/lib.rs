//! The two switch-facing engines (§4.4 MAC Trace, §4.5 VLAN Change) plus the
//! audit sink they're both written alongside of (§4.9).

pub mod audit;
pub mod probe_cache;
pub mod trace;
pub mod vlan_change;

pub use audit::{write_audit, write_audit_standalone, AuditInput};
pub use probe_cache::ProbeCache;
pub use trace::MacTraceEngine;
pub use vlan_change::VlanChangeEngine;
