use std::fmt;

use common::prelude::*;
use serde::{Deserialize, Serialize};

use crate::vlan::VlanId;

/// A single interface on a switch, identified by the family-specific prefix
/// ("Gi", "Te", "Tw", "Po", "ethernet") plus a unit/slot/port triple (§3
/// PortRef).
///
/// `Ord` follows natural (unit, slot, port) order, independent of prefix,
/// which is what the MAC Trace Engine's "stable by port natural order"
/// requirement (§4.4 step 6) means.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortRef {
    pub prefix: String,
    pub unit: u32,
    pub slot: u32,
    pub port: u32,
}

impl PartialOrd for PortRef {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PortRef {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.unit, self.slot, self.port).cmp(&(other.unit, other.slot, other.port))
    }
}

impl PortRef {
    pub fn new(prefix: impl Into<String>, unit: u32, slot: u32, port: u32) -> Self {
        Self { prefix: prefix.into(), unit, slot, port }
    }

    /// True if `self` and `other` are adjacent (same prefix/unit/slot, port
    /// differs by exactly one) — used to collapse `will-change` refs into
    /// `interface range` command blocks (§4.5 step 4).
    pub fn is_contiguous_with(&self, other: &Self) -> bool {
        self.prefix == other.prefix
            && self.unit == other.unit
            && self.slot == other.slot
            && self.port + 1 == other.port
    }
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.prefix.eq_ignore_ascii_case("ethernet") {
            write!(f, "ethernet {}/{}/{}", self.unit, self.slot, self.port)
        } else {
            write!(f, "{}{}/{}/{}", self.prefix, self.unit, self.slot, self.port)
        }
    }
}

/// Operational mode of a port as reported by running-config (§3 PortFacts).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PortMode {
    Access,
    Trunk,
    General,
    /// Ambiguous running-config output; flows through as a "skip" disposition
    /// rather than aborting the operation (§4.1 Parsing contract).
    Unknown,
}

/// Everything known about a port at the moment it was queried (§3 PortFacts).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortFacts {
    pub admin_up: bool,
    /// Defaults to `false` (down) whenever link state could not be
    /// determined from defensive parsing (§4.1).
    pub link_up: bool,
    pub mode: PortMode,
    pub access_vlan: Option<VlanId>,
    pub allowed_vlans: Vec<VlanId>,
    pub description: Option<String>,
    pub is_uplink: bool,
}

impl PortFacts {
    /// Keywords recognized in a port description as marking it uplink/core
    /// infrastructure (§4.1 Uplink detection), matched case-insensitively.
    pub const UPLINK_KEYWORDS: &'static [&'static str] = &[
        "uplink",
        "trunk",
        "backbone",
        "core",
        "distribution",
        "aggregation",
        "stack",
    ];

    pub fn description_suggests_uplink(description: &str) -> bool {
        let lower = description.to_lowercase();
        Self::UPLINK_KEYWORDS.iter().any(|kw| lower.contains(kw))
    }
}

/// A port whose running-config output could not be parsed with confidence.
/// Defaults land here rather than erroring the whole operation (§4.1).
pub fn unknown_port_facts() -> PortFacts {
    PortFacts {
        admin_up: false,
        link_up: false,
        mode: PortMode::Unknown,
        access_vlan: None,
        allowed_vlans: vec![],
        description: None,
        is_uplink: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_family_grammar() {
        assert_eq!(PortRef::new("Gi", 1, 0, 24).to_string(), "Gi1/0/24");
        assert_eq!(PortRef::new("ethernet", 1, 1, 1).to_string(), "ethernet 1/1/1");
    }

    #[test]
    fn contiguity_requires_same_prefix_unit_slot() {
        let a = PortRef::new("Gi", 1, 0, 1);
        let b = PortRef::new("Gi", 1, 0, 2);
        let c = PortRef::new("Te", 1, 0, 2);
        assert!(a.is_contiguous_with(&b));
        assert!(!a.is_contiguous_with(&c));
    }

    #[test]
    fn uplink_keyword_match_is_case_insensitive() {
        assert!(PortFacts::description_suggests_uplink("Core Uplink to dist switch"));
        assert!(!PortFacts::description_suggests_uplink("workstation"));
    }
}
