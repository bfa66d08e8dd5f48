//! CLI dialects (§4.1 Model families). Each family implements the same set
//! of command-generation and parsing rules; `SwitchDriver` dispatches on the
//! switch's model tag to pick one.

mod n2000_n3000;
mod n3200;
mod os10;

use models::{PortFacts, PortMode, PortRef, SwitchModel, VlanId};

pub use n2000_n3000::N2000N3000Dialect;
pub use n3200::N3200Dialect;
pub use os10::Os10Dialect;

/// Everything the driver needs to know to speak to one switch family.
pub trait Dialect: Send + Sync {
    fn access_prefix(&self) -> &'static str;
    fn uplink_prefix(&self) -> Option<&'static str>;
    fn supports_writes(&self) -> bool;

    fn disable_paging_command(&self) -> &'static str;
    fn enable_mode_command(&self) -> Option<&'static str>;
    fn mac_table_command(&self, mac: &str) -> String;
    fn show_port_command(&self, port: &PortRef) -> String;
    fn save_command(&self) -> &'static str;

    /// Enters global configuration mode (§4.5 execute step 2: "enter config
    /// mode" before the command blocks). Shared across all three families.
    fn config_mode_enter_command(&self) -> &'static str {
        "configure terminal"
    }

    /// Leaves configuration mode back to privileged exec, once all blocks
    /// have run and before the save command (§4.5 S3 budget: the global
    /// enter/exit pair).
    fn config_mode_exit_command(&self) -> &'static str {
        "end"
    }

    /// Parse one interface token from this family's grammar (e.g. `Gi1/0/24`
    /// or `ethernet 1/1/1`) into a `PortRef`.
    fn parse_port_token(&self, token: &str) -> Option<PortRef>;

    /// Parses the MAC address table output for a single hit, returning the
    /// port it was learned on. Defensive per §4.1 Parsing contract.
    fn parse_mac_table_output(&self, output: &str) -> Option<PortRef>;

    /// Parses `show running-config interface <ref>` output into PortFacts.
    /// Falls back to `models::unknown_port_facts()` on ambiguous input.
    fn parse_port_facts(&self, output: &str) -> PortFacts;

    /// Command block(s) to move the given (contiguous-collapsed) port group
    /// onto an access VLAN. A "group" here is either one port or a
    /// previously-computed `interface range` block. Two commands per block
    /// (enter the interface context, set the VLAN) — per §4.5 S3's command
    /// budget, the caller moves straight to the next block's `interface`
    /// line without an intervening `exit`.
    fn access_vlan_commands(&self, interface_clause: &str, vlan: VlanId) -> Vec<String> {
        vec![
            format!("interface {interface_clause}"),
            format!("switchport access vlan {}", vlan.get()),
        ]
    }

    /// The clause used to address either a single port or a contiguous
    /// range, e.g. `Gi1/0/1` vs `range Gi1/0/1-24`.
    fn interface_clause(&self, first: &PortRef, last: &PortRef) -> String {
        if first == last {
            first.to_string()
        } else if first.prefix.eq_ignore_ascii_case("ethernet") {
            format!("range ethernet {}/{}/{}-{}", first.unit, first.slot, first.port, last.port)
        } else {
            format!("range {}{}/{}/{}-{}", first.prefix, first.unit, first.slot, first.port, last.port)
        }
    }
}

pub fn dialect_for(model: SwitchModel) -> Option<Box<dyn Dialect>> {
    match model {
        SwitchModel::N2000N3000 => Some(Box::new(N2000N3000Dialect)),
        SwitchModel::N3200 => Some(Box::new(N3200Dialect)),
        SwitchModel::Os10 => Some(Box::new(Os10Dialect)),
        SwitchModel::Unknown => None,
    }
}

/// Shared helper: classify a running-config `switchport mode` line.
pub(crate) fn mode_from_keyword(s: &str) -> PortMode {
    match s.trim().to_lowercase().as_str() {
        "access" => PortMode::Access,
        "trunk" => PortMode::Trunk,
        "general" => PortMode::General,
        _ => PortMode::Unknown,
    }
}
