use models::{unknown_port_facts, PortFacts, PortRef};

use super::mode_from_keyword;
use super::Dialect;

/// N2000/N3000 family: access ports prefixed `Gi`, uplinks `Te` (§4.1 #1).
pub struct N2000N3000Dialect;

impl Dialect for N2000N3000Dialect {
    fn access_prefix(&self) -> &'static str {
        "Gi"
    }

    fn uplink_prefix(&self) -> Option<&'static str> {
        Some("Te")
    }

    fn supports_writes(&self) -> bool {
        true
    }

    fn disable_paging_command(&self) -> &'static str {
        "terminal length 0"
    }

    fn enable_mode_command(&self) -> Option<&'static str> {
        Some("enable")
    }

    fn mac_table_command(&self, mac: &str) -> String {
        format!("show mac address-table address {mac}")
    }

    fn show_port_command(&self, port: &PortRef) -> String {
        format!("show running-config interface {port}")
    }

    fn save_command(&self) -> &'static str {
        "write memory"
    }

    fn parse_port_token(&self, token: &str) -> Option<PortRef> {
        parse_gi_te(token)
    }

    fn parse_mac_table_output(&self, output: &str) -> Option<PortRef> {
        parse_mac_table_column(output)
    }

    fn parse_port_facts(&self, output: &str) -> PortFacts {
        parse_running_config(output)
    }
}

/// Parses `Gi1/0/24`, `Te1/0/1` (case-insensitive prefix) into a `PortRef`.
pub(crate) fn parse_gi_te(token: &str) -> Option<PortRef> {
    let token = token.trim();
    let prefix_len = token.find(|c: char| c.is_ascii_digit())?;
    let (prefix, rest) = token.split_at(prefix_len);
    let mut parts = rest.splitn(3, '/');
    let unit = parts.next()?.parse().ok()?;
    let slot = parts.next()?.parse().ok()?;
    let port = parts.next()?.parse().ok()?;
    Some(PortRef::new(prefix, unit, slot, port))
}

/// `show mac address-table address <mac>` row layout:
/// `Vlan    Mac Address       Type        Ports`
/// `1       aabb.ccdd.eeff    DYNAMIC     Gi1/0/24`
pub(crate) fn parse_mac_table_column(output: &str) -> Option<PortRef> {
    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("Vlan") || line.starts_with('-') {
            continue;
        }
        if let Some(last) = line.split_whitespace().last() {
            if let Some(port) = parse_gi_te(last) {
                return Some(port);
            }
        }
    }
    None
}

/// Extracts mode/access-vlan/description from `show running-config
/// interface` output. Unrecognized lines are ignored rather than rejected —
/// per §4.1, ambiguous output degrades to "unknown" rather than aborting.
/// The prefix/mode-based uplink rules are layered on afterward by
/// `SwitchDriver::describe_ports`, which knows the port's own prefix.
pub(crate) fn parse_running_config(output: &str) -> PortFacts {
    let mut facts = unknown_port_facts();
    let mut saw_switchport = false;

    for raw in output.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('!') || line.starts_with("interface") {
            continue;
        }
        if let Some(mode) = line.strip_prefix("switchport mode ") {
            facts.mode = mode_from_keyword(mode);
            saw_switchport = true;
        } else if let Some(vlan) = line.strip_prefix("switchport access vlan ") {
            if let Ok(v) = vlan.trim().parse::<u16>() {
                facts.access_vlan = v.try_into().ok();
            }
        } else if let Some(desc) = line.strip_prefix("description ") {
            facts.description = Some(desc.trim().to_owned());
        } else if line == "shutdown" {
            facts.admin_up = false;
        }
    }

    if saw_switchport {
        facts.admin_up = true;
        facts.link_up = true;
    }

    if let Some(desc) = &facts.description {
        if PortFacts::description_suggests_uplink(desc) {
            facts.is_uplink = true;
        }
    }

    // The caller (SwitchDriver) additionally ORs in the prefix-based and
    // mode-based uplink rules once it knows the port's own prefix.
    facts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_gi_and_te_tokens() {
        assert_eq!(parse_gi_te("Gi1/0/24"), Some(PortRef::new("Gi", 1, 0, 24)));
        assert_eq!(parse_gi_te("Te1/0/48"), Some(PortRef::new("Te", 1, 0, 48)));
        assert_eq!(parse_gi_te("bogus"), None);
    }

    #[test]
    fn parses_mac_table_row() {
        let output = "Vlan    Mac Address       Type        Ports\n\
                       ----    -----------       ----        -----\n\
                       1       aabb.ccdd.eeff    DYNAMIC     Gi1/0/24\n";
        assert_eq!(
            parse_mac_table_column(output),
            Some(PortRef::new("Gi", 1, 0, 24))
        );
    }

    #[test]
    fn ambiguous_running_config_defaults_down_and_unknown() {
        let facts = parse_running_config("banner motd garbage\n");
        assert!(!facts.link_up);
        assert_eq!(facts.mode, models::PortMode::Unknown);
    }

    #[test]
    fn per_block_command_count_leaves_room_for_the_config_wrapper() {
        // S3: per-switch command count <= 2 + (#blocks)*2 + 1. The wrapper
        // (enter/exit config mode, save) is applied once by the driver
        // around however many blocks `access_vlan_commands` produces here.
        let dialect = N2000N3000Dialect;
        let vlan = models::VlanId::try_from(100).unwrap();
        let commands = dialect.access_vlan_commands("Gi1/0/1", vlan);
        assert_eq!(commands.len(), 2);
        assert_eq!(dialect.config_mode_enter_command(), "configure terminal");
        assert_eq!(dialect.config_mode_exit_command(), "end");
    }

    #[test]
    fn parses_access_port_running_config() {
        let output = "interface Gi1/0/24\n\
                       switchport mode access\n\
                       switchport access vlan 100\n\
                       description workstation\n";
        let facts = parse_running_config(output);
        assert_eq!(facts.mode, models::PortMode::Access);
        assert_eq!(facts.access_vlan.unwrap().get(), 100);
        assert!(facts.link_up);
    }
}
