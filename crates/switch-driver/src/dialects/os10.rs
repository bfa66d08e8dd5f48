use models::{unknown_port_facts, PortFacts, PortRef};

use super::mode_from_keyword;
use super::Dialect;

/// OS10-style family: interfaces are `ethernet U/S/P`; ranges are expressed
/// with `interface range ethernet U/S/P-U/S/P` rather than the N-series
/// `range <prefix>U/S/P-P` shorthand (§4.1 #3).
pub struct Os10Dialect;

impl Dialect for Os10Dialect {
    fn access_prefix(&self) -> &'static str {
        "ethernet"
    }

    fn uplink_prefix(&self) -> Option<&'static str> {
        // OS10 has no distinct uplink-kind prefix; uplinks here are
        // recognized by mode/description only (§4.1 Uplink detection), plus
        // the generic `Po` rule applied by the driver for all families.
        None
    }

    fn supports_writes(&self) -> bool {
        true
    }

    fn disable_paging_command(&self) -> &'static str {
        "terminal length 0"
    }

    fn enable_mode_command(&self) -> Option<&'static str> {
        // OS10 drops straight into a privileged shell over SSH; there is no
        // separate "enable" step.
        None
    }

    fn mac_table_command(&self, mac: &str) -> String {
        format!("show mac address-table address {mac}")
    }

    fn show_port_command(&self, port: &PortRef) -> String {
        format!("show running-configuration interface {port}")
    }

    fn save_command(&self) -> &'static str {
        "copy running-configuration startup-configuration"
    }

    fn parse_port_token(&self, token: &str) -> Option<PortRef> {
        parse_ethernet(token)
    }

    fn parse_mac_table_output(&self, output: &str) -> Option<PortRef> {
        parse_mac_table_column(output)
    }

    fn parse_port_facts(&self, output: &str) -> PortFacts {
        parse_running_config(output)
    }

    fn interface_clause(&self, first: &PortRef, last: &PortRef) -> String {
        if first == last {
            first.to_string()
        } else {
            format!(
                "range ethernet {}/{}/{}-{}/{}/{}",
                first.unit, first.slot, first.port, last.unit, last.slot, last.port
            )
        }
    }
}

/// Parses `ethernet 1/1/1` (whitespace between prefix and U/S/P, per the
/// §6 port-spec grammar's `"ethernet "` prefix literal).
pub(crate) fn parse_ethernet(token: &str) -> Option<PortRef> {
    let token = token.trim();
    let rest = token
        .strip_prefix("ethernet")
        .or_else(|| token.strip_prefix("Ethernet"))?
        .trim_start();
    let mut parts = rest.splitn(3, '/');
    let unit = parts.next()?.parse().ok()?;
    let slot = parts.next()?.parse().ok()?;
    let port = parts.next()?.parse().ok()?;
    Some(PortRef::new("ethernet", unit, slot, port))
}

/// OS10's `show mac address-table` row layout:
/// `VlanId  MacAddress        Type      Interface`
/// `100     aa:bb:cc:dd:ee:ff dynamic   ethernet1/1/1`
pub(crate) fn parse_mac_table_column(output: &str) -> Option<PortRef> {
    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("Vlan") || line.starts_with('-') {
            continue;
        }
        if let Some(last) = line.split_whitespace().last() {
            if let Some(port) = parse_ethernet(last) {
                return Some(port);
            }
            // OS10 sometimes prints the interface without the space
            // ("ethernet1/1/1"); widen the match before giving up.
            if let Some(port) = parse_ethernet(&last.replace("ethernet", "ethernet ")) {
                return Some(port);
            }
        }
    }
    None
}

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
        } else if line == "no shutdown" {
            facts.admin_up = true;
            facts.link_up = true;
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

    facts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ethernet_token_with_space() {
        assert_eq!(parse_ethernet("ethernet 1/1/1"), Some(PortRef::new("ethernet", 1, 1, 1)));
    }

    #[test]
    fn range_clause_spans_full_triples() {
        let dialect = Os10Dialect;
        let first = PortRef::new("ethernet", 1, 1, 1);
        let last = PortRef::new("ethernet", 1, 1, 4);
        assert_eq!(
            dialect.interface_clause(&first, &last),
            "range ethernet 1/1/1-1/1/4"
        );
    }
}
