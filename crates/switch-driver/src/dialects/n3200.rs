use models::{PortFacts, PortRef};

use super::n2000_n3000::{parse_gi_te, parse_mac_table_column, parse_running_config};
use super::Dialect;

/// N3200 family: access ports prefixed `Te`, uplinks `Tw` (§4.1 #2). Shares
/// the N2000/N3000 family's command grammar and parsing — only the prefix
/// assignment differs, so the token/output parsers are reused directly.
pub struct N3200Dialect;

impl Dialect for N3200Dialect {
    fn access_prefix(&self) -> &'static str {
        "Te"
    }

    fn uplink_prefix(&self) -> Option<&'static str> {
        Some("Tw")
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_te_and_tw_tokens() {
        assert_eq!(parse_gi_te("Te1/0/1"), Some(PortRef::new("Te", 1, 0, 1)));
        assert_eq!(parse_gi_te("Tw1/0/48"), Some(PortRef::new("Tw", 1, 0, 48)));
    }
}
