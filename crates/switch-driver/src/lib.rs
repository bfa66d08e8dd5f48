//! Switch Driver (§4.1): per-model CLI dialect, connection lifecycle, and
//! the three operations the rest of the core calls against a live switch —
//! `find_mac`, `describe_ports`, `apply_access_vlan`.
//!
//! Grounded on the teacher's `ssh2` device-automation call sites
//! (`workflows::resource_management::external_server`,
//! `workflows::inspect_host`); see [`connection`] for how this diverges
//! from them (one held-open shell instead of one channel per command).

pub mod dialects;
mod connection;
mod portspec;

use std::collections::HashMap;
use std::time::{Duration, Instant};

use common::prelude::*;
use models::{Credential, MacAddress, PortFacts, PortMode, PortOutcome, PortRef, SwitchModel, VlanId};

pub use dialects::Dialect;
pub use portspec::{parse_port_spec, PortSpecError};

/// Timeouts governing one driver session (§4.1 Connection lifecycle).
#[derive(Debug, Clone, Copy)]
pub struct ConnectTimeouts {
    pub handshake: Duration,
    pub command: Duration,
    pub session: Duration,
}

impl Default for ConnectTimeouts {
    fn default() -> Self {
        Self {
            handshake: Duration::from_secs(15),
            command: Duration::from_secs(10),
            session: Duration::from_secs(60),
        }
    }
}

/// A contiguous run of `PortRef`s sharing a prefix/unit/slot (§4.5 step 4:
/// "collapse contiguous will-change refs into `interface range` blocks").
#[derive(Debug, Clone)]
pub struct PortGroup {
    pub first: PortRef,
    pub last: PortRef,
    pub ports: Vec<PortRef>,
}

/// Collapses a set of ports into the minimal number of contiguous groups,
/// in port-natural order. Single-port inputs become single-element groups.
pub fn collapse_contiguous(ports: &[PortRef]) -> Vec<PortGroup> {
    let mut sorted = ports.to_vec();
    sorted.sort();

    let mut groups: Vec<PortGroup> = Vec::new();
    for port in sorted {
        if let Some(group) = groups.last_mut() {
            if group.last.is_contiguous_with(&port) {
                group.last = port.clone();
                group.ports.push(port);
                continue;
            }
        }
        groups.push(PortGroup { first: port.clone(), last: port.clone(), ports: vec![port] });
    }
    groups
}

/// Substrings a Dell CLI prints when it refuses a command (§4.1 Error
/// surface: `WriteRejected`). Matched case-insensitively against raw
/// output; intentionally broad since the exact wording varies by family
/// and firmware revision.
const REJECTION_MARKERS: &[&str] = &[
    "% invalid",
    "invalid input",
    "incomplete command",
    "ambiguous command",
    "command authorization failed",
    "% error",
];

fn rejection_reason(output: &str) -> Option<String> {
    let lower = output.to_lowercase();
    REJECTION_MARKERS
        .iter()
        .find(|marker| lower.contains(*marker))
        .map(|marker| format!("switch reported: {marker}"))
}

/// A live session with one switch, bound to a single dialect for its
/// lifetime (§4.1). Connection, write access, and release back to the
/// [`governor`](../governor/index.html) crate's slot are the caller's
/// responsibility — this type only owns the SSH conversation.
pub struct SwitchDriver {
    dialect: Box<dyn Dialect>,
    model: SwitchModel,
    shell: connection::RawShell,
    command_timeout: Duration,
    session_deadline: Instant,
}

impl SwitchDriver {
    /// Opens a session and brings the switch into a known state (paging
    /// off, enable mode if writes are needed). Retries the handshake once
    /// on `Unreachable` with a short backoff (§7 propagation rule (a)).
    pub fn connect(
        address: &str,
        model: SwitchModel,
        credential: &Credential,
        timeouts: ConnectTimeouts,
        for_write: bool,
    ) -> Result<Self, CoreError> {
        let mut shell = match connection::RawShell::connect(address, 22, credential, timeouts.handshake) {
            Ok(shell) => shell,
            Err(CoreError::Unreachable(_)) => {
                std::thread::sleep(Duration::from_millis(250));
                connection::RawShell::connect(address, 22, credential, timeouts.handshake)?
            }
            Err(e) => return Err(e),
        };

        let resolved_model = if model == SwitchModel::Unknown {
            let probed = Self::auto_probe(&mut shell, timeouts.command)?;
            if for_write && probed == SwitchModel::Unknown {
                shell.close();
                return Err(CoreError::Unsupported);
            }
            probed
        } else {
            model
        };

        let dialect = dialects::dialect_for(resolved_model).ok_or(CoreError::Unsupported)?;

        shell.run(dialect.disable_paging_command(), timeouts.command)?;
        if for_write {
            if !dialect.supports_writes() {
                shell.close();
                return Err(CoreError::Unsupported);
            }
            if let Some(enable_cmd) = dialect.enable_mode_command() {
                shell.run(enable_cmd, timeouts.command)?;
            }
        }

        Ok(Self {
            dialect,
            model: resolved_model,
            shell,
            command_timeout: timeouts.command,
            session_deadline: Instant::now() + timeouts.session,
        })
    }

    /// Issues a harmless identification command and classifies the switch
    /// into a known family by keyword, per §4.1's "unknown" bucket. Falls
    /// back to `Unknown` (still usable for reads that tolerate ambiguity,
    /// but rejected for writes by the caller).
    fn auto_probe(shell: &mut connection::RawShell, timeout: Duration) -> Result<SwitchModel, CoreError> {
        let output = shell.run("show version", timeout)?;
        let lower = output.to_lowercase();
        Ok(if lower.contains("os10") {
            SwitchModel::Os10
        } else if lower.contains("n3200") {
            SwitchModel::N3200
        } else if lower.contains("n3000") || lower.contains("n2000") {
            SwitchModel::N2000N3000
        } else {
            SwitchModel::Unknown
        })
    }

    pub fn model(&self) -> SwitchModel {
        self.model
    }

    fn check_session_deadline(&self) -> Result<(), CoreError> {
        if Instant::now() >= self.session_deadline {
            Err(CoreError::Timeout("total session deadline exceeded".into()))
        } else {
            Ok(())
        }
    }

    fn run(&mut self, command: &str) -> Result<String, CoreError> {
        self.check_session_deadline()?;
        self.shell.run(command, self.command_timeout)
    }

    /// `find_mac(mac) -> PortFacts?` (§4.1). Returns the port the MAC was
    /// learned on, or `None` on a clean miss.
    pub fn find_mac(&mut self, mac: MacAddress) -> Result<Option<PortRef>, CoreError> {
        let cmd = self.dialect.mac_table_command(&mac.to_string());
        let output = self.run(&cmd)?;
        Ok(self.dialect.parse_mac_table_output(&output))
    }

    /// `describe_ports(refs) -> map[PortRef]PortFacts` (§4.1). Uplink
    /// detection is completed here: the dialect parser already applies the
    /// description-keyword rule; this layers in the mode- and
    /// prefix-based rules, which need the port's own prefix and the
    /// dialect's family-specific uplink kind (§4.1 Uplink detection).
    pub fn describe_ports(&mut self, refs: &[PortRef]) -> Result<HashMap<PortRef, PortFacts>, CoreError> {
        let mut out = HashMap::new();
        for port in refs {
            let cmd = self.dialect.show_port_command(port);
            let output = self.run(&cmd)?;
            let mut facts = self.dialect.parse_port_facts(&output);
            self.apply_uplink_rules(port, &mut facts);
            out.insert(port.clone(), facts);
        }
        Ok(out)
    }

    fn apply_uplink_rules(&self, port: &PortRef, facts: &mut PortFacts) {
        if matches!(facts.mode, PortMode::Trunk | PortMode::General) {
            facts.is_uplink = true;
        }
        if let Some(uplink_prefix) = self.dialect.uplink_prefix() {
            if port.prefix.eq_ignore_ascii_case(uplink_prefix) {
                facts.is_uplink = true;
            }
        }
        if port.prefix.eq_ignore_ascii_case("Po") {
            facts.is_uplink = true;
        }
    }

    /// A VLAN-existence probe used by the preview step (§4.5 step 2), plus
    /// the VLAN's configured name if the switch reports one (`/api/vlan/check`,
    /// §6) — the same command backs both, so they share one parse.
    pub fn vlan_info(&mut self, vlan: VlanId) -> Result<(bool, Option<String>), CoreError> {
        let cmd = format!("show vlan id {}", vlan.get());
        let output = self.run(&cmd)?;
        let lower = output.to_lowercase();
        if lower.contains("not found") || lower.contains("invalid vlan") || output.trim().is_empty() {
            return Ok((false, None));
        }

        let name = output
            .lines()
            .map(str::trim)
            .find(|line| line.chars().next().is_some_and(|c| c.is_ascii_digit()))
            .and_then(|line| line.split_whitespace().nth(1))
            .map(str::to_owned);

        Ok((true, name))
    }

    pub fn vlan_exists(&mut self, vlan: VlanId) -> Result<bool, CoreError> {
        Ok(self.vlan_info(vlan)?.0)
    }

    /// `apply_access_vlan(refs, vlan) -> per-port outcome` (§4.1), driven
    /// block-by-block. A block's failure marks its ports `Failed` but does
    /// not stop subsequent blocks (§4.5 execute step 2). Enters global
    /// config mode once before the first block and leaves it once after the
    /// last, per S3's command budget (`2 + (#blocks)*2 + 1`).
    ///
    /// `consume_token` is called once immediately before every command this
    /// sends to the switch — the commands-per-second admission (§4.2) is
    /// spent per real write, not once for the whole session.
    pub fn apply_access_vlan(
        &mut self,
        groups: &[PortGroup],
        vlan: VlanId,
        mut consume_token: impl FnMut() -> Result<(), CoreError>,
    ) -> Result<Vec<(PortRef, PortOutcome)>, CoreError> {
        if !self.dialect.supports_writes() {
            return Err(CoreError::Unsupported);
        }

        consume_token()?;
        self.run(self.dialect.config_mode_enter_command())?;

        let mut outcomes = Vec::new();
        for group in groups {
            let clause = self.dialect.interface_clause(&group.first, &group.last);
            let commands = self.dialect.access_vlan_commands(&clause, vlan);

            let mut failure: Option<String> = None;
            for cmd in &commands {
                consume_token()?;
                match self.run(cmd) {
                    Ok(output) => {
                        if let Some(reason) = rejection_reason(&output) {
                            failure = Some(reason);
                            break;
                        }
                    }
                    Err(CoreError::Timeout(msg)) => {
                        failure = Some(format!("timeout: {msg}"));
                        break;
                    }
                    Err(e) => return Err(e),
                }
            }

            for port in &group.ports {
                let outcome = match &failure {
                    Some(reason) => PortOutcome::Failed(reason.clone()),
                    None => PortOutcome::Applied,
                };
                outcomes.push((port.clone(), outcome));
            }
        }

        consume_token()?;
        self.run(self.dialect.config_mode_exit_command())?;

        Ok(outcomes)
    }

    /// Renders the command blocks a given set of contiguous-collapsed
    /// groups would produce for an access-VLAN assignment, without running
    /// them — the same templates `apply_access_vlan` executes, used by the
    /// VLAN Change Engine's preview step so the commands shown to a caller
    /// are exactly what execute will later send (§4.5 step 4).
    pub fn plan_commands(&self, groups: &[PortGroup], vlan: VlanId) -> Vec<String> {
        let mut commands = vec![self.dialect.config_mode_enter_command().to_owned()];
        commands.extend(groups.iter().flat_map(|g| {
            let clause = self.dialect.interface_clause(&g.first, &g.last);
            self.dialect.access_vlan_commands(&clause, vlan)
        }));
        commands.push(self.dialect.config_mode_exit_command().to_owned());
        commands
    }

    /// Persists the running config with the family's save command (§4.5
    /// execute step 3). A failed save does not fail the receipt as a
    /// whole — the caller surfaces it as a warning. Spends one
    /// commands-per-second token, same as any other write (§4.2).
    pub fn save(&mut self, mut consume_token: impl FnMut() -> Result<(), CoreError>) -> Result<bool, CoreError> {
        if !self.dialect.supports_writes() {
            return Ok(false);
        }
        consume_token()?;
        let output = self.run(self.dialect.save_command())?;
        Ok(rejection_reason(&output).is_none())
    }

    pub fn close(self) {
        self.shell.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::PortRef;

    #[test]
    fn collapses_contiguous_ranges() {
        let ports = vec![
            PortRef::new("Gi", 1, 0, 1),
            PortRef::new("Gi", 1, 0, 2),
            PortRef::new("Gi", 1, 0, 3),
            PortRef::new("Gi", 1, 0, 10),
        ];
        let groups = collapse_contiguous(&ports);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].first, PortRef::new("Gi", 1, 0, 1));
        assert_eq!(groups[0].last, PortRef::new("Gi", 1, 0, 3));
        assert_eq!(groups[1].first, PortRef::new("Gi", 1, 0, 10));
    }

    #[test]
    fn detects_rejection_markers() {
        assert!(rejection_reason("% Invalid input detected").is_some());
        assert!(rejection_reason("Gi1/0/24 is up").is_none());
    }
}
