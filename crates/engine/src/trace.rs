//! MAC Trace Engine (§4.4): fans a MAC lookup out across a floor's enabled
//! switches concurrently, under one shared admission deadline, then
//! aggregates and role-filters the result.

use std::sync::Arc;
use std::time::Duration;

use common::prelude::*;
use dal::{ExistingRow, FKey};
use governor::ConcurrencyGovernor;
use models::{
    Credential, MacAddress, PortFacts, PortMode, PortRef, Role, Site, Switch, TraceFailure,
    TraceFailureKind, TraceHit, TraceResult,
};
use switch_driver::{ConnectTimeouts, SwitchDriver};
use tokio_util::sync::CancellationToken;

use crate::ProbeCache;

pub struct MacTraceEngine {
    governor: Arc<ConcurrencyGovernor>,
    credential: Credential,
    connect_timeouts: ConnectTimeouts,
    /// The whole fan-out shares this one deadline (§4.4 step 3, default
    /// 60s) — distinct from the governor's own per-acquisition default.
    fanout_deadline: Duration,
    probe_cache: Arc<ProbeCache>,
}

impl MacTraceEngine {
    pub fn new(
        governor: Arc<ConcurrencyGovernor>,
        credential: Credential,
        connect_timeouts: ConnectTimeouts,
        fanout_deadline: Duration,
        probe_cache: Arc<ProbeCache>,
    ) -> Self {
        Self { governor, credential, connect_timeouts, fanout_deadline, probe_cache }
    }

    pub async fn trace(
        &self,
        site: FKey<Site>,
        switches: Vec<ExistingRow<Switch>>,
        mac: MacAddress,
        role: Role,
        cancel: &CancellationToken,
    ) -> TraceResult {
        let total = switches.len();
        let mut identities = Vec::with_capacity(total);
        let mut handles = Vec::with_capacity(total);

        for switch in switches {
            let switch_id = switch.id;
            let switch_name = switch.name.clone();
            identities.push((switch_id, switch_name.clone()));

            let governor = self.governor.clone();
            let credential = self.credential.clone();
            let connect_timeouts = self.connect_timeouts;
            let deadline = self.fanout_deadline;
            let cancel = cancel.clone();
            let address = switch.address.clone();
            let recorded_model = switch.model;
            let probe_cache = self.probe_cache.clone();

            handles.push(tokio::spawn(async move {
                match governor.acquire_within(switch_id, site, deadline, &cancel).await {
                    Err(_) => Err(TraceFailureKind::Timeout),
                    Ok(permit) => {
                        let model = probe_cache.lookup(switch_id, recorded_model);
                        let outcome = run_switch_read(&address, model, mac, &credential, connect_timeouts);
                        if let Ok((driver_model, _)) = &outcome {
                            probe_cache.remember(switch_id, recorded_model, *driver_model);
                        }
                        drop(permit);
                        outcome.map(|(_, hit)| hit).map_err(classify)
                    }
                }
            }));
        }

        let joined = futures::future::join_all(handles).await;

        let mut hits = Vec::new();
        let mut failures = Vec::new();
        for ((switch_id, switch_name), joined_result) in identities.into_iter().zip(joined) {
            match joined_result {
                Ok(Ok(Some((port, facts)))) => {
                    let is_uplink = facts.is_uplink;
                    hits.push(TraceHit { switch_id, switch_name, port, facts, is_uplink });
                }
                Ok(Ok(None)) => {}
                Ok(Err(kind)) => failures.push(TraceFailure { switch_id, switch_name, kind }),
                Err(join_err) => {
                    tracing::error!(switch = %switch_name, error = %join_err, "trace worker task panicked");
                    failures.push(TraceFailure { switch_id, switch_name, kind: TraceFailureKind::ParseFailed });
                }
            }
        }

        hits.sort_by(|a, b| a.switch_name.cmp(&b.switch_name).then(a.port.cmp(&b.port)));

        let no_results_due_to_failures = total > 0 && failures.len() == total;

        TraceResult { hits: filter_hits_for_role(hits, role), failures, no_results_due_to_failures }
    }
}

/// Opens one driver session, runs `find_mac` and, on a hit,
/// `describe_ports`, and always closes the session before returning — every
/// exit path releases the connection regardless of outcome (§4.1 Connection
/// lifecycle). Also hands back whatever family the driver settled on, so the
/// caller can memoize an auto-probe.
fn run_switch_read(
    address: &str,
    model: models::SwitchModel,
    mac: MacAddress,
    credential: &Credential,
    connect_timeouts: ConnectTimeouts,
) -> Result<(models::SwitchModel, Option<(PortRef, PortFacts)>), CoreError> {
    let mut driver = SwitchDriver::connect(address, model, credential, connect_timeouts, false)?;
    let resolved_model = driver.model();

    let result = (|| {
        let hit = driver.find_mac(mac)?;
        let Some(port) = hit else { return Ok(None) };
        let mut facts = driver.describe_ports(std::slice::from_ref(&port))?;
        let facts = facts.remove(&port).unwrap_or_else(models::unknown_port_facts);
        Ok(Some((port, facts)))
    })();

    driver.close();
    result.map(|hit| (resolved_model, hit))
}

fn classify(e: CoreError) -> TraceFailureKind {
    match e {
        CoreError::Unreachable(_) => TraceFailureKind::Unreachable,
        CoreError::AuthRejected => TraceFailureKind::AuthFailed,
        CoreError::Timeout(_) => TraceFailureKind::Timeout,
        _ => TraceFailureKind::ParseFailed,
    }
}

/// Viewer role sees only access-mode, non-uplink hits, with the free-text
/// description cleared (§4.4 step 5: "minimal fields"). Net-admin and above
/// see everything untouched.
fn filter_hits_for_role(hits: Vec<TraceHit>, role: Role) -> Vec<TraceHit> {
    if role >= Role::NetAdmin {
        return hits;
    }
    hits.into_iter()
        .filter(|hit| !hit.is_uplink && hit.facts.mode == PortMode::Access)
        .map(|mut hit| {
            hit.facts.description = None;
            hit
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_hit(name: &str, is_uplink: bool, mode: PortMode) -> TraceHit {
        TraceHit {
            switch_id: FKey::new_id_dangling(),
            switch_name: name.to_owned(),
            port: PortRef::new("Gi", 1, 0, 24),
            facts: PortFacts {
                admin_up: true,
                link_up: true,
                mode,
                access_vlan: None,
                allowed_vlans: vec![],
                description: Some("core uplink".to_owned()),
                is_uplink,
            },
            is_uplink,
        }
    }

    #[test]
    fn viewer_loses_uplink_hits_and_descriptions() {
        let hits = vec![
            sample_hit("SW-A", false, PortMode::Access),
            sample_hit("SW-B", true, PortMode::Trunk),
        ];
        let filtered = filter_hits_for_role(hits, Role::Viewer);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].switch_name, "SW-A");
        assert!(filtered[0].facts.description.is_none());
    }

    #[test]
    fn net_admin_sees_everything() {
        let hits = vec![sample_hit("SW-A", false, PortMode::Access), sample_hit("SW-B", true, PortMode::Trunk)];
        let filtered = filter_hits_for_role(hits, Role::NetAdmin);
        assert_eq!(filtered.len(), 2);
        assert!(filtered.iter().any(|h| h.facts.description.is_some()));
    }
}
