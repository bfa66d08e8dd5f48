//! VLAN Change Engine (§4.5): two-phase preview/execute over a single
//! switch's ports, with drift detection between the two and the safety
//! invariants S1-S3 enforced at every step.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use common::prelude::*;
use dal::FKey;
use governor::ConcurrencyGovernor;
use models::{
    ChangeFlags, ChangePlan, ChangeReceipt, Credential, Disposition, DurationBand, PortFacts,
    PortMode, PortOutcome, PortRef, Role, SafetySummary, Site, Switch, VlanId,
};
use switch_driver::{collapse_contiguous, parse_port_spec, ConnectTimeouts, SwitchDriver};
use tokio_util::sync::CancellationToken;

use crate::ProbeCache;

pub struct VlanChangeEngine {
    governor: Arc<ConcurrencyGovernor>,
    credential: Credential,
    connect_timeouts: ConnectTimeouts,
    admission_deadline: Duration,
    probe_cache: Arc<ProbeCache>,
}

impl VlanChangeEngine {
    pub fn new(
        governor: Arc<ConcurrencyGovernor>,
        credential: Credential,
        connect_timeouts: ConnectTimeouts,
        admission_deadline: Duration,
        probe_cache: Arc<ProbeCache>,
    ) -> Self {
        Self { governor, credential, connect_timeouts, admission_deadline, probe_cache }
    }

    /// §4.5 Preview steps 1-5.
    pub async fn preview(
        &self,
        switch: &Switch,
        site: FKey<Site>,
        port_spec: &str,
        vlan: VlanId,
        flags: ChangeFlags,
        cancel: &CancellationToken,
    ) -> Result<ChangePlan, CoreError> {
        let refs = parse_port_spec(port_spec).map_err(|e| CoreError::PortSpecFormat(e.to_string()))?;

        let permit = self.governor.acquire_within(switch.id, site, self.admission_deadline, cancel).await?;

        let probe_model = self.probe_cache.lookup(switch.id, switch.model);
        let mut driver = match SwitchDriver::connect(&switch.address, probe_model, &self.credential, self.connect_timeouts, false) {
            Ok(driver) => driver,
            Err(e) => {
                drop(permit);
                return Err(e);
            }
        };
        self.probe_cache.remember(switch.id, switch.model, driver.model());

        let plan = compute_plan(&mut driver, switch.id, &refs, vlan, flags);
        driver.close();
        drop(permit);
        plan
    }

    /// §4.5 Execute steps 1-4. `prior_plan_hash` is the `drift_hash()` the
    /// caller observed from their own preview call; a fresh one computed
    /// here must match or the whole execute fails with `PlanDrift`.
    pub async fn execute(
        &self,
        switch: &Switch,
        site: FKey<Site>,
        port_spec: &str,
        vlan: VlanId,
        flags: ChangeFlags,
        role: Role,
        prior_plan_hash: u64,
        cancel: &CancellationToken,
    ) -> Result<ChangeReceipt, CoreError> {
        // S2: overriding uplink protection is a super-admin-only act.
        if flags.override_uplink_protection && role < Role::SuperAdmin {
            return Err(CoreError::Forbidden);
        }

        let refs = parse_port_spec(port_spec).map_err(|e| CoreError::PortSpecFormat(e.to_string()))?;
        let started = Instant::now();

        let permit = self.governor.acquire_within(switch.id, site, self.admission_deadline, cancel).await?;

        let probe_model = self.probe_cache.lookup(switch.id, switch.model);
        let mut driver = match SwitchDriver::connect(&switch.address, probe_model, &self.credential, self.connect_timeouts, true) {
            Ok(driver) => driver,
            Err(e) => {
                drop(permit);
                return Err(e);
            }
        };
        self.probe_cache.remember(switch.id, switch.model, driver.model());

        let result = (|| {
            let plan = compute_plan(&mut driver, switch.id, &refs, vlan, flags)?;
            if plan.drift_hash() != prior_plan_hash {
                return Err(CoreError::PlanDrift);
            }

            let will_change: Vec<PortRef> = plan
                .ports
                .iter()
                .filter(|(_, d)| d.permits_write())
                .map(|(p, _)| p.clone())
                .collect();
            let groups = collapse_contiguous(&will_change);

            // §4.2: the cps bucket is spent per real write command, not once
            // per governor acquisition. `write_deadline` reuses the
            // session's admission budget for however many commands
            // `apply_access_vlan`/`save` end up issuing.
            let write_deadline = Instant::now() + self.admission_deadline;
            let governor = self.governor.clone();
            let switch_id = switch.id;
            let make_consume_token = move || {
                let governor = governor.clone();
                move || governor.consume_command_token_blocking(switch_id, write_deadline)
            };

            let write_outcomes = driver.apply_access_vlan(&groups, vlan, make_consume_token())?;
            let saved = driver.save(make_consume_token())?;

            // §3 ChangeReceipt: every port in the plan gets an outcome, not
            // only the ones that were actually written.
            let mut outcome_by_port: HashMap<PortRef, PortOutcome> = write_outcomes.into_iter().collect();
            let outcomes: Vec<(PortRef, PortOutcome)> = plan
                .ports
                .iter()
                .map(|(port, _disposition)| {
                    let outcome = outcome_by_port.remove(port).unwrap_or(PortOutcome::Skipped);
                    (port.clone(), outcome)
                })
                .collect();

            Ok((outcomes, saved))
        })();

        driver.close();
        drop(permit);

        let (outcomes, saved) = result?;
        let wall_time_ms = started.elapsed().as_millis() as u64;

        Ok(ChangeReceipt {
            plan_hash: prior_plan_hash,
            outcomes,
            wall_time_ms,
            saved_to_startup: saved,
            audit_id: dal::ID::nil(),
        })
    }

    /// Backs `POST /api/vlan/check` (§6): a read-only probe through the
    /// same governor/driver path preview uses, without producing a plan.
    pub async fn check_vlan(
        &self,
        switch: &Switch,
        site: FKey<Site>,
        vlan: VlanId,
        cancel: &CancellationToken,
    ) -> Result<(bool, Option<String>), CoreError> {
        let permit = self.governor.acquire_within(switch.id, site, self.admission_deadline, cancel).await?;
        let probe_model = self.probe_cache.lookup(switch.id, switch.model);
        let mut driver = match SwitchDriver::connect(&switch.address, probe_model, &self.credential, self.connect_timeouts, false) {
            Ok(driver) => driver,
            Err(e) => {
                drop(permit);
                return Err(e);
            }
        };
        self.probe_cache.remember(switch.id, switch.model, driver.model());
        let result = driver.vlan_info(vlan);
        driver.close();
        drop(permit);
        result
    }

    /// Backs `POST /api/port/status` (§6): a read-only `describe_ports`
    /// call through the governor, outside of the preview/execute flow.
    pub async fn port_status(
        &self,
        switch: &Switch,
        site: FKey<Site>,
        refs: &[PortRef],
        cancel: &CancellationToken,
    ) -> Result<HashMap<PortRef, PortFacts>, CoreError> {
        let permit = self.governor.acquire_within(switch.id, site, self.admission_deadline, cancel).await?;
        let probe_model = self.probe_cache.lookup(switch.id, switch.model);
        let mut driver = match SwitchDriver::connect(&switch.address, probe_model, &self.credential, self.connect_timeouts, false) {
            Ok(driver) => driver,
            Err(e) => {
                drop(permit);
                return Err(e);
            }
        };
        self.probe_cache.remember(switch.id, switch.model, driver.model());
        let result = driver.describe_ports(refs);
        driver.close();
        drop(permit);
        result
    }
}

/// Shared by preview and execute's internal re-preview (§4.5 execute step
/// 1: "re-preview internally (fresh describe_ports)"). Requires an already
/// connected driver; does not touch the governor or connection lifecycle.
fn compute_plan(
    driver: &mut SwitchDriver,
    switch_id: FKey<Switch>,
    refs: &[PortRef],
    vlan: VlanId,
    flags: ChangeFlags,
) -> Result<ChangePlan, CoreError> {
    let vlan_exists = driver.vlan_exists(vlan)?;
    if !vlan_exists {
        return Err(CoreError::VlanAbsent);
    }

    let facts_map = driver.describe_ports(refs)?;

    let ports: Vec<(PortRef, Disposition)> = refs
        .iter()
        .map(|port| {
            let facts = facts_map.get(port).cloned().unwrap_or_else(models::unknown_port_facts);
            (port.clone(), disposition_for(&facts, vlan, flags))
        })
        .collect();

    let will_change: Vec<PortRef> =
        ports.iter().filter(|(_, d)| d.permits_write()).map(|(p, _)| p.clone()).collect();
    let groups = collapse_contiguous(&will_change);
    let commands = driver.plan_commands(&groups, vlan);

    let uplink_protection_active = !flags.override_uplink_protection;
    let all_validations_passed =
        vlan_exists && !ports.iter().any(|(_, d)| *d == Disposition::UnknownPort);

    Ok(ChangePlan {
        switch_id,
        target_vlan: vlan,
        ports,
        commands,
        estimated_duration: DurationBand::for_port_count(will_change.len()),
        safety: SafetySummary {
            all_validations_passed,
            vlan_exists,
            switch_reachable: true,
            uplink_protection_active,
        },
    })
}

/// §4.5 step 3. Order here is precedence: the first matching rule wins.
/// `unknown-port` is checked first since a port that doesn't resolve on the
/// switch carries no meaningful mode/uplink facts to test against.
fn disposition_for(facts: &PortFacts, vlan: VlanId, flags: ChangeFlags) -> Disposition {
    if *facts == models::unknown_port_facts() {
        return Disposition::UnknownPort;
    }
    if facts.is_uplink && !flags.override_uplink_protection {
        return Disposition::SkipUplink;
    }
    if facts.mode != PortMode::Access && flags.skip_non_access_ports {
        return Disposition::SkipNonAccess;
    }
    if facts.mode == PortMode::Access && facts.access_vlan == Some(vlan) {
        return Disposition::AlreadyTarget;
    }
    Disposition::WillChange
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts(mode: PortMode, access_vlan: Option<u16>, is_uplink: bool) -> PortFacts {
        PortFacts {
            admin_up: true,
            link_up: true,
            mode,
            access_vlan: access_vlan.map(|v| VlanId::try_from(v).unwrap()),
            allowed_vlans: vec![],
            description: None,
            is_uplink,
        }
    }

    #[test]
    fn uplink_skipped_unless_override() {
        let target = VlanId::try_from(100).unwrap();
        let trunk = facts(PortMode::Trunk, None, true);
        assert_eq!(
            disposition_for(&trunk, target, ChangeFlags::default()),
            Disposition::SkipUplink
        );
        let overridden = ChangeFlags { override_uplink_protection: true, ..Default::default() };
        assert_eq!(disposition_for(&trunk, target, overridden), Disposition::WillChange);
    }

    #[test]
    fn already_on_target_vlan_is_a_no_op() {
        let target = VlanId::try_from(100).unwrap();
        let on_target = facts(PortMode::Access, Some(100), false);
        assert_eq!(
            disposition_for(&on_target, target, ChangeFlags::default()),
            Disposition::AlreadyTarget
        );
    }

    #[test]
    fn non_access_skipped_only_when_requested() {
        let target = VlanId::try_from(100).unwrap();
        let general = facts(PortMode::General, None, false);
        assert_eq!(disposition_for(&general, target, ChangeFlags::default()), Disposition::WillChange);

        let skip_non_access = ChangeFlags { skip_non_access_ports: true, ..Default::default() };
        assert_eq!(disposition_for(&general, target, skip_non_access), Disposition::SkipNonAccess);
    }

    #[test]
    fn unparseable_port_is_unknown_regardless_of_flags() {
        let target = VlanId::try_from(100).unwrap();
        let unknown = models::unknown_port_facts();
        assert_eq!(disposition_for(&unknown, target, ChangeFlags::default()), Disposition::UnknownPort);
    }

    #[test]
    fn access_port_off_target_will_change() {
        let target = VlanId::try_from(100).unwrap();
        let other_vlan = facts(PortMode::Access, Some(50), false);
        assert_eq!(disposition_for(&other_vlan, target, ChangeFlags::default()), Disposition::WillChange);
    }
}
