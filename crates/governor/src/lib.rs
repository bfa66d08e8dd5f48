//! Concurrency Governor (§4.2) and Host-Load Guard (§4.3).
//!
//! Both are process-wide mutable shared state, per §5 "Shared-resource
//! policy": everything here is either an atomic or a lock-guarded counter,
//! threaded through constructors rather than reached via an ambient
//! global (§9 "Global singletons... become values threaded through
//! constructors").

mod bucket;
mod host_load;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use common::prelude::*;
use dal::FKey;
use models::{Site, Switch};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

use bucket::TokenBucket;
pub use host_load::{HostLoadGuard, LoadState};

/// Holds one acquired slot at each of the three levels, released on drop in
/// the reverse of acquisition order (switch, then site, then global) per
/// §4.2 "Acquisition order is fixed (global -> site -> switch); release is
/// reverse order". Field declaration order is what drives drop order here.
pub struct GovernorPermit {
    _switch: OwnedSemaphorePermit,
    _site: OwnedSemaphorePermit,
    _global: OwnedSemaphorePermit,
}

/// Concurrency Governor: per-switch, per-site, and global admission slots
/// plus a commands-per-second token bucket per switch (§4.2).
pub struct ConcurrencyGovernor {
    global: Arc<Semaphore>,
    per_switch_capacity: usize,
    per_site_capacity: usize,
    admission_deadline: Duration,
    sites: dashmap::DashMap<FKey<Site>, Arc<Semaphore>>,
    switches: dashmap::DashMap<FKey<Switch>, Arc<Semaphore>>,
    buckets: dashmap::DashMap<FKey<Switch>, parking_lot::Mutex<TokenBucket>>,
    commands_per_second: u32,
    /// Set by the Host-Load Guard when it transitions into/out of yellow
    /// (§4.3 policy: "yellow: admit, but reduce per-site slots by half for
    /// the duration").
    yellow_active: AtomicBool,
}

impl ConcurrencyGovernor {
    pub fn new(
        global_slots: usize,
        per_site_slots: usize,
        per_switch_slots: usize,
        commands_per_second: u32,
        admission_deadline: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            global: Arc::new(Semaphore::new(global_slots)),
            per_switch_capacity: per_switch_slots,
            per_site_capacity: per_site_slots,
            admission_deadline,
            sites: dashmap::DashMap::new(),
            switches: dashmap::DashMap::new(),
            buckets: dashmap::DashMap::new(),
            commands_per_second,
            yellow_active: AtomicBool::new(false),
        })
    }

    fn site_semaphore(&self, site: FKey<Site>) -> Arc<Semaphore> {
        self.sites
            .entry(site)
            .or_insert_with(|| {
                let cap = if self.yellow_active.load(Ordering::SeqCst) {
                    (self.per_site_capacity / 2).max(1)
                } else {
                    self.per_site_capacity
                };
                Arc::new(Semaphore::new(cap))
            })
            .clone()
    }

    fn switch_semaphore(&self, switch: FKey<Switch>) -> Arc<Semaphore> {
        self.switches
            .entry(switch)
            .or_insert_with(|| Arc::new(Semaphore::new(self.per_switch_capacity)))
            .clone()
    }

    /// Called by the Host-Load Guard on a green/yellow transition. Halves
    /// (or restores) every existing per-site semaphore's permit count;
    /// semaphores created later pick up the active mode from
    /// `yellow_active` directly.
    pub fn set_yellow_mode(&self, active: bool) {
        let was_active = self.yellow_active.swap(active, Ordering::SeqCst);
        if was_active == active {
            return;
        }
        let half = (self.per_site_capacity / 2).max(1);
        for entry in self.sites.iter() {
            if active {
                entry.value().forget_permits(half);
            } else {
                entry.value().add_permits(half);
            }
        }
        tracing::info!(active, "adjusted per-site governor capacity for host-load state");
    }

    /// Acquire-all-or-none admission for one driver session (I4), with the
    /// configured default deadline.
    pub async fn acquire(
        &self,
        switch: FKey<Switch>,
        site: FKey<Site>,
        cancel: &CancellationToken,
    ) -> Result<GovernorPermit, CoreError> {
        self.acquire_within(switch, site, self.admission_deadline, cancel).await
    }

    /// Same as [`acquire`](Self::acquire) but with a caller-supplied
    /// deadline — used by the MAC Trace Engine, which shares one 60s budget
    /// across every switch it fans out to (§4.4 step 3), rather than the
    /// governor's own 5s default.
    pub async fn acquire_within(
        &self,
        switch: FKey<Switch>,
        site: FKey<Site>,
        deadline: Duration,
        cancel: &CancellationToken,
    ) -> Result<GovernorPermit, CoreError> {
        let start = Instant::now();

        let global = self
            .acquire_one(self.global.clone(), start, deadline, cancel)
            .await?;
        let site_sem = self.site_semaphore(site);
        let site_permit = self.acquire_one(site_sem, start, deadline, cancel).await?;
        let switch_sem = self.switch_semaphore(switch);
        let switch_permit = self.acquire_one(switch_sem, start, deadline, cancel).await?;

        Ok(GovernorPermit {
            _switch: switch_permit,
            _site: site_permit,
            _global: global,
        })
    }

    async fn acquire_one(
        &self,
        sem: Arc<Semaphore>,
        start: Instant,
        deadline: Duration,
        cancel: &CancellationToken,
    ) -> Result<OwnedSemaphorePermit, CoreError> {
        let remaining = remaining_budget(start, deadline)?;
        tokio::select! {
            _ = cancel.cancelled() => Err(CoreError::Busy),
            res = tokio::time::timeout(remaining, sem.acquire_owned()) => {
                res.map_err(|_| CoreError::Busy)?.map_err(|_| CoreError::Internal("semaphore closed".into()))
            }
        }
    }

    /// Consumes one commands-per-second token for `switch`, blocking the
    /// calling thread (not `.await`ing) until one is available or `deadline`
    /// passes. §4.2: "decremented before each CLI write" — the driver holds
    /// no executor to yield to mid-command, so this is called once per real
    /// write command from inside the synchronous SSH session, not once per
    /// governor acquisition.
    pub fn consume_command_token_blocking(
        &self,
        switch: FKey<Switch>,
        deadline: Instant,
    ) -> Result<(), CoreError> {
        let cps = self.commands_per_second;
        loop {
            if Instant::now() >= deadline {
                return Err(CoreError::Busy);
            }
            {
                let bucket = self
                    .buckets
                    .entry(switch)
                    .or_insert_with(|| parking_lot::Mutex::new(TokenBucket::new(cps)));
                if bucket.lock().try_consume() {
                    return Ok(());
                }
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            std::thread::sleep(remaining.min(Duration::from_millis(50)));
        }
    }
}

fn remaining_budget(start: Instant, deadline: Duration) -> Result<Duration, CoreError> {
    let elapsed = start.elapsed();
    if elapsed >= deadline {
        Err(CoreError::Busy)
    } else {
        Ok(deadline - elapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_key<T: dal::DBTable>() -> FKey<T> {
        FKey::new_id_dangling()
    }

    #[tokio::test]
    async fn busy_when_switch_slots_exhausted() {
        let governor = ConcurrencyGovernor::new(64, 10, 1, 10, Duration::from_millis(200));
        let cancel = CancellationToken::new();
        let switch: FKey<Switch> = fresh_key();
        let site: FKey<Site> = fresh_key();

        let _held = governor.acquire(switch, site, &cancel).await.unwrap();
        let second = governor.acquire(switch, site, &cancel).await;
        assert!(matches!(second, Err(CoreError::Busy)));
    }

    #[tokio::test]
    async fn releases_slot_on_drop() {
        let governor = ConcurrencyGovernor::new(64, 10, 1, 10, Duration::from_millis(200));
        let cancel = CancellationToken::new();
        let switch: FKey<Switch> = fresh_key();
        let site: FKey<Site> = fresh_key();

        {
            let _held = governor.acquire(switch, site, &cancel).await.unwrap();
        }
        // P4: after the permit drops, a second acquisition must succeed.
        assert!(governor.acquire(switch, site, &cancel).await.is_ok());
    }

    #[tokio::test]
    async fn acquisition_no_longer_spends_a_command_token() {
        // A single governor admission must not drain the per-switch cps
        // bucket; tokens are only spent per real write command.
        let governor = ConcurrencyGovernor::new(64, 10, 10, 1, Duration::from_millis(200));
        let cancel = CancellationToken::new();
        let switch: FKey<Switch> = fresh_key();
        let site: FKey<Site> = fresh_key();

        let _held = governor.acquire(switch, site, &cancel).await.unwrap();
        let deadline = Instant::now() + Duration::from_millis(50);
        assert!(governor.consume_command_token_blocking(switch, deadline).is_ok());
    }

    #[test]
    fn command_token_consumption_throttles_and_times_out() {
        let governor = ConcurrencyGovernor::new(64, 10, 10, 1, Duration::from_millis(200));
        let switch: FKey<Switch> = fresh_key();

        let deadline = Instant::now() + Duration::from_millis(500);
        assert!(governor.consume_command_token_blocking(switch, deadline).is_ok());

        let short_deadline = Instant::now() + Duration::from_millis(10);
        assert!(matches!(
            governor.consume_command_token_blocking(switch, short_deadline),
            Err(CoreError::Busy)
        ));
    }
}
