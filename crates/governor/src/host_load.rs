//! Host-Load Guard (§4.3): samples host CPU utilization on a timer into a
//! ring buffer, classifies green/yellow/red, and never performs any I/O on
//! switches itself.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::prelude::*;
use parking_lot::RwLock;
use sysinfo::{CpuExt, System, SystemExt};

use crate::ConcurrencyGovernor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Green,
    Yellow,
    Red,
}

impl From<u8> for LoadState {
    fn from(value: u8) -> Self {
        match value {
            1 => LoadState::Yellow,
            2 => LoadState::Red,
            _ => LoadState::Green,
        }
    }
}

impl From<LoadState> for u8 {
    fn from(value: LoadState) -> Self {
        match value {
            LoadState::Green => 0,
            LoadState::Yellow => 1,
            LoadState::Red => 2,
        }
    }
}

pub struct HostLoadGuard {
    samples: RwLock<VecDeque<f32>>,
    ring_size: usize,
    yellow_threshold_pct: f32,
    red_threshold_pct: f32,
    state: AtomicU8,
}

impl HostLoadGuard {
    pub fn new(ring_size: usize, yellow_threshold_pct: f32, red_threshold_pct: f32) -> Arc<Self> {
        Arc::new(Self {
            samples: RwLock::new(VecDeque::with_capacity(ring_size)),
            ring_size,
            yellow_threshold_pct,
            red_threshold_pct,
            state: AtomicU8::new(LoadState::Green.into()),
        })
    }

    /// Spawns the sampling loop. Returned handle is detached by the caller
    /// (typically the binary's startup code); dropping it does not stop
    /// sampling since the task owns its own `Arc` clones.
    pub fn spawn_sampler(
        self: &Arc<Self>,
        interval: Duration,
        governor: Arc<ConcurrencyGovernor>,
    ) -> tokio::task::JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut sys = System::new();
            loop {
                sys.refresh_cpu();
                tokio::time::sleep(interval).await;
                sys.refresh_cpu();
                let usage = sys.global_cpu_info().cpu_usage();

                this.push_sample(usage);
                let new_state = this.classify();
                let old: LoadState = this.state.swap(new_state.into(), Ordering::SeqCst).into();
                if old != new_state {
                    tracing::warn!(?old, ?new_state, usage, "host-load state transition");
                    governor.set_yellow_mode(new_state == LoadState::Yellow);
                }
            }
        })
    }

    fn push_sample(&self, v: f32) {
        let mut guard = self.samples.write();
        if guard.len() >= self.ring_size {
            guard.pop_front();
        }
        guard.push_back(v);
    }

    fn classify(&self) -> LoadState {
        let guard = self.samples.read();
        if guard.is_empty() {
            return LoadState::Green;
        }
        let avg = guard.iter().sum::<f32>() / guard.len() as f32;
        if avg >= self.red_threshold_pct {
            LoadState::Red
        } else if avg >= self.yellow_threshold_pct {
            LoadState::Yellow
        } else {
            LoadState::Green
        }
    }

    /// Read-only status for observability (`/cpu-status`, §6). Never
    /// performs I/O on switches.
    pub fn status(&self) -> LoadState {
        self.state.load(Ordering::SeqCst).into()
    }

    pub fn average_sample(&self) -> Option<f32> {
        let guard = self.samples.read();
        if guard.is_empty() {
            None
        } else {
            Some(guard.iter().sum::<f32>() / guard.len() as f32)
        }
    }

    /// Gate applied before any privileged operation reaches the engines
    /// (§4.3 policy: red rejects new work; in-flight work is untouched).
    pub fn admit_privileged(&self) -> Result<(), CoreError> {
        match self.status() {
            LoadState::Red => Err(CoreError::Overloaded),
            LoadState::Green | LoadState::Yellow => Ok(()),
        }
    }
}

impl std::fmt::Debug for LoadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LoadState::Green => "green",
            LoadState::Yellow => "yellow",
            LoadState::Red => "red",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_ring_average() {
        let guard = HostLoadGuard::new(4, 40.0, 80.0);
        for sample in [10.0, 10.0, 10.0, 10.0] {
            guard.push_sample(sample);
        }
        assert_eq!(guard.classify(), LoadState::Green);

        for sample in [90.0, 90.0, 90.0, 90.0] {
            guard.push_sample(sample);
        }
        assert_eq!(guard.classify(), LoadState::Red);
    }

    #[test]
    fn ring_buffer_evicts_oldest() {
        let guard = HostLoadGuard::new(2, 40.0, 80.0);
        guard.push_sample(10.0);
        guard.push_sample(10.0);
        guard.push_sample(90.0);
        // Only the last 2 samples should count: [10.0, 90.0] -> avg 50 -> yellow.
        assert_eq!(guard.classify(), LoadState::Yellow);
    }
}
