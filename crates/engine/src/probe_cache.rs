//! Switch-model auto-probe cache (§4.1 "unknown" bucket; supplemented
//! feature): once a switch whose inventory record carries `Unknown` has its
//! family identified from a live session, later calls in the same process
//! skip re-probing it. The inventory record itself is left untouched —
//! writing the resolved family back is an inventory write, out of scope
//! for this core per §4.6.

use dal::FKey;
use dashmap::DashMap;
use models::{Switch, SwitchModel};

#[derive(Default)]
pub struct ProbeCache {
    resolved: DashMap<FKey<Switch>, SwitchModel>,
}

impl ProbeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// What model to hand the driver for this connection attempt: the
    /// inventory's own tag if it already knows, otherwise whatever this
    /// process has previously resolved for that switch (still `Unknown` if
    /// nothing has probed it yet).
    pub fn lookup(&self, switch: FKey<Switch>, recorded: SwitchModel) -> SwitchModel {
        if recorded != SwitchModel::Unknown {
            return recorded;
        }
        self.resolved.get(&switch).map(|entry| *entry).unwrap_or(SwitchModel::Unknown)
    }

    /// Records a freshly auto-probed family, only when the inventory record
    /// didn't already know it and the probe actually resolved one.
    pub fn remember(&self, switch: FKey<Switch>, recorded: SwitchModel, resolved: SwitchModel) {
        if recorded == SwitchModel::Unknown && resolved != SwitchModel::Unknown {
            self.resolved.insert(switch, resolved);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn switch_id() -> FKey<Switch> {
        FKey::new_id_dangling()
    }

    #[test]
    fn known_model_bypasses_the_cache_entirely() {
        let cache = ProbeCache::new();
        assert_eq!(cache.lookup(switch_id(), SwitchModel::Os10), SwitchModel::Os10);
    }

    #[test]
    fn remembers_a_probe_for_an_unknown_record() {
        let cache = ProbeCache::new();
        let switch = switch_id();
        assert_eq!(cache.lookup(switch, SwitchModel::Unknown), SwitchModel::Unknown);

        cache.remember(switch, SwitchModel::Unknown, SwitchModel::N3200);
        assert_eq!(cache.lookup(switch, SwitchModel::Unknown), SwitchModel::N3200);
    }

    #[test]
    fn never_overwrites_an_already_known_record() {
        let cache = ProbeCache::new();
        let switch = switch_id();
        cache.remember(switch, SwitchModel::Os10, SwitchModel::N3200);
        assert_eq!(cache.lookup(switch, SwitchModel::Os10), SwitchModel::Os10);
    }
}
