use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// A principal's privilege level (§3 Principal, §4.7 Auth & RBAC).
///
/// Ordered so `role >= Role::NetAdmin` reads naturally at router gates.
#[derive(
    Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display, Hash,
)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Viewer,
    NetAdmin,
    SuperAdmin,
}

impl Role {
    /// The role assigned when resolution is ambiguous (§3: "default is the
    /// least-privileged role when ambiguous").
    pub fn least_privileged() -> Self {
        Role::Viewer
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::least_privileged()
    }
}
