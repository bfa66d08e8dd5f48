use serde::{Deserialize, Serialize};

use crate::role::Role;

/// An authenticated identity for the lifetime of one request (§3 Principal).
///
/// Ephemeral — never persisted; carried inside the signed session cookie by
/// the `auth` crate.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Principal {
    pub name: String,
    pub role: Role,
}

impl Principal {
    pub fn new(name: impl Into<String>, role: Role) -> Self {
        Self { name: name.into(), role }
    }

    pub fn has_at_least(&self, min: Role) -> bool {
        self.role >= min
    }
}
