//! RBAC gate (§4.7): every mutating endpoint names a minimum role; this is
//! the one place that decision is made so call sites can't drift from it.

use common::prelude::*;
use models::{Principal, Role};

pub fn require_role(principal: &Principal, minimum: Role) -> Result<(), CoreError> {
    if principal.has_at_least(minimum) {
        Ok(())
    } else {
        Err(CoreError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewer_cannot_meet_netadmin_gate() {
        let viewer = Principal::new("v", Role::Viewer);
        assert!(matches!(require_role(&viewer, Role::NetAdmin), Err(CoreError::Forbidden)));
    }

    #[test]
    fn superadmin_passes_every_gate() {
        let admin = Principal::new("a", Role::SuperAdmin);
        assert!(require_role(&admin, Role::Viewer).is_ok());
        assert!(require_role(&admin, Role::NetAdmin).is_ok());
        assert!(require_role(&admin, Role::SuperAdmin).is_ok());
    }
}
