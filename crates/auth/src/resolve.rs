//! Principal resolution (§4.7): try the local table first, then fall back to
//! the directory if one is configured. §3: "default is the least-privileged
//! role when ambiguous" governs how directory group memberships collapse
//! into a single `Role`.

use common::prelude::*;
use config::RoleMapConfig;
use models::{Principal, Role};

use crate::directory::DirectoryClient;
use crate::local;

/// Highest role among the caller's directory groups that appear in the
/// role map. Groups with no mapping entry are ignored rather than rejected.
fn highest_mapped_role(groups: &[String], roles: &RoleMapConfig) -> Option<Role> {
    groups
        .iter()
        .filter_map(|g| roles.directory_groups.get(g).copied())
        .max()
}

pub async fn resolve_principal(
    username: &str,
    secret: &str,
    roles: &RoleMapConfig,
    directory: Option<&DirectoryClient>,
) -> Result<Principal, CoreError> {
    if let Some(role) = local::authenticate(username, secret, roles) {
        return Ok(Principal::new(username, role));
    }

    if let Some(client) = directory {
        let groups = client.authenticate(username, secret).await?;
        let role = highest_mapped_role(&groups, roles).unwrap_or_else(Role::least_privileged);
        return Ok(Principal::new(username, role));
    }

    Err(CoreError::Unauthenticated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[tokio::test]
    async fn falls_through_to_unauthenticated_with_no_directory() {
        let roles = RoleMapConfig::default();
        let result = resolve_principal("nobody", "wrong", &roles, None).await;
        assert!(matches!(result, Err(CoreError::Unauthenticated)));
    }

    #[test]
    fn highest_mapped_role_picks_max() {
        let mut directory_groups = HashMap::new();
        directory_groups.insert("netops".to_string(), Role::NetAdmin);
        directory_groups.insert("netops-admin".to_string(), Role::SuperAdmin);
        let roles = RoleMapConfig { local_users: HashMap::new(), directory_groups };

        let groups = vec!["netops".to_string(), "netops-admin".to_string()];
        assert_eq!(highest_mapped_role(&groups, &roles), Some(Role::SuperAdmin));
    }

    #[test]
    fn unmapped_groups_resolve_to_none() {
        let roles = RoleMapConfig::default();
        let groups = vec!["unrelated-group".to_string()];
        assert_eq!(highest_mapped_role(&groups, &roles), None);
    }
}
