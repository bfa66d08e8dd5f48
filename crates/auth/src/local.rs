//! Local principal table (§4.7): a small set of operator accounts kept
//! directly in configuration, compared with a constant-time comparator so a
//! timing side channel can't leak how many leading bytes of a guess matched.

use config::RoleMapConfig;
use models::Role;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// `password_hash` in configuration is the lowercase hex SHA-256 digest of
/// the plaintext secret. Not a substitute for a slow KDF in a real
/// deployment, but matches the one hashing primitive already in this
/// workspace's dependency stack.
fn digest_hex(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Returns the matched role, or `None` if the username is unknown or the
/// secret doesn't match. Never distinguishes the two failure modes to the
/// caller (§4.7: unknown user and wrong password look identical).
pub fn authenticate(username: &str, secret: &str, roles: &RoleMapConfig) -> Option<Role> {
    let entry = roles.local_users.get(username)?;
    let given = digest_hex(secret);
    let matches: bool = given.as_bytes().ct_eq(entry.password_hash.as_bytes()).into();
    matches.then_some(entry.role)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn roles_with(user: &str, secret: &str, role: Role) -> RoleMapConfig {
        let mut local_users = HashMap::new();
        local_users.insert(
            user.to_string(),
            config::LocalUser { password_hash: digest_hex(secret), role },
        );
        RoleMapConfig { local_users, directory_groups: HashMap::new() }
    }

    #[test]
    fn matches_correct_secret() {
        let roles = roles_with("alice", "hunter2", Role::NetAdmin);
        assert_eq!(authenticate("alice", "hunter2", &roles), Some(Role::NetAdmin));
    }

    #[test]
    fn rejects_wrong_secret() {
        let roles = roles_with("alice", "hunter2", Role::NetAdmin);
        assert_eq!(authenticate("alice", "wrong", &roles), None);
    }

    #[test]
    fn rejects_unknown_user() {
        let roles = roles_with("alice", "hunter2", Role::NetAdmin);
        assert_eq!(authenticate("bob", "hunter2", &roles), None);
    }
}
