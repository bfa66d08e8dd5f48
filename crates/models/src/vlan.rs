use common::prelude::*;
use serde::{Deserialize, Serialize};

/// A VLAN id in `[1, 4094]`; 0 and 4095 are reserved and rejected (§3 VlanId).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct VlanId(u16);

impl VlanId {
    pub const MIN: u16 = 1;
    pub const MAX: u16 = 4094;

    pub fn get(&self) -> u16 {
        self.0
    }
}

impl TryFrom<u16> for VlanId {
    type Error = CoreError;
    fn try_from(value: u16) -> Result<Self, Self::Error> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(CoreError::VlanRange)
        }
    }
}

impl From<VlanId> for u16 {
    fn from(value: VlanId) -> Self {
        value.0
    }
}

impl std::fmt::Display for VlanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_reserved_ids() {
        assert!(VlanId::try_from(0).is_err());
        assert!(VlanId::try_from(4095).is_err());
    }

    #[test]
    fn accepts_boundary_ids() {
        assert!(VlanId::try_from(1).is_ok());
        assert!(VlanId::try_from(4094).is_ok());
    }
}
