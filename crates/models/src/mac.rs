use std::fmt;
use std::str::FromStr;

use common::prelude::*;
use serde::{Deserialize, Serialize};

/// A MAC address canonicalized to six lowercase hex bytes (§3 MAC, I1).
///
/// Accepts colon-separated (`aa:bb:cc:dd:ee:ff`) and dash-separated
/// (`aa-bb-cc-dd-ee-ff`) forms via `macaddr`, plus Cisco-dotted
/// (`aabb.ccdd.eeff`) input, which `macaddr` doesn't parse — that form is
/// hand-rolled here.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    pub fn bytes(&self) -> [u8; 6] {
        self.0
    }

    pub fn parse(input: &str) -> Result<Self, CoreError> {
        let trimmed = input.trim();
        if let Ok(parsed) = macaddr::MacAddr6::from_str(trimmed) {
            return Ok(Self(parsed.into_array()));
        }
        Self::parse_cisco_dotted(trimmed)
    }

    /// `aabb.ccdd.eeff`: three dot-separated groups of four hex digits.
    fn parse_cisco_dotted(input: &str) -> Result<Self, CoreError> {
        let hex: String = input.chars().filter(|c| *c != '.').collect();

        if hex.len() != 12 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CoreError::MacFormat);
        }

        let mut bytes = [0u8; 6];
        for (i, b) in bytes.iter_mut().enumerate() {
            let byte_str = &hex[i * 2..i * 2 + 2];
            *b = u8::from_str_radix(byte_str, 16).map_err(|_| CoreError::MacFormat)?;
        }

        Ok(Self(bytes))
    }
}

impl std::str::FromStr for MacAddress {
    type Err = CoreError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for MacAddress {
    type Error = CoreError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<MacAddress> for String {
    fn from(value: MacAddress) -> Self {
        value.to_string()
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl fmt::Debug for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MacAddress({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn accepts_all_three_input_forms() {
        let colon = MacAddress::parse("AA:BB:CC:DD:EE:FF").unwrap();
        let dash = MacAddress::parse("aa-bb-cc-dd-ee-ff").unwrap();
        let cisco = MacAddress::parse("aabb.ccdd.eeff").unwrap();
        assert_eq!(colon, dash);
        assert_eq!(dash, cisco);
        assert_eq!(colon.to_string(), "aa:bb:cc:dd:ee:ff");
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(MacAddress::parse("not-a-mac").is_err());
        assert!(MacAddress::parse("aa:bb:cc:dd:ee").is_err());
        assert!(MacAddress::parse("aa:bb:cc:dd:ee:gg").is_err());
    }

    proptest! {
        /// P1: canonicalization is total over well-formed input and
        /// idempotent — re-parsing the canonical form yields the same value.
        #[test]
        fn canonicalization_is_idempotent(bytes: [u8; 6]) {
            let canonical = MacAddress(bytes).to_string();
            let reparsed = MacAddress::parse(&canonical).unwrap();
            prop_assert_eq!(reparsed.to_string(), canonical);
        }
    }
}
