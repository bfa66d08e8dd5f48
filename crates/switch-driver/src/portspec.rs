//! Port-spec grammar (§6): turns a caller-supplied string like
//! `"Gi1/0/1-24,Gi1/0/30"` into a canonical `Vec<PortRef>`.
//!
//! Table-driven and defensive by construction rather than regex-based, per
//! §9 "Parser resilience is a first-class concern... prefer table-driven
//! recognition... over regex soup" — though here the table is the small
//! fixed prefix set rather than a per-family output grammar.

use models::PortRef;
use thiserror::Error;

const KNOWN_PREFIXES: &[&str] = &["Gi", "Te", "Tw", "Po", "ethernet"];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PortSpecError {
    #[error("port spec contains a character outside [A-Za-z0-9/ ,-]")]
    InvalidCharacter,
    #[error("empty port token")]
    EmptyToken,
    #[error("unrecognized interface prefix in {0:?}")]
    UnknownPrefix(String),
    #[error("malformed port token {0:?}")]
    Malformed(String),
    #[error("range bounds are not numerically ordered")]
    RangeNotOrdered,
    #[error("range bounds do not share prefix/unit/slot")]
    RangeMismatch,
}

/// Parses the full port-spec grammar (§6):
/// ```text
/// spec      := token ("," token)*
/// token     := single | range
/// single    := prefix number ("/" number){0,2}
/// range     := single "-" single   ; both singles share prefix and all but last coord
/// prefix    := "Gi" | "Te" | "Tw" | "Po" | "ethernet "
/// number    := [0-9]+
/// ```
pub fn parse_port_spec(raw: &str) -> Result<Vec<PortRef>, PortSpecError> {
    if raw.chars().any(|c| !matches!(c, 'a'..='z' | 'A'..='Z' | '0'..='9' | '/' | ' ' | ',' | '-')) {
        return Err(PortSpecError::InvalidCharacter);
    }

    let mut refs = Vec::new();
    for token in raw.split(',') {
        let token = normalize_whitespace(token.trim());
        if token.is_empty() {
            return Err(PortSpecError::EmptyToken);
        }

        match token.find('-') {
            Some(dash) => {
                let left = &token[..dash];
                let right = &token[dash + 1..];
                refs.extend(parse_range(left.trim(), right.trim())?);
            }
            None => refs.push(parse_single(&token)?),
        }
    }
    Ok(refs)
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Splits a token like `Gi1/0/24` or `ethernet 1/1/1` into its recognized
/// prefix and the trailing unit/slot/port triple.
fn parse_single(token: &str) -> Result<PortRef, PortSpecError> {
    let (prefix, coords) = split_prefix_and_coords(token)?;
    if coords.len() != 3 {
        return Err(PortSpecError::Malformed(token.to_owned()));
    }
    Ok(PortRef::new(prefix, coords[0], coords[1], coords[2]))
}

fn parse_range(left: &str, right: &str) -> Result<Vec<PortRef>, PortSpecError> {
    let (prefix, left_coords) = split_prefix_and_coords(left)?;
    if left_coords.len() != 3 {
        return Err(PortSpecError::Malformed(left.to_owned()));
    }

    let tail = parse_coords_only(right)?;
    let last_coords = match tail.len() {
        1 => [left_coords[0], left_coords[1], tail[0]],
        3 => {
            if tail[0] != left_coords[0] || tail[1] != left_coords[1] {
                return Err(PortSpecError::RangeMismatch);
            }
            [tail[0], tail[1], tail[2]]
        }
        _ => return Err(PortSpecError::Malformed(right.to_owned())),
    };

    if last_coords[2] < left_coords[2] {
        return Err(PortSpecError::RangeNotOrdered);
    }

    Ok((left_coords[2]..=last_coords[2])
        .map(|port| PortRef::new(prefix.clone(), left_coords[0], left_coords[1], port))
        .collect())
}

fn split_prefix_and_coords(token: &str) -> Result<(String, Vec<u32>), PortSpecError> {
    let digit_idx = token
        .find(|c: char| c.is_ascii_digit())
        .ok_or_else(|| PortSpecError::Malformed(token.to_owned()))?;
    let (prefix_raw, rest) = token.split_at(digit_idx);
    let prefix_raw = prefix_raw.trim();

    let prefix = KNOWN_PREFIXES
        .iter()
        .find(|p| p.eq_ignore_ascii_case(prefix_raw))
        .ok_or_else(|| PortSpecError::UnknownPrefix(prefix_raw.to_owned()))?;

    let coords = parse_coords_only(rest)?;
    Ok((prefix.to_string(), coords))
}

fn parse_coords_only(s: &str) -> Result<Vec<u32>, PortSpecError> {
    let coords: Result<Vec<u32>, PortSpecError> = s
        .split('/')
        .map(|p| p.trim().parse::<u32>().map_err(|_| PortSpecError::Malformed(s.to_owned())))
        .collect();
    let coords = coords?;
    if coords.is_empty() || coords.len() > 3 {
        return Err(PortSpecError::Malformed(s.to_owned()));
    }
    Ok(coords)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_port() {
        let refs = parse_port_spec("Gi1/0/24").unwrap();
        assert_eq!(refs, vec![PortRef::new("Gi", 1, 0, 24)]);
    }

    #[test]
    fn parses_shorthand_range() {
        let refs = parse_port_spec("Gi1/0/1-3").unwrap();
        assert_eq!(
            refs,
            vec![
                PortRef::new("Gi", 1, 0, 1),
                PortRef::new("Gi", 1, 0, 2),
                PortRef::new("Gi", 1, 0, 3),
            ]
        );
    }

    #[test]
    fn parses_full_triple_range() {
        let refs = parse_port_spec("ethernet 1/1/1-1/1/4").unwrap();
        assert_eq!(refs.len(), 4);
        assert_eq!(refs[0], PortRef::new("ethernet", 1, 1, 1));
        assert_eq!(refs[3], PortRef::new("ethernet", 1, 1, 4));
    }

    #[test]
    fn parses_comma_separated_list() {
        let refs = parse_port_spec("Gi1/0/1,Gi1/0/3").unwrap();
        assert_eq!(refs, vec![PortRef::new("Gi", 1, 0, 1), PortRef::new("Gi", 1, 0, 3)]);
    }

    #[test]
    fn rejects_unrecognized_characters() {
        assert_eq!(parse_port_spec("Gi1/0/24; rm -rf /"), Err(PortSpecError::InvalidCharacter));
    }

    #[test]
    fn rejects_mismatched_range_prefix_or_slot() {
        assert_eq!(
            parse_range("ethernet 1/1/1", "1/2/4").unwrap_err(),
            PortSpecError::RangeMismatch
        );
    }

    #[test]
    fn rejects_misordered_range() {
        assert_eq!(parse_port_spec("Gi1/0/24-1").unwrap_err(), PortSpecError::RangeNotOrdered);
    }

    /// P2: a parsed `[]PortRef` re-serialized and re-parsed (through its
    /// single-port form) yields the same refs.
    #[test]
    fn round_trips_through_display() {
        let refs = parse_port_spec("Gi1/0/1-3").unwrap();
        let reparsed: Vec<_> = refs
            .iter()
            .map(|r| parse_single(&r.to_string()).unwrap())
            .collect();
        assert_eq!(refs, reparsed);
    }
}
