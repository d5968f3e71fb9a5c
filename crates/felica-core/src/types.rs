use crate::{
    Result,
    constants::{
        PURSE_ACCESS_TYPES, RANDOM_CYCLIC_ACCESS_TYPES, SERVICE_ATTRIBUTE_MASK, SERVICE_CYCLIC_TYPE,
        SERVICE_NO_AUTH_BIT, SERVICE_NUMBER_SHIFT, SERVICE_OVERLAP_SHIFT, SERVICE_PURSE_TYPE,
        SERVICE_RANDOM_TYPE, SERVICE_TYPE_MASK, SERVICE_TYPE_SHIFT,
    },
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Parse a 16-bit hex value, with or without a `0x` prefix.
///
/// # Errors
/// Returns `Error::InvalidHex` if the value is empty, not hexadecimal or
/// does not fit in 16 bits.
pub fn parse_hex_u16(value: &str) -> Result<u16> {
    let trimmed = value.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    u16::from_str_radix(digits, 16).map_err(|_| Error::InvalidHex(value.to_string()))
}

/// System code selecting one logical application on the card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SystemCode(u16);

impl SystemCode {
    #[must_use]
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    #[must_use]
    pub const fn as_u16(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for SystemCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{:04X}", self.0)
    }
}

impl From<u16> for SystemCode {
    fn from(code: u16) -> Self {
        Self(code)
    }
}

impl std::str::FromStr for SystemCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_hex_u16(s).map(Self)
    }
}

/// Service type encoded in bits 2-5 of a service code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    Random,
    Cyclic,
    Purse,
    Unknown,
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Random => write!(f, "Random"),
            Self::Cyclic => write!(f, "Cyclic"),
            Self::Purse => write!(f, "Purse"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// A 16-bit FeliCa service code.
///
/// Ordering is numeric, which is what result sorting relies on.
///
/// # Examples
///
/// ```
/// use felica_core::{ServiceCode, ServiceKind};
///
/// let code = ServiceCode::new(0x090F);
/// assert!(!code.requires_authentication());
/// assert_eq!(code.kind(), ServiceKind::Cyclic);
/// assert_eq!(code.to_string(), "0x090F");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceCode(u16);

impl ServiceCode {
    #[must_use]
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    #[must_use]
    pub const fn as_u16(&self) -> u16 {
        self.0
    }

    /// True iff the no-authentication bit (LSB) is clear.
    #[must_use]
    pub const fn requires_authentication(&self) -> bool {
        self.0 & SERVICE_NO_AUTH_BIT == 0
    }

    /// Service number (bits 6-15).
    #[must_use]
    pub const fn number(&self) -> u16 {
        self.0 >> SERVICE_NUMBER_SHIFT
    }

    /// Service attribute (bits 0-5).
    #[must_use]
    pub const fn attribute(&self) -> u16 {
        self.0 & SERVICE_ATTRIBUTE_MASK
    }

    /// Identity shared by all overlapping variants of one logical service.
    #[must_use]
    pub const fn overlap_id(&self) -> u16 {
        self.0 >> SERVICE_OVERLAP_SHIFT
    }

    #[must_use]
    pub const fn is_purse(&self) -> bool {
        self.overlap_id() & 1 == 1
    }

    #[must_use]
    pub fn kind(&self) -> ServiceKind {
        let bits = (self.0 >> SERVICE_TYPE_SHIFT) & SERVICE_TYPE_MASK;
        if bits == SERVICE_RANDOM_TYPE {
            ServiceKind::Random
        } else if bits == SERVICE_CYCLIC_TYPE {
            ServiceKind::Cyclic
        } else if bits & 0b1110 == SERVICE_PURSE_TYPE {
            ServiceKind::Purse
        } else {
            ServiceKind::Unknown
        }
    }

    /// Human-readable access mode, e.g. `"read w/o key"`.
    #[must_use]
    pub fn access_type(&self) -> &'static str {
        match self.kind() {
            ServiceKind::Random | ServiceKind::Cyclic => {
                RANDOM_CYCLIC_ACCESS_TYPES[usize::from(self.0 & 3)]
            }
            ServiceKind::Purse => PURSE_ACCESS_TYPES[usize::from(self.0 & 7)],
            ServiceKind::Unknown => "unknown",
        }
    }

    /// Whether this code belongs in the same overlap group as `previous`.
    ///
    /// Both codes must share the overlap id. Purse services then group
    /// unconditionally; random and cyclic services also need equal `code >> 2`.
    #[must_use]
    pub const fn overlaps(&self, previous: ServiceCode) -> bool {
        if self.overlap_id() != previous.overlap_id() {
            return false;
        }
        self.is_purse() || self.0 >> SERVICE_TYPE_SHIFT == previous.0 >> SERVICE_TYPE_SHIFT
    }
}

impl fmt::Display for ServiceCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{:04X}", self.0)
    }
}

impl From<u16> for ServiceCode {
    fn from(code: u16) -> Self {
        Self(code)
    }
}

impl std::str::FromStr for ServiceCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_hex_u16(s).map(Self)
    }
}

/// Inclusive code range `[start, end]` of one area in the card directory.
///
/// Ordering is by `start`, then `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Area {
    pub start: u16,
    pub end: u16,
}

impl Area {
    #[must_use]
    pub const fn new(start: u16, end: u16) -> Self {
        Self { start, end }
    }

    /// Number of codes covered beyond the start code.
    #[must_use]
    pub const fn span(&self) -> u32 {
        (self.end as u32).saturating_sub(self.start as u32)
    }

    #[must_use]
    pub const fn contains_code(&self, code: u16) -> bool {
        self.start <= code && code <= self.end
    }

    #[must_use]
    pub const fn contains(&self, other: &Area) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Containment that excludes an identical range.
    #[must_use]
    pub fn properly_contains(&self, other: &Area) -> bool {
        self.contains(other) && self != other
    }

    /// Sort key for "most specific first": smallest span, then start, then end.
    #[must_use]
    pub const fn specificity(&self) -> (u32, u16, u16) {
        (self.span(), self.start, self.end)
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{:04X}--0x{:04X}", self.start, self.end)
    }
}

/// Overlapping variants of one logical service, in discovery order.
///
/// A group is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<ServiceCode>", into = "Vec<ServiceCode>")]
pub struct ServiceGroup(Vec<ServiceCode>);

impl ServiceGroup {
    /// Create a group from its members.
    ///
    /// # Errors
    /// Returns `Error::EmptyServiceGroup` if `members` is empty.
    pub fn new(members: Vec<ServiceCode>) -> Result<Self> {
        if members.is_empty() {
            return Err(Error::EmptyServiceGroup);
        }
        Ok(Self(members))
    }

    #[must_use]
    pub fn single(code: ServiceCode) -> Self {
        Self(vec![code])
    }

    pub fn push(&mut self, code: ServiceCode) {
        self.0.push(code);
    }

    #[must_use]
    pub fn members(&self) -> &[ServiceCode] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ServiceCode> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `false`: a group has at least one member.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn first(&self) -> ServiceCode {
        self.0[0]
    }

    #[must_use]
    pub fn last(&self) -> ServiceCode {
        self.0[self.0.len() - 1]
    }

    /// Lowest member code; the sort key for results.
    #[must_use]
    pub fn primary(&self) -> ServiceCode {
        self.0.iter().copied().min().unwrap_or(self.0[0])
    }

    /// True if at least one member can be read without authentication.
    #[must_use]
    pub fn has_no_auth_member(&self) -> bool {
        self.0.iter().any(|code| !code.requires_authentication())
    }
}

impl fmt::Display for ServiceGroup {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, code) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " & ")?;
            }
            write!(f, "{code}")?;
        }
        Ok(())
    }
}

impl TryFrom<Vec<ServiceCode>> for ServiceGroup {
    type Error = Error;

    fn try_from(members: Vec<ServiceCode>) -> Result<Self> {
        Self::new(members)
    }
}

impl From<ServiceGroup> for Vec<ServiceCode> {
    fn from(group: ServiceGroup) -> Self {
        group.0
    }
}

impl<'a> IntoIterator for &'a ServiceGroup {
    type Item = &'a ServiceCode;
    type IntoIter = std::slice::Iter<'a, ServiceCode>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("FFFF", 0xFFFF)]
    #[case("0x0003", 0x0003)]
    #[case(" 8008 ", 0x8008)]
    #[case("0Xfe00", 0xFE00)]
    fn test_parse_hex_valid(#[case] input: &str, #[case] expected: u16) {
        assert_eq!(parse_hex_u16(input).unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("0x")]
    #[case("XYZ")]
    #[case("10000")]
    fn test_parse_hex_invalid(#[case] input: &str) {
        assert!(matches!(parse_hex_u16(input), Err(Error::InvalidHex(_))));
    }

    #[rstest]
    #[case(0x0008, true)]
    #[case(0x000B, false)]
    #[case(0x1008, true)]
    #[case(0xFFFF, false)]
    fn test_requires_authentication(#[case] code: u16, #[case] expected: bool) {
        assert_eq!(ServiceCode::new(code).requires_authentication(), expected);
    }

    #[rstest]
    #[case(0x0009, ServiceKind::Random, "write w/o key")]
    #[case(0x000B, ServiceKind::Random, "read w/o key")]
    #[case(0x090F, ServiceKind::Cyclic, "read w/o key")]
    #[case(0x0010, ServiceKind::Purse, "direct with key")]
    #[case(0x0017, ServiceKind::Purse, "read w/o key")]
    #[case(0x0000, ServiceKind::Unknown, "unknown")]
    fn test_service_kind_and_access(
        #[case] code: u16,
        #[case] kind: ServiceKind,
        #[case] access: &str,
    ) {
        let code = ServiceCode::new(code);
        assert_eq!(code.kind(), kind);
        assert_eq!(code.access_type(), access);
    }

    #[test]
    fn test_service_number_and_attribute() {
        let code = ServiceCode::new(0x090F);
        assert_eq!(code.number(), 0x24);
        assert_eq!(code.attribute(), 0x0F);
        assert_eq!(code.overlap_id(), 0x090);
    }

    #[rstest]
    #[case(0x0101, 0x0100, true)] // random pair
    #[case(0x0108, 0x0101, false)] // different >> 2
    #[case(0x0117, 0x0110, true)] // purse variants
    #[case(0x0200, 0x0100, false)] // different service
    fn test_overlaps(#[case] code: u16, #[case] previous: u16, #[case] expected: bool) {
        assert_eq!(
            ServiceCode::new(code).overlaps(ServiceCode::new(previous)),
            expected
        );
    }

    #[test]
    fn test_area_containment() {
        let outer = Area::new(0x0000, 0x00FF);
        let inner = Area::new(0x0010, 0x0020);

        assert!(outer.contains(&inner));
        assert!(outer.properly_contains(&inner));
        assert!(!inner.contains(&outer));
        assert!(outer.contains(&outer));
        assert!(!outer.properly_contains(&outer));
        assert!(inner.contains_code(0x0010));
        assert!(inner.contains_code(0x0020));
        assert!(!inner.contains_code(0x0021));
        assert_eq!(inner.span(), 0x10);
        assert_eq!(outer.to_string(), "0x0000--0x00FF");
    }

    #[test]
    fn test_service_group() {
        let mut group = ServiceGroup::single(ServiceCode::new(0x1008));
        group.push(ServiceCode::new(0x100B));
        group.push(ServiceCode::new(0x1009));

        assert_eq!(group.len(), 3);
        assert_eq!(group.first(), ServiceCode::new(0x1008));
        assert_eq!(group.last(), ServiceCode::new(0x1009));
        assert_eq!(group.primary(), ServiceCode::new(0x1008));
        assert!(group.has_no_auth_member());
        assert!(!group.is_empty());
        assert_eq!(group.to_string(), "0x1008 & 0x100B & 0x1009");

        let reversed: Vec<u16> = group.iter().rev().map(|code| code.as_u16()).collect();
        assert_eq!(reversed, vec![0x1009, 0x100B, 0x1008]);
    }

    #[test]
    fn test_service_group_rejects_empty() {
        assert_eq!(ServiceGroup::new(Vec::new()), Err(Error::EmptyServiceGroup));

        let parsed: std::result::Result<ServiceGroup, _> = serde_json::from_str("[]");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_system_code_parse_display() {
        let code: SystemCode = "0003".parse().unwrap();
        assert_eq!(code.as_u16(), 3);
        assert_eq!(code.to_string(), "0x0003");
    }
}
