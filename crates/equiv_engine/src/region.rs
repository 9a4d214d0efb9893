//! Notation-convention profiles that gate which rules may fire.

use serde::{Deserialize, Serialize};
use std::ops::BitOr;

/// Notation profile active for one check.
///
/// `Continental` covers the conventions common in continental European
/// schooling: `tg`, `ctg`, `cosec`, `arctg` as function names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Region {
    #[default]
    Standard,
    Continental,
}

impl Region {
    pub fn all() -> &'static [Region] {
        &[Region::Standard, Region::Continental]
    }

    fn bit(self) -> u8 {
        match self {
            Region::Standard => 0b01,
            Region::Continental => 0b10,
        }
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Region::Standard => write!(f, "standard"),
            Region::Continental => write!(f, "continental"),
        }
    }
}

impl std::str::FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "standard" => Ok(Region::Standard),
            "continental" => Ok(Region::Continental),
            other => Err(format!("unknown region '{}'", other)),
        }
    }
}

/// Set of regions a rule is eligible in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegionSet(u8);

impl RegionSet {
    pub const STANDARD: RegionSet = RegionSet(0b01);
    pub const CONTINENTAL: RegionSet = RegionSet(0b10);
    pub const ALL: RegionSet = RegionSet(0b11);

    #[inline]
    pub fn contains(self, region: Region) -> bool {
        self.0 & region.bit() != 0
    }
}

impl BitOr for RegionSet {
    type Output = RegionSet;

    fn bitor(self, rhs: RegionSet) -> RegionSet {
        RegionSet(self.0 | rhs.0)
    }
}

impl std::fmt::Display for RegionSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = Region::all()
            .iter()
            .filter(|r| self.contains(**r))
            .map(|r| r.to_string())
            .collect();
        write!(f, "{}", names.join("|"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_set_membership() {
        assert!(RegionSet::ALL.contains(Region::Standard));
        assert!(RegionSet::ALL.contains(Region::Continental));
        assert!(!RegionSet::CONTINENTAL.contains(Region::Standard));
        assert_eq!(RegionSet::STANDARD | RegionSet::CONTINENTAL, RegionSet::ALL);
    }

    #[test]
    fn test_region_parse_and_display() {
        assert_eq!("Continental".parse::<Region>(), Ok(Region::Continental));
        assert!("martian".parse::<Region>().is_err());
        assert_eq!(RegionSet::ALL.to_string(), "standard|continental");
    }
}
