//! RouterOS version extraction.
//!
//! Versions are folded to `major + minor / 100` and held exactly as integer
//! hundredths. This is an approximation: a minor of three or more digits
//! (`7.100`) spills into the major component and orders wrongly. RouterOS has
//! never shipped such a minor, so this is not a general version comparator.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static MAJOR_MINOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\.(\d+)").expect("version pattern is valid"));

/// `major * 100 + minor`. Zero means "no version found".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionNumber(u32);

impl VersionNumber {
    pub const UNKNOWN: VersionNumber = VersionNumber(0);

    pub const fn new(major: u32, minor: u32) -> Self {
        VersionNumber(major * 100 + minor)
    }

    pub fn hundredths(self) -> u32 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.0 / 100) + f64::from(self.0 % 100) / 100.0
    }

    pub fn is_unknown(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for VersionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// First `major.minor` pair anywhere in `text`, e.g. `"RouterOS v7.21.3"` → 7.21.
pub fn parse_version(text: &str) -> VersionNumber {
    let Some(caps) = MAJOR_MINOR.captures(text) else {
        return VersionNumber::UNKNOWN;
    };
    let (Ok(major), Ok(minor)) = (caps[1].parse::<u32>(), caps[2].parse::<u32>()) else {
        return VersionNumber::UNKNOWN;
    };
    major
        .checked_mul(100)
        .and_then(|m| m.checked_add(minor))
        .map(VersionNumber)
        .unwrap_or(VersionNumber::UNKNOWN)
}
