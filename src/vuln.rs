use serde::{Serialize, Serializer};
use std::fmt;
use std::ops::{BitAnd, BitOr};
use std::str::FromStr;

use crate::error::ParseVulnError;

/// Set of CVE flags, either attributed to an artifact or requested by a scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Vulnerabilities(u8);

impl Vulnerabilities {
    pub const NONE: Self = Self(0);

    // log4j 1.x
    pub const CVE_2019_17571: Self = Self(1 << 0);
    pub const CVE_2022_23307: Self = Self(1 << 1);
    // log4j 2.x
    pub const CVE_2021_44228: Self = Self(1 << 2);
    pub const CVE_2021_45105: Self = Self(1 << 3);
    pub const CVE_2021_45046: Self = Self(1 << 4);
    pub const CVE_2021_44832: Self = Self(1 << 5);

    pub const V1: Self = Self::CVE_2019_17571.union(Self::CVE_2022_23307);
    pub const DEFAULT: Self = Self::V1
        .union(Self::CVE_2021_44228)
        .union(Self::CVE_2021_45046);
    pub const ALL: Self = Self(0xff);

    const NAMED: [(Self, &'static str); 6] = [
        (Self::CVE_2019_17571, "CVE-2019-17571"),
        (Self::CVE_2022_23307, "CVE-2022-23307"),
        (Self::CVE_2021_44228, "CVE-2021-44228"),
        (Self::CVE_2021_45105, "CVE-2021-45105"),
        (Self::CVE_2021_45046, "CVE-2021-45046"),
        (Self::CVE_2021_44832, "CVE-2021-44832"),
    ];

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn contains_any(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// CVE identifiers present in the set, in flag order.
    pub fn tags(self) -> impl Iterator<Item = &'static str> {
        Self::NAMED
            .into_iter()
            .filter(move |(flag, _)| self.contains_any(*flag))
            .map(|(_, tag)| tag)
    }
}

impl BitOr for Vulnerabilities {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitAnd for Vulnerabilities {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Display for Vulnerabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tags: Vec<&str> = self.tags().collect();
        f.write_str(&tags.join(", "))
    }
}

impl FromStr for Vulnerabilities {
    type Err = ParseVulnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut set = Self::NONE;
        for tag in s.split(',').map(str::trim) {
            if tag.is_empty() {
                continue;
            }
            if tag.eq_ignore_ascii_case("default") {
                set = set | Self::DEFAULT;
                continue;
            }
            if tag.eq_ignore_ascii_case("all") {
                set = set | Self::ALL;
                continue;
            }
            let flag = Self::NAMED
                .iter()
                .find(|(_, name)| name.eq_ignore_ascii_case(tag))
                .map(|(flag, _)| *flag)
                .ok_or_else(|| ParseVulnError::InvalidVulnerability(tag.to_string()))?;
            set = set | flag;
        }
        Ok(set)
    }
}

impl Serialize for Vulnerabilities {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.tags())
    }
}
