//! Version algebra: parse, compare, bump, and range-match semantic versions.
//!
//! Versions are plain [`semver::Version`] values. The functions here add the
//! operations the fusion pipeline needs on top of the parser:
//!
//! - [`parse_version`] - strict `MAJOR.MINOR.PATCH[-PRE][+BUILD]`, optional `v` prefix
//! - [`compare`] - SemVer precedence; build metadata never participates
//! - [`next_version`] - apply a [`BumpLevel`], optionally attaching a prerelease tag
//! - [`satisfies_range`] - `>=`, `>`, `<=`, `<`, `~`, `^`, and exact comparators
//! - [`sort_versions`], [`latest`], [`oldest`]
//!
//! Nothing in this module performs I/O.

mod range;

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use semver::{BuildMetadata, Prerelease, Version};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use range::satisfies_range;

/// Errors from version operations.
#[derive(Error, Debug)]
pub enum VersionError {
    /// Failed to parse a semver string.
    #[error("invalid semver: {0}")]
    InvalidSemver(#[from] semver::Error),

    /// A bump type outside `patch`, `minor`, `major`.
    #[error("invalid bump type {0:?} (expected patch, minor, or major)")]
    InvalidBumpType(String),

    /// A prerelease tag that is not a valid dot-separated identifier list.
    #[error("invalid prerelease tag {tag:?}: {source}")]
    InvalidPrerelease {
        /// The rejected tag.
        tag: String,
        /// Parser error.
        source: semver::Error,
    },

    /// The bumped component would exceed `u64::MAX`.
    #[error("cannot bump {version} by {level}: {component} version would overflow")]
    Overflow {
        /// The version that was being bumped.
        version: Version,
        /// The requested bump.
        level: BumpLevel,
        /// Which component overflowed.
        component: &'static str,
    },

    /// A range expression that could not be parsed.
    #[error("invalid range expression {expr:?}: {reason}")]
    InvalidRange {
        /// The offending expression (or comparator within it).
        expr: String,
        /// What was wrong with it.
        reason: String,
    },
}

/// Result alias for version operations.
pub type VersionResult<T> = Result<T, VersionError>;

/// Semver bump level.
///
/// Ordered `Patch < Minor < Major`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum BumpLevel {
    /// Patch release (x.y.Z).
    Patch,
    /// Minor release (x.Y.0).
    Minor,
    /// Major release (X.0.0).
    Major,
}

impl BumpLevel {
    /// Ordinal used by fusion scoring: patch = 1, minor = 2, major = 3.
    pub const fn ordinal(self) -> u8 {
        match self {
            Self::Patch => 1,
            Self::Minor => 2,
            Self::Major => 3,
        }
    }

    /// Lowercase name of the level.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Patch => "patch",
            Self::Minor => "minor",
            Self::Major => "major",
        }
    }
}

impl fmt::Display for BumpLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BumpLevel {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "patch" => Ok(Self::Patch),
            "minor" => Ok(Self::Minor),
            "major" => Ok(Self::Major),
            _ => Err(VersionError::InvalidBumpType(s.to_string())),
        }
    }
}

/// Parse a version string, stripping an optional `v` prefix.
pub fn parse_version(s: &str) -> VersionResult<Version> {
    let s = s.trim();
    let s = s.strip_prefix('v').unwrap_or(s);
    Ok(Version::parse(s)?)
}

/// Compare two versions by SemVer precedence.
///
/// Core triples compare numerically. With equal triples, a release is
/// greater than any of its prereleases, and two prereleases compare
/// identifier by identifier. Build metadata is ignored, so `1.0.0+a` and
/// `1.0.0+b` compare equal.
pub fn compare(a: &Version, b: &Version) -> Ordering {
    a.major
        .cmp(&b.major)
        .then(a.minor.cmp(&b.minor))
        .then(a.patch.cmp(&b.patch))
        .then_with(|| match (a.pre.is_empty(), b.pre.is_empty()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => compare_prerelease(a.pre.as_str(), b.pre.as_str()),
        })
}

/// Compare two non-empty prerelease strings identifier by identifier.
fn compare_prerelease(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            // A shorter sequence that is a prefix of the longer one sorts first
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = compare_identifier(x, y);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

fn compare_identifier(a: &str, b: &str) -> Ordering {
    let a_numeric = is_numeric(a);
    let b_numeric = is_numeric(b);
    match (a_numeric, b_numeric) {
        // No leading zeros, so a longer digit string is the larger number.
        // Comparing by length first also avoids overflow on huge identifiers.
        (true, true) => a.len().cmp(&b.len()).then_with(|| a.cmp(b)),
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.cmp(b),
    }
}

fn is_numeric(identifier: &str) -> bool {
    !identifier.is_empty() && identifier.bytes().all(|b| b.is_ascii_digit())
}

/// Compute the next version by applying a bump level.
///
/// Prerelease and build metadata are always cleared. When `prerelease` is
/// given it is attached to the bumped version, e.g. `1.2.3` + minor +
/// `rc.1` gives `1.3.0-rc.1`. A component already at `u64::MAX` cannot be
/// bumped and returns [`VersionError::Overflow`].
pub fn next_version(
    current: &Version,
    level: BumpLevel,
    prerelease: Option<&str>,
) -> VersionResult<Version> {
    let overflow = |component| VersionError::Overflow {
        version: current.clone(),
        level,
        component,
    };
    let mut next = match level {
        BumpLevel::Patch => {
            let patch = current.patch.checked_add(1).ok_or_else(|| overflow("patch"))?;
            Version::new(current.major, current.minor, patch)
        }
        BumpLevel::Minor => {
            let minor = current.minor.checked_add(1).ok_or_else(|| overflow("minor"))?;
            Version::new(current.major, minor, 0)
        }
        BumpLevel::Major => {
            let major = current.major.checked_add(1).ok_or_else(|| overflow("major"))?;
            Version::new(major, 0, 0)
        }
    };

    if let Some(tag) = prerelease {
        next.pre = Prerelease::new(tag).map_err(|source| VersionError::InvalidPrerelease {
            tag: tag.to_string(),
            source,
        })?;
    }
    next.build = BuildMetadata::EMPTY;

    Ok(next)
}

/// Sort versions by precedence, ascending or descending.
///
/// The sort is stable, so versions differing only in build metadata keep
/// their input order.
pub fn sort_versions(mut versions: Vec<Version>, ascending: bool) -> Vec<Version> {
    if ascending {
        versions.sort_by(compare);
    } else {
        versions.sort_by(|a, b| compare(b, a));
    }
    versions
}

/// The highest-precedence version, if any.
pub fn latest(versions: &[Version]) -> Option<&Version> {
    versions
        .iter()
        .reduce(|best, v| if compare(v, best).is_gt() { v } else { best })
}

/// The lowest-precedence version, if any.
pub fn oldest(versions: &[Version]) -> Option<&Version> {
    versions
        .iter()
        .reduce(|best, v| if compare(v, best).is_lt() { v } else { best })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        parse_version(s).unwrap()
    }

    #[test]
    fn bump_table() {
        let base = v("1.2.3");
        assert_eq!(next_version(&base, BumpLevel::Patch, None).unwrap(), v("1.2.4"));
        assert_eq!(next_version(&base, BumpLevel::Minor, None).unwrap(), v("1.3.0"));
        assert_eq!(next_version(&base, BumpLevel::Major, None).unwrap(), v("2.0.0"));
    }

    #[test]
    fn bump_clears_prerelease_and_build() {
        assert_eq!(
            next_version(&v("1.2.3-beta.1"), BumpLevel::Patch, None).unwrap(),
            v("1.2.4")
        );
        let bumped = next_version(&v("1.2.3+sha.abc"), BumpLevel::Minor, None).unwrap();
        assert!(bumped.build.is_empty());
    }

    #[test]
    fn bump_at_component_limit_is_an_error() {
        let max = u64::MAX;
        let top = Version::new(max, max, max);
        for level in [BumpLevel::Patch, BumpLevel::Minor, BumpLevel::Major] {
            assert!(
                matches!(
                    next_version(&top, level, None),
                    Err(VersionError::Overflow { .. })
                ),
                "{level} bump of {top} should overflow"
            );
        }

        // Only the bumped component matters
        let next = next_version(&Version::new(1, 2, max), BumpLevel::Minor, None).unwrap();
        assert_eq!(next, Version::new(1, 3, 0));
        let next = next_version(&Version::new(1, max, max), BumpLevel::Major, None).unwrap();
        assert_eq!(next, Version::new(2, 0, 0));
    }

    #[test]
    fn bump_with_prerelease_tag() {
        let next = next_version(&v("1.2.3"), BumpLevel::Minor, Some("rc.1")).unwrap();
        assert_eq!(next.to_string(), "1.3.0-rc.1");
    }

    #[test]
    fn bump_rejects_bad_prerelease_tag() {
        let err = next_version(&v("1.2.3"), BumpLevel::Patch, Some("bad..tag")).unwrap_err();
        assert!(matches!(err, VersionError::InvalidPrerelease { .. }));
    }

    #[test]
    fn bump_from_zero() {
        let base = Version::new(0, 1, 0);
        assert_eq!(next_version(&base, BumpLevel::Patch, None).unwrap(), v("0.1.1"));
        assert_eq!(next_version(&base, BumpLevel::Minor, None).unwrap(), v("0.2.0"));
        assert_eq!(next_version(&base, BumpLevel::Major, None).unwrap(), v("1.0.0"));
    }

    #[test]
    fn bump_is_monotonic() {
        for s in ["0.0.0", "1.2.3", "1.2.3-alpha", "9.9.9-rc.1+build"] {
            let base = v(s);
            for level in [BumpLevel::Patch, BumpLevel::Minor, BumpLevel::Major] {
                let next = next_version(&base, level, None).unwrap();
                assert_eq!(compare(&next, &base), Ordering::Greater, "{s} {level}");
            }
        }
    }

    #[test]
    fn bump_level_from_str() {
        assert_eq!("minor".parse::<BumpLevel>().unwrap(), BumpLevel::Minor);
        assert_eq!(" MAJOR ".parse::<BumpLevel>().unwrap(), BumpLevel::Major);
        assert!(matches!(
            "huge".parse::<BumpLevel>(),
            Err(VersionError::InvalidBumpType(_))
        ));
    }

    #[test]
    fn bump_level_ordering() {
        assert!(BumpLevel::Patch < BumpLevel::Minor);
        assert!(BumpLevel::Minor < BumpLevel::Major);
        assert_eq!(BumpLevel::Major.ordinal(), 3);
    }

    #[test]
    fn parse_with_v_prefix() {
        assert_eq!(v("v1.2.3"), Version::new(1, 2, 3));
    }

    #[test]
    fn parse_rejects_malformed() {
        for bad in ["", "1", "1.2", "01.2.3", "1.02.3", "1.2.3-", "1.2.3-a..b", "a.b.c", "1.2.3.4"] {
            assert!(parse_version(bad).is_err(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn parse_round_trip() {
        for s in ["0.0.0", "1.2.3", "1.0.0-alpha.1", "10.20.30-rc.1.x-y"] {
            assert_eq!(v(s).to_string(), s);
        }
    }

    #[test]
    fn prerelease_ordering() {
        assert_eq!(compare(&v("1.0.0-alpha"), &v("1.0.0")), Ordering::Less);
        assert_eq!(compare(&v("1.0.0-alpha"), &v("1.0.0-alpha.1")), Ordering::Less);
        assert_eq!(compare(&v("1.0.0-alpha.1"), &v("1.0.0-beta")), Ordering::Less);
    }

    #[test]
    fn semver_spec_precedence_chain() {
        let chain = [
            "1.0.0-alpha",
            "1.0.0-alpha.1",
            "1.0.0-alpha.beta",
            "1.0.0-beta",
            "1.0.0-beta.2",
            "1.0.0-beta.11",
            "1.0.0-rc.1",
            "1.0.0",
            "1.0.1",
            "1.1.0",
            "2.0.0",
        ];
        for pair in chain.windows(2) {
            assert_eq!(compare(&v(pair[0]), &v(pair[1])), Ordering::Less, "{pair:?}");
            assert_eq!(compare(&v(pair[1]), &v(pair[0])), Ordering::Greater, "{pair:?}");
        }
        // transitivity across the whole chain
        for (i, a) in chain.iter().enumerate() {
            for b in &chain[i + 1..] {
                assert_eq!(compare(&v(a), &v(b)), Ordering::Less);
            }
            assert_eq!(compare(&v(a), &v(a)), Ordering::Equal);
        }
    }

    #[test]
    fn build_metadata_ignored() {
        assert_eq!(compare(&v("1.0.0+a"), &v("1.0.0+b")), Ordering::Equal);
        assert_eq!(compare(&v("1.0.0-rc.1+x"), &v("1.0.0-rc.1")), Ordering::Equal);
    }

    #[test]
    fn huge_numeric_identifiers_compare_numerically() {
        assert_eq!(
            compare(&v("1.0.0-99999999999999999999999"), &v("1.0.0-100000000000000000000000")),
            Ordering::Less
        );
    }

    #[test]
    fn sort_and_extremes() {
        let versions = vec![v("1.0.0"), v("0.9.0"), v("1.0.0-rc.1"), v("2.0.0")];
        let asc = sort_versions(versions.clone(), true);
        assert_eq!(asc, vec![v("0.9.0"), v("1.0.0-rc.1"), v("1.0.0"), v("2.0.0")]);
        let desc = sort_versions(versions.clone(), false);
        assert_eq!(desc.first(), Some(&v("2.0.0")));
        assert_eq!(latest(&versions), Some(&v("2.0.0")));
        assert_eq!(oldest(&versions), Some(&v("0.9.0")));
        assert_eq!(latest(&[]), None);
    }
}
