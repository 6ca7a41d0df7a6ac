//! Range expressions.
//!
//! A range is one or more comparator sets separated by `||`; a version
//! satisfies the range if it satisfies every comparator of any set.
//! Comparators within a set are separated by whitespace.
//!
//! | Comparator | Meaning                          |
//! |------------|----------------------------------|
//! | `1.2.3`    | exactly `1.2.3` (also `=1.2.3`)  |
//! | `>=1.2.3`  | at least `1.2.3`                 |
//! | `>1.2.3`   | greater than `1.2.3`             |
//! | `<=1.2.3`  | at most `1.2.3`                  |
//! | `<1.2.3`   | less than `1.2.3`                |
//! | `~1.2.3`   | `>=1.2.3 <1.3.0`                 |
//! | `^1.2.3`   | `>=1.2.3 <2.0.0`                 |
//! | `*`        | any version                      |
//!
//! All comparisons use [`compare`](super::compare), so prereleases are
//! ordered by precedence like any other version.

use semver::Version;

use super::{VersionError, VersionResult, compare, parse_version};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Exact,
    Greater,
    GreaterEq,
    Less,
    LessEq,
    Tilde,
    Caret,
}

#[derive(Debug)]
struct Comparator {
    op: Op,
    version: Version,
}

impl Comparator {
    fn parse(token: &str) -> VersionResult<Self> {
        // Two-character operators must be checked before their one-character prefixes
        let (op, rest) = [
            (">=", Op::GreaterEq),
            ("<=", Op::LessEq),
            (">", Op::Greater),
            ("<", Op::Less),
            ("~", Op::Tilde),
            ("^", Op::Caret),
            ("=", Op::Exact),
        ]
        .into_iter()
        .find_map(|(prefix, op)| token.strip_prefix(prefix).map(|rest| (op, rest)))
        .unwrap_or((Op::Exact, token));

        let version = parse_version(rest).map_err(|e| VersionError::InvalidRange {
            expr: token.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self { op, version })
    }

    fn matches(&self, candidate: &Version) -> bool {
        let ord = compare(candidate, &self.version);
        match self.op {
            Op::Exact => ord.is_eq(),
            Op::Greater => ord.is_gt(),
            Op::GreaterEq => ord.is_ge(),
            Op::Less => ord.is_lt(),
            Op::LessEq => ord.is_le(),
            Op::Tilde | Op::Caret => ord.is_ge() && self.below_upper_bound(candidate),
        }
    }

    /// Exclusive upper limit of `~`/`^`, computed without overflowing.
    fn below_upper_bound(&self, candidate: &Version) -> bool {
        let base = &self.version;
        match self.op {
            Op::Tilde => match base.minor.checked_add(1) {
                Some(minor) => compare(candidate, &Version::new(base.major, minor, 0)).is_lt(),
                // `<X.(u64::MAX + 1).0` admits every version of major X
                None => candidate.major <= base.major,
            },
            // No version lies beyond major `u64::MAX`
            _ => base
                .major
                .checked_add(1)
                .is_none_or(|major| compare(candidate, &Version::new(major, 0, 0)).is_lt()),
        }
    }
}

/// Check whether `version` satisfies the range expression `expr`.
///
/// Returns [`VersionError::InvalidRange`] for an empty expression, an empty
/// `||` alternative, or a comparator whose version does not parse.
pub fn satisfies_range(version: &Version, expr: &str) -> VersionResult<bool> {
    if expr.trim().is_empty() {
        return Err(VersionError::InvalidRange {
            expr: expr.to_string(),
            reason: "empty range".into(),
        });
    }

    let mut any = false;
    for alternative in expr.split("||") {
        let tokens = normalize_tokens(alternative);
        if tokens.is_empty() {
            return Err(VersionError::InvalidRange {
                expr: expr.to_string(),
                reason: "empty alternative".into(),
            });
        }

        let mut all = true;
        for token in &tokens {
            if token == "*" {
                continue;
            }
            // Parse every comparator even after a mismatch so that malformed
            // input is reported regardless of the version being checked.
            let comparator = Comparator::parse(token)?;
            all &= comparator.matches(version);
        }
        any |= all;
    }

    Ok(any)
}

/// Split an alternative into comparator tokens, joining operators that were
/// written apart from their version (`>= 1.2.3`).
fn normalize_tokens(alternative: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    let mut pending_op: Option<&str> = None;

    for word in alternative.split_whitespace() {
        if matches!(word, ">=" | "<=" | ">" | "<" | "~" | "^" | "=") {
            pending_op = Some(word);
            continue;
        }
        match pending_op.take() {
            Some(op) => tokens.push(format!("{op}{word}")),
            None => tokens.push(word.to_string()),
        }
    }
    if let Some(op) = pending_op {
        // Dangling operator; let the comparator parser report it
        tokens.push(op.to_string());
    }

    tokens
}
