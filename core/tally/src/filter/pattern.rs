//! Wildcard patterns for measurement names and tag values.

use std::str::FromStr;

use thiserror::Error;

/// A pattern that matches a name (String).
///
/// Name patterns are a very simplified form of glob: the only special character is `*`,
/// which matches any sequence of characters (including the empty one). Matching is
/// case-sensitive and there is no escape syntax.
///
/// | pattern      | matches                                   |
/// |--------------|-------------------------------------------|
/// | `cpu`        | exactly `cpu`                             |
/// | `*`          | anything                                  |
/// | `cpu*`       | names that begin with `cpu`               |
/// | `*_total`    | names that end with `_total`              |
/// | `disk_*_ops` | `disk_` ... `_ops`, in that order         |
/// | `*io*`       | names that contain `io`                   |
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StringPattern {
    Exact(String),
    StartWith(String),
    EndWith(String),
    /// Literal parts separated by wildcards.
    ///
    /// The first part is anchored to the start of the name if `anchored_start` is true,
    /// the last part is anchored to the end if `anchored_end` is true.
    Segments {
        parts: Vec<String>,
        anchored_start: bool,
        anchored_end: bool,
    },
    Any,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatternParseError {
    #[error("invalid pattern: the string is empty")]
    Empty,
}

impl StringPattern {
    pub fn matches(&self, name: &str) -> bool {
        match self {
            StringPattern::Exact(pat) => pat == name,
            StringPattern::StartWith(pat) => name.starts_with(pat),
            StringPattern::EndWith(pat) => name.ends_with(pat),
            StringPattern::Segments {
                parts,
                anchored_start,
                anchored_end,
            } => match_segments(parts, *anchored_start, *anchored_end, name),
            StringPattern::Any => true,
        }
    }
}

/// Leftmost matching of the literal parts is enough here, because `*` is the
/// only metacharacter.
fn match_segments(parts: &[String], anchored_start: bool, anchored_end: bool, name: &str) -> bool {
    let mut rest = name;
    let last = parts.len().saturating_sub(1);
    for (i, part) in parts.iter().enumerate() {
        if i == 0 && anchored_start {
            match rest.strip_prefix(part.as_str()) {
                Some(r) => rest = r,
                None => return false,
            }
        } else if i == last && anchored_end {
            return rest.ends_with(part.as_str());
        } else {
            match rest.find(part.as_str()) {
                Some(pos) => rest = &rest[pos + part.len()..],
                None => return false,
            }
        }
    }
    !anchored_end || rest.is_empty()
}

impl FromStr for StringPattern {
    type Err = PatternParseError;

    /// Parses a `StringPattern`.
    ///
    /// Surrounding whitespace is ignored. Consecutive wildcards are equivalent to a single one.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PatternParseError::Empty);
        }
        if !s.contains('*') {
            return Ok(StringPattern::Exact(s.to_owned()));
        }

        let anchored_start = !s.starts_with('*');
        let anchored_end = !s.ends_with('*');
        let mut parts: Vec<String> = s.split('*').filter(|p| !p.is_empty()).map(str::to_owned).collect();

        let pattern = match (parts.len(), anchored_start, anchored_end) {
            (0, _, _) => StringPattern::Any,
            (1, true, false) => StringPattern::StartWith(parts.remove(0)),
            (1, false, true) => StringPattern::EndWith(parts.remove(0)),
            _ => StringPattern::Segments {
                parts,
                anchored_start,
                anchored_end,
            },
        };
        Ok(pattern)
    }
}
