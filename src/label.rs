//! Hierarchical label paths (`経理/処理済み`, `Invoices/Done`).
//!
//! A label marks a message as processed so later runs skip it. Labels nest
//! with `/` as the separator, the way Gmail displays them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ArchiveError, Result};

/// Maximum total label length accepted by Gmail.
pub const MAX_LABEL_LEN: usize = 225;

/// Separator between label hierarchy levels.
pub const SEPARATOR: char = '/';

/// A syntactically valid label path.
///
/// Constructed only through [`LabelPath::parse`], so holding one means the
/// value has already been checked.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LabelPath(String);

impl LabelPath {
    /// Validate a raw label string.
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = |reason: &str| ArchiveError::InvalidLabel {
            label: raw.to_string(),
            reason: reason.to_string(),
        };

        if raw.is_empty() {
            return Err(invalid("must not be empty"));
        }
        if raw.chars().count() > MAX_LABEL_LEN {
            return Err(invalid(&format!(
                "longer than {MAX_LABEL_LEN} characters"
            )));
        }
        if raw.starts_with(SEPARATOR) || raw.ends_with(SEPARATOR) {
            return Err(invalid("must not start or end with '/'"));
        }

        for segment in raw.split(SEPARATOR) {
            if segment.is_empty() {
                return Err(invalid("contains an empty level ('//')"));
            }
            if segment.trim() != segment {
                return Err(invalid(&format!(
                    "level '{segment}' has leading or trailing whitespace"
                )));
            }
            if segment.chars().any(char::is_control) {
                return Err(invalid("contains control characters"));
            }
        }

        Ok(Self(raw.to_string()))
    }

    /// The full path as written.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Hierarchy levels from the top: `a/b/c` → `a`, `b`, `c`.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(SEPARATOR)
    }

    /// Number of hierarchy levels.
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// Every prefix path: `a/b/c` → `a`, `a/b`, `a/b/c`.
    pub fn ancestors(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self
            .0
            .match_indices(SEPARATOR)
            .map(|(i, _)| &self.0[..i])
            .collect();
        out.push(&self.0);
        out
    }

    /// Query term excluding messages with this label.
    ///
    /// Gmail's label search form spells `/` and whitespace as `-`.
    pub fn search_term(&self) -> String {
        let spelled: String = self
            .0
            .chars()
            .map(|c| {
                if c == SEPARATOR || c.is_whitespace() {
                    '-'
                } else {
                    c
                }
            })
            .collect();
        format!("-label:{spelled}")
    }

    /// Whether a label as written in an `X-Gmail-Labels` header is this one.
    pub fn matches_header_label(&self, label: &str) -> bool {
        label.trim() == self.0
    }
}

impl fmt::Display for LabelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for LabelPath {
    type Error = ArchiveError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<LabelPath> for String {
    fn from(label: LabelPath) -> Self {
        label.0
    }
}
