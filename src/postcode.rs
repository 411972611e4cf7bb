//! Postal code normalization and dataset partition keys

use serde::{Deserialize, Serialize};
use std::fmt;

/// A postal code in normalized form (trimmed, upper-cased).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PostalCode(String);

impl PostalCode {
    pub fn new(raw: &str) -> Self {
        Self(normalize(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading non-numeric run, used to pick the dataset partition.
    pub fn prefix(&self) -> String {
        extract_prefix(&self.0)
    }

    /// Normalized code with internal whitespace removed.
    ///
    /// Both input codes and stored dataset codes are compared on this key, so
    /// "SW1A 1AA" and "SW1A1AA" refer to the same record.
    pub fn lookup_key(&self) -> String {
        lookup_key(&self.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for PostalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trim surrounding whitespace and upper-case.
pub fn normalize(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Accumulate characters until the first digit.
///
/// Any Unicode numeric character ends the prefix, not only ASCII `0-9`.
/// An all-numeric or empty code yields an empty prefix.
pub fn extract_prefix(code: &str) -> String {
    code.chars().take_while(|c| !c.is_numeric()).collect()
}

pub fn lookup_key(code: &str) -> String {
    normalize(code).chars().filter(|c| !c.is_whitespace()).collect()
}
