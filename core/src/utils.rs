//! General utilities, including secret redaction.

use std::fmt::Debug;

/// Redacts a string so it can be logged without leaking secrets.
///
/// - Fewer than 12 characters: entirely redacted.
/// - 12 or more characters: only the first three and last three survive.
///
/// This lets users tell different redacted values apart while keeping the
/// middle hidden.
pub struct Redact<'a>(&'a str);

impl<'a> From<&'a str> for Redact<'a> {
    fn from(value: &'a str) -> Self {
        Redact(value)
    }
}

impl<'a> From<&'a String> for Redact<'a> {
    fn from(value: &'a String) -> Self {
        Redact(value.as_str())
    }
}

impl<'a> From<&'a Option<String>> for Redact<'a> {
    fn from(value: &'a Option<String>) -> Self {
        match value {
            None => Redact(""),
            Some(v) => Redact(v),
        }
    }
}

impl Debug for Redact<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.len() {
            0 => f.write_str("EMPTY"),
            n if n < 12 => f.write_str("***"),
            n => write!(f, "{}***{}", &self.0[..3], &self.0[n - 3..]),
        }
    }
}
