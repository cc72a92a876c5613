//! LocaleCode: a validated two-letter locale identifier.

use crate::error::LocaleError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A two-letter, lower-case locale code (e.g., "en", "fr").
///
/// Construction always goes through [`LocaleCode::parse`], which trims and
/// lower-cases its input, so two codes compare equal exactly when they name
/// the same locale.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LocaleCode(String);

impl LocaleCode {
    /// Parse and sanitize a raw locale string.
    ///
    /// # Returns
    /// * `Ok(LocaleCode)` for exactly two ASCII letters (any case, surrounding whitespace ignored)
    /// * `Err(LocaleError::Invalid)` otherwise
    pub fn parse(raw: &str) -> Result<Self, LocaleError> {
        let code = raw.trim().to_ascii_lowercase();
        if code.len() == 2 && code.bytes().all(|b| b.is_ascii_lowercase()) {
            Ok(Self(code))
        } else {
            Err(LocaleError::Invalid(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocaleCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for LocaleCode {
    type Err = LocaleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for LocaleCode {
    type Error = LocaleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<LocaleCode> for String {
    fn from(code: LocaleCode) -> Self {
        code.0
    }
}

impl PartialEq<str> for LocaleCode {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for LocaleCode {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
