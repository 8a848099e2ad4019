//! VAT identity parsing.
//!
//! A VAT identification string is normalized (trimmed, uppercased) and split
//! into a two-letter country code and the remaining local identifier. Input
//! that does not match the pattern is rejected before any network access.

use crate::error::{Error, Result};
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;

/// Country code followed by 2-12 alphanumerics (`+` and `*` occur in some
/// member-state formats).
const VAT_PATTERN: &str = r"^([A-Z]{2})([0-9A-Z+*]{2,12})$";

fn vat_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(VAT_PATTERN).ok()).as_ref()
}

/// The subject of a verification: a country code plus a local identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct VerificationSubject {
    country_code: String,
    local_id: String,
}

impl VerificationSubject {
    /// Parse a full VAT identification string such as `"cz12345678"`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InputValidation`] if the normalized input does not
    /// match the identity pattern.
    pub fn parse(input: &str) -> Result<Self> {
        let normalized = input.trim().to_uppercase();
        let captures = vat_regex()
            .and_then(|re| re.captures(&normalized))
            .ok_or_else(|| Error::InputValidation(format!("malformed VAT identifier: {input:?}")))?;

        Ok(Self {
            country_code: captures[1].to_string(),
            local_id: captures[2].to_string(),
        })
    }

    /// Build a subject from parts that were already split by the caller.
    ///
    /// The parts are normalized and validated exactly like [`Self::parse`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InputValidation`] if the combined identity is malformed.
    pub fn new(country_code: &str, local_id: &str) -> Result<Self> {
        let country = country_code.trim();
        if country.len() != 2 {
            return Err(Error::InputValidation(format!(
                "country code must be two letters: {country_code:?}"
            )));
        }
        Self::parse(&format!("{country}{}", local_id.trim()))
    }

    /// Two-letter country code.
    #[must_use]
    pub fn country_code(&self) -> &str {
        &self.country_code
    }

    /// Identifier without the country prefix.
    #[must_use]
    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    /// Cache key for a provider's result on this subject.
    #[must_use]
    pub fn cache_key(&self, provider: &str) -> String {
        format!("vat:{provider}:{}:{}", self.country_code, self.local_id)
    }

    /// Lock key for a provider lookup on this subject.
    ///
    /// Namespaced apart from [`Self::cache_key`] so a lock marker can never
    /// collide with a cache entry.
    #[must_use]
    pub fn lock_key(&self, provider: &str) -> String {
        format!("lock:{}", self.cache_key(provider))
    }
}

impl fmt::Display for VerificationSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.country_code, self.local_id)
    }
}
