//! External transaction reference numbers.
//!
//! A reference number is the identifier clients see and the key they retry
//! with. Generated references are a fixed tag followed by 64 random bits in
//! hex. The generator alone does not guarantee uniqueness: the journal
//! enforces it with a unique constraint.

use std::fmt;

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Tag prepended to every generated reference.
pub const REFERENCE_PREFIX: &str = "TRX";

const MAX_REFERENCE_LEN: usize = 64;
const RANDOM_HEX_LEN: usize = 16;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceNumber(String);

impl ReferenceNumber {
    /// Validates a client-supplied reference.
    ///
    /// Accepted: 1 to 64 ASCII alphanumerics, `-` or `_`.
    pub fn parse(raw: &str) -> Result<Self, EngineError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(EngineError::InvalidReference(
                "reference number must not be empty".to_string(),
            ));
        }
        if trimmed.len() > MAX_REFERENCE_LEN {
            return Err(EngineError::InvalidReference(format!(
                "reference number longer than {MAX_REFERENCE_LEN} characters"
            )));
        }
        if !trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(EngineError::InvalidReference(
                "reference number contains invalid characters".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn from_stored(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for ReferenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Produces fresh reference numbers.
#[derive(Clone, Debug)]
pub struct ReferenceGenerator {
    prefix: String,
}

impl Default for ReferenceGenerator {
    fn default() -> Self {
        Self {
            prefix: REFERENCE_PREFIX.to_string(),
        }
    }
}

impl ReferenceGenerator {
    /// A generator with a custom tag. The tag must itself be a valid
    /// reference, short enough to leave room for the random part.
    pub fn with_prefix(prefix: &str) -> Result<Self, EngineError> {
        let prefix = ReferenceNumber::parse(prefix)?.0;
        if prefix.len() + RANDOM_HEX_LEN > MAX_REFERENCE_LEN {
            return Err(EngineError::InvalidReference(format!(
                "reference prefix longer than {} characters",
                MAX_REFERENCE_LEN - RANDOM_HEX_LEN
            )));
        }
        Ok(Self { prefix })
    }

    #[must_use]
    pub fn next_reference(&self) -> ReferenceNumber {
        let mut random = [0u8; 8];
        rand::rng().fill_bytes(&mut random);
        ReferenceNumber(format!("{}{}", self.prefix, hex::encode(random)))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn generated_reference_has_prefix_and_64_bits() {
        let reference = ReferenceGenerator::default().next_reference();
        let raw = reference.as_str();
        assert!(raw.starts_with("TRX"));
        let hex = &raw[3..];
        assert_eq!(hex.len(), RANDOM_HEX_LEN);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generated_references_do_not_repeat() {
        let generator = ReferenceGenerator::default();
        let seen: HashSet<ReferenceNumber> =
            (0..10_000).map(|_| generator.next_reference()).collect();
        assert_eq!(seen.len(), 10_000);
    }

    #[test]
    fn generated_references_are_valid_client_references() {
        let reference = ReferenceGenerator::with_prefix("TOP")
            .unwrap()
            .next_reference();
        assert!(reference.as_str().starts_with("TOP"));
        assert_eq!(ReferenceNumber::parse(reference.as_str()).unwrap(), reference);
    }

    #[test]
    fn unusable_prefixes_are_rejected() {
        assert!(ReferenceGenerator::with_prefix("has space").is_err());
        assert!(ReferenceGenerator::with_prefix("").is_err());
        assert!(ReferenceGenerator::with_prefix(&"P".repeat(49)).is_err());
        assert!(ReferenceGenerator::with_prefix(&"P".repeat(48)).is_ok());
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!(ReferenceNumber::parse("").is_err());
        assert!(ReferenceNumber::parse("   ").is_err());
        assert!(ReferenceNumber::parse("has space").is_err());
        assert!(ReferenceNumber::parse(&"x".repeat(65)).is_err());
        assert_eq!(
            ReferenceNumber::parse(" retry-42_a ").unwrap().as_str(),
            "retry-42_a"
        );
    }
}
