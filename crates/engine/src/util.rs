//! Internal helpers for input validation.
//!
//! These utilities are **not** part of the public API. They centralize
//! normalization so every operation enforces the same rules.

use crate::{EngineError, Money, ReferenceNumber, ResultEngine};

/// Trim `value` and reject it when empty.
pub(crate) fn normalize_required(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidAmount(format!(
            "{label} must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

/// Trim optional text, mapping blank input to `None`.
pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Movement amounts must be strictly positive.
pub(crate) fn ensure_positive(amount: Money) -> ResultEngine<()> {
    if !amount.is_positive() {
        return Err(EngineError::InvalidAmount(
            "amount must be > 0".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn parse_client_reference(value: Option<&str>) -> ResultEngine<Option<ReferenceNumber>> {
    value.map(ReferenceNumber::parse).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_text_drops_blanks() {
        assert_eq!(normalize_optional_text(Some("  ")), None);
        assert_eq!(
            normalize_optional_text(Some(" rent ")),
            Some("rent".to_string())
        );
        assert_eq!(normalize_optional_text(None), None);
    }

    #[test]
    fn zero_and_negative_amounts_are_rejected() {
        assert!(ensure_positive(Money::new(1)).is_ok());
        assert!(ensure_positive(Money::ZERO).is_err());
        assert!(ensure_positive(Money::new(-5)).is_err());
    }
}
