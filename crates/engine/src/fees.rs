//! Fee policy.
//!
//! Fees are a pure function of the operation and the amount. Rates are kept
//! as integer **basis points** (1 bp = 0.01 %) and the product is rounded to
//! the nearest minor unit, halves away from zero, with integer arithmetic
//! only.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{EngineError, Money, PaymentMethod, money::parse_decimal};

const BASIS_POINTS_PER_UNIT: i128 = 10_000;

/// A fee rate expressed in basis points.
///
/// ```rust
/// use engine::FeeRate;
///
/// let rate: FeeRate = "2.5".parse().unwrap();
/// assert_eq!(rate.basis_points(), 250);
/// assert_eq!(rate.to_string(), "2.50%");
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct FeeRate(i64);

impl FeeRate {
    pub const ZERO: FeeRate = FeeRate(0);

    #[must_use]
    pub const fn from_basis_points(bps: i64) -> Self {
        Self(bps)
    }

    /// Whole percent, e.g. `from_percent(2)` is 2 %.
    #[must_use]
    pub const fn from_percent(percent: i64) -> Self {
        Self(percent * 100)
    }

    #[must_use]
    pub const fn basis_points(self) -> i64 {
        self.0
    }

    /// Applies the rate to `amount`, rounding half away from zero.
    #[must_use]
    pub fn apply(self, amount: Money) -> Money {
        let product = i128::from(amount.minor()) * i128::from(self.0);
        let half = BASIS_POINTS_PER_UNIT / 2;
        let rounded = if product >= 0 {
            (product + half) / BASIS_POINTS_PER_UNIT
        } else {
            (product - half) / BASIS_POINTS_PER_UNIT
        };
        // |amount| * rate / 10_000 fits in i64 for any rate up to 100 %.
        Money::new(i64::try_from(rounded).unwrap_or(i64::MAX))
    }
}

impl fmt::Display for FeeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}%", abs / 100, abs % 100)
    }
}

impl FromStr for FeeRate {
    type Err = EngineError;

    /// Parses a percentage such as `"1"`, `"2.5"` or `"0.75"` (max 2
    /// decimals).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (negative, whole, fraction) = parse_decimal(s.trim().trim_end_matches('%'), 2)?;
        if negative {
            return Err(EngineError::InvalidAmount(
                "fee rate must not be negative".to_string(),
            ));
        }
        whole
            .checked_mul(100)
            .and_then(|v| v.checked_add(fraction))
            .map(FeeRate)
            .ok_or_else(|| EngineError::InvalidAmount("fee rate too large".to_string()))
    }
}

/// The operation a fee is computed for.
#[derive(Clone, Copy, Debug)]
pub enum FeeOperation<'a> {
    Transfer,
    TopUp(&'a PaymentMethod),
}

/// Maps an operation and an amount to a fee.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeePolicy {
    transfer_rate: FeeRate,
}

impl Default for FeePolicy {
    /// Peer transfers cost a flat 1 %.
    fn default() -> Self {
        Self {
            transfer_rate: FeeRate::from_percent(1),
        }
    }
}

impl FeePolicy {
    #[must_use]
    pub fn new(transfer_rate: FeeRate) -> Self {
        Self { transfer_rate }
    }

    #[must_use]
    pub fn compute_fee(&self, amount: Money, operation: FeeOperation<'_>) -> Money {
        match operation {
            FeeOperation::Transfer => self.transfer_rate.apply(amount),
            FeeOperation::TopUp(method) => method.fee_rate.apply(amount),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn method(fee_rate: FeeRate) -> PaymentMethod {
        PaymentMethod {
            id: 1,
            name: "Bank transfer".to_string(),
            min_amount: Money::new(500),
            max_amount: Money::new(100_000),
            fee_rate,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn transfer_fee_is_one_percent() {
        let policy = FeePolicy::default();
        assert_eq!(
            policy.compute_fee(Money::new(5_000), FeeOperation::Transfer),
            Money::new(50)
        );
        assert_eq!(
            policy.compute_fee(Money::new(12_345), FeeOperation::Transfer),
            Money::new(123)
        );
    }

    #[test]
    fn transfer_rate_is_configurable() {
        let policy = FeePolicy::new(FeeRate::from_basis_points(50));
        assert_eq!(
            policy.compute_fee(Money::new(10_000), FeeOperation::Transfer),
            Money::new(50)
        );
    }

    #[test]
    fn topup_fee_uses_method_percentage() {
        let policy = FeePolicy::default();
        let method = method(FeeRate::from_percent(2));
        assert_eq!(
            policy.compute_fee(Money::new(2_000), FeeOperation::TopUp(&method)),
            Money::new(40)
        );
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        // 0.50 * 1 % = 0.005 -> 0.01
        assert_eq!(FeeRate::from_percent(1).apply(Money::new(50)), Money::new(1));
        // 0.49 * 1 % = 0.0049 -> 0.00
        assert_eq!(FeeRate::from_percent(1).apply(Money::new(49)), Money::new(0));
        assert_eq!(FeeRate::from_percent(1).apply(Money::new(-50)), Money::new(-1));
    }

    #[test]
    fn zero_rate_means_no_fee() {
        let policy = FeePolicy::default();
        let method = method(FeeRate::ZERO);
        assert_eq!(
            policy.compute_fee(Money::new(99_999), FeeOperation::TopUp(&method)),
            Money::ZERO
        );
    }

    #[test]
    fn fee_rate_parses_percentages() {
        assert_eq!("1".parse::<FeeRate>().unwrap(), FeeRate::from_basis_points(100));
        assert_eq!("2.5%".parse::<FeeRate>().unwrap(), FeeRate::from_basis_points(250));
        assert_eq!("0.75".parse::<FeeRate>().unwrap(), FeeRate::from_basis_points(75));
        assert!("-1".parse::<FeeRate>().is_err());
        assert!("1.234".parse::<FeeRate>().is_err());
    }
}
