// core/src/money.rs
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// A signed, scale-2 monetary amount.
///
/// Wrapping `Decimal` instead of passing it around raw keeps the
/// "no floating point, scale <= 2, validated at construction" rule in one
/// place instead of scattered across every call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(Decimal);

impl Amount {
    /// Construct from a `Decimal` already known to be well-formed (e.g. one
    /// read back from storage). Still enforces scale.
    pub fn new(value: Decimal) -> Result<Self, EngineError> {
        if value.scale() > 2 {
            return Err(EngineError::Validation(format!(
                "amount {value} has more than two decimal places"
            )));
        }
        let mut v = value;
        v.rescale(2);
        Ok(Self(v))
    }

    /// Parse caller-supplied input (HTTP body, CLI arg). Rejects anything
    /// that isn't a clean scale-2 decimal string.
    pub fn parse(raw: &str) -> Result<Self, EngineError> {
        let value: Decimal = raw
            .parse()
            .map_err(|_| EngineError::Validation(format!("invalid amount format: {raw}")))?;
        Self::new(value)
    }

    pub fn zero() -> Self {
        Self(Decimal::new(0, 2))
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_zero(&self) -> bool {
        self.0 == Decimal::ZERO
    }

    pub fn inner(&self) -> Decimal {
        self.0
    }

    pub fn checked_add(&self, other: &Amount) -> Amount {
        Amount(self.0 + other.0)
    }

    pub fn negate(&self) -> Amount {
        Amount(-self.0)
    }
}

impl std::ops::Add for Amount {
    type Output = Amount;
    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0 + rhs.0)
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Amount> for Decimal {
    fn from(a: Amount) -> Decimal {
        a.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_more_than_two_decimal_places() {
        assert!(Amount::parse("10.001").is_err());
    }

    #[test]
    fn accepts_boundary_amount() {
        let a = Amount::parse("0.01").unwrap();
        assert!(a.is_positive());
    }

    #[test]
    fn zero_sum_holds_for_opposite_amounts() {
        let a = Amount::parse("100.00").unwrap();
        let b = a.negate();
        assert!((a + b).is_zero());
    }
}
