//! 32-bit signed integer arithmetic under an explicit overflow policy.
//!
//! Division and remainder truncate toward zero, so a remainder takes the
//! sign of the dividend. Dividing by zero and raising to a negative power
//! are errors under every policy.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ArithError {
    #[error("integer overflow in {lhs} {op} {rhs}")]
    Overflow { op: &'static str, lhs: i32, rhs: i32 },

    #[error("division by zero")]
    DivisionByZero,

    #[error("negative exponent")]
    NegativeExponent,
}

/// What happens when a result does not fit in `i32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Report [`ArithError::Overflow`].
    #[default]
    Checked,
    /// Two's complement wraparound.
    Wrapping,
    /// Clamp to `i32::MIN` / `i32::MAX`.
    Saturating,
}

type Checked = fn(i32, i32) -> Option<i32>;
type Total = fn(i32, i32) -> i32;

impl OverflowPolicy {
    pub const ALL: [OverflowPolicy; 3] = [
        OverflowPolicy::Checked,
        OverflowPolicy::Wrapping,
        OverflowPolicy::Saturating,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OverflowPolicy::Checked => "checked",
            OverflowPolicy::Wrapping => "wrapping",
            OverflowPolicy::Saturating => "saturating",
        }
    }

    fn apply(
        self,
        op: &'static str,
        lhs: i32,
        rhs: i32,
        checked: Checked,
        wrapping: Total,
        saturating: Total,
    ) -> Result<i32, ArithError> {
        match self {
            OverflowPolicy::Checked => {
                checked(lhs, rhs).ok_or(ArithError::Overflow { op, lhs, rhs })
            }
            OverflowPolicy::Wrapping => Ok(wrapping(lhs, rhs)),
            OverflowPolicy::Saturating => Ok(saturating(lhs, rhs)),
        }
    }

    pub fn add(self, lhs: i32, rhs: i32) -> Result<i32, ArithError> {
        self.apply("+", lhs, rhs, i32::checked_add, i32::wrapping_add, i32::saturating_add)
    }

    pub fn sub(self, lhs: i32, rhs: i32) -> Result<i32, ArithError> {
        self.apply("-", lhs, rhs, i32::checked_sub, i32::wrapping_sub, i32::saturating_sub)
    }

    pub fn mul(self, lhs: i32, rhs: i32) -> Result<i32, ArithError> {
        self.apply("*", lhs, rhs, i32::checked_mul, i32::wrapping_mul, i32::saturating_mul)
    }

    /// `i32::MIN / -1` is the only overflowing quotient.
    pub fn div(self, lhs: i32, rhs: i32) -> Result<i32, ArithError> {
        if rhs == 0 {
            return Err(ArithError::DivisionByZero);
        }
        self.apply("/", lhs, rhs, i32::checked_div, i32::wrapping_div, i32::saturating_div)
    }

    /// Truncating remainder. `i32::MIN % -1` is 0 unless checked.
    pub fn rem(self, lhs: i32, rhs: i32) -> Result<i32, ArithError> {
        if rhs == 0 {
            return Err(ArithError::DivisionByZero);
        }
        self.apply("%", lhs, rhs, i32::checked_rem, i32::wrapping_rem, i32::wrapping_rem)
    }

    pub fn pow(self, base: i32, exp: i32) -> Result<i32, ArithError> {
        if exp < 0 {
            return Err(ArithError::NegativeExponent);
        }
        self.apply(
            "^",
            base,
            exp,
            |b, e| b.checked_pow(e as u32),
            |b, e| b.wrapping_pow(e as u32),
            |b, e| b.saturating_pow(e as u32),
        )
    }

    /// Negation, reported as `0 - value` on overflow.
    pub fn neg(self, value: i32) -> Result<i32, ArithError> {
        self.sub(0, value)
    }
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OverflowPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown overflow policy '{s}' (expected checked, wrapping or saturating)"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OverflowPolicy::*;

    #[test]
    fn test_in_range_results_agree_across_policies() {
        for policy in OverflowPolicy::ALL {
            assert_eq!(policy.add(5, 10), Ok(15));
            assert_eq!(policy.sub(5, 10), Ok(-5));
            assert_eq!(policy.mul(-4, 6), Ok(-24));
            assert_eq!(policy.div(-7, 2), Ok(-3));
            assert_eq!(policy.rem(5, 10), Ok(5));
            assert_eq!(policy.rem(-7, 2), Ok(-1));
            assert_eq!(policy.rem(7, -2), Ok(1));
            assert_eq!(policy.pow(2, 10), Ok(1024));
            assert_eq!(policy.pow(-3, 0), Ok(1));
            assert_eq!(policy.neg(9), Ok(-9));
        }
    }

    #[test]
    fn test_overflow_by_policy() {
        assert_eq!(
            Checked.add(i32::MAX, 1),
            Err(ArithError::Overflow { op: "+", lhs: i32::MAX, rhs: 1 })
        );
        assert_eq!(Wrapping.add(i32::MAX, 1), Ok(i32::MIN));
        assert_eq!(Saturating.add(i32::MAX, 1), Ok(i32::MAX));

        assert_eq!(Wrapping.sub(i32::MIN, 1), Ok(i32::MAX));
        assert_eq!(Saturating.mul(i32::MIN, 2), Ok(i32::MIN));
        assert_eq!(Saturating.pow(3, 40), Ok(i32::MAX));
        assert!(Checked.pow(3, 40).is_err());

        assert!(Checked.neg(i32::MIN).is_err());
        assert_eq!(Wrapping.neg(i32::MIN), Ok(i32::MIN));
        assert_eq!(Saturating.neg(i32::MIN), Ok(i32::MAX));
    }

    #[test]
    fn test_min_divided_by_minus_one() {
        assert!(Checked.div(i32::MIN, -1).is_err());
        assert_eq!(Wrapping.div(i32::MIN, -1), Ok(i32::MIN));
        assert_eq!(Saturating.div(i32::MIN, -1), Ok(i32::MAX));

        assert!(Checked.rem(i32::MIN, -1).is_err());
        assert_eq!(Wrapping.rem(i32::MIN, -1), Ok(0));
        assert_eq!(Saturating.rem(i32::MIN, -1), Ok(0));
    }

    #[test]
    fn test_errors_independent_of_policy() {
        for policy in OverflowPolicy::ALL {
            assert_eq!(policy.div(1, 0), Err(ArithError::DivisionByZero));
            assert_eq!(policy.rem(5, 0), Err(ArithError::DivisionByZero));
            assert_eq!(policy.pow(2, -1), Err(ArithError::NegativeExponent));
        }
    }

    #[test]
    fn test_policy_names() {
        assert_eq!("Wrapping".parse::<OverflowPolicy>(), Ok(Wrapping));
        assert_eq!("saturating".parse::<OverflowPolicy>(), Ok(Saturating));
        assert!("panic".parse::<OverflowPolicy>().is_err());
        assert_eq!(Checked.to_string(), "checked");
        assert_eq!(
            ArithError::Overflow { op: "*", lhs: 65536, rhs: 65536 }.to_string(),
            "integer overflow in 65536 * 65536"
        );
    }
}
