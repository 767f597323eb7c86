//! Conversion between standard (human-readable) and atomic (integer) units
//!
//! Atomic amounts are integers scaled by `10^decimals` of the asset.
//! Standard amounts are arbitrary-precision non-negative decimals.

use crate::error::WasmAlgoError;
use core::cmp::Ordering;
use core::fmt;
use core::str::FromStr;
use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};

/// Arbitrary-precision non-negative decimal, always kept normalized
/// (no trailing zeros in the fractional part).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StandardAmount {
    /// Value multiplied by `10^scale`
    units: BigUint,
    /// Number of fractional digits
    scale: u32,
}

impl StandardAmount {
    pub fn new(units: BigUint, scale: u32) -> Self {
        let mut amount = StandardAmount { units, scale };
        amount.normalize();
        amount
    }

    pub fn zero() -> Self {
        StandardAmount {
            units: BigUint::zero(),
            scale: 0,
        }
    }

    /// Number of significant fractional digits
    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn is_zero(&self) -> bool {
        self.units.is_zero()
    }

    /// Integer part (truncated)
    pub fn trunc(&self) -> BigUint {
        &self.units / ten_pow(self.scale)
    }

    /// Round to `dp` fractional digits, halves away from zero
    pub fn round_half_up(&self, dp: u32) -> StandardAmount {
        if self.scale <= dp {
            return self.clone();
        }
        let divisor = ten_pow(self.scale - dp);
        let mut quotient = &self.units / &divisor;
        let remainder = &self.units % &divisor;
        if remainder * 2u32 >= divisor {
            quotient += 1u32;
        }
        StandardAmount::new(quotient, dp)
    }

    /// Divide by `10^exponent` exactly
    pub fn shift_left(&self, exponent: u32) -> StandardAmount {
        StandardAmount::new(self.units.clone(), self.scale + exponent)
    }

    fn normalize(&mut self) {
        while self.scale > 0 && (&self.units % 10u32).is_zero() {
            self.units /= 10u32;
            self.scale -= 1;
        }
    }

    /// Units rescaled to `scale`, which must not be below the current scale
    fn units_at(&self, scale: u32) -> BigUint {
        &self.units * ten_pow(scale - self.scale)
    }
}

impl From<u64> for StandardAmount {
    fn from(value: u64) -> Self {
        StandardAmount::new(BigUint::from(value), 0)
    }
}

impl FromStr for StandardAmount {
    type Err = WasmAlgoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (integer, fraction) = match s.split_once('.') {
            Some((i, f)) => (i, f),
            None => (s, ""),
        };

        if integer.is_empty() && fraction.is_empty() {
            return Err(WasmAlgoError::InvalidAmount(format!("'{}' is not a number", s)));
        }
        if !integer.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
            return Err(WasmAlgoError::InvalidAmount(format!(
                "'{}' must be a non-negative decimal",
                s
            )));
        }

        let digits = format!("{}{}", integer, fraction);
        let units = BigUint::parse_bytes(digits.as_bytes(), 10).unwrap_or_default();
        let scale = u32::try_from(fraction.len())
            .map_err(|_| WasmAlgoError::InvalidAmount("Too many fractional digits".to_string()))?;

        Ok(StandardAmount::new(units, scale))
    }
}

impl fmt::Display for StandardAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.units.to_string();
        if self.scale == 0 {
            return write!(f, "{}", digits);
        }

        let scale = self.scale as usize;
        let padded = if digits.len() <= scale {
            format!("{}{}", "0".repeat(scale - digits.len() + 1), digits)
        } else {
            digits
        };
        let (integer, fraction) = padded.split_at(padded.len() - scale);
        write!(f, "{}.{}", integer, fraction)
    }
}

impl PartialOrd for StandardAmount {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StandardAmount {
    fn cmp(&self, other: &Self) -> Ordering {
        let scale = self.scale.max(other.scale);
        self.units_at(scale).cmp(&other.units_at(scale))
    }
}

/// Most decimal places an Algorand asset can declare
pub const MAX_DECIMALS: u32 = 19;

fn check_decimals(decimals: u32) -> Result<(), WasmAlgoError> {
    if decimals > MAX_DECIMALS {
        return Err(WasmAlgoError::InvalidAmount(format!(
            "decimals must be at most {}, got {}",
            MAX_DECIMALS, decimals
        )));
    }
    Ok(())
}

/// Convert a standard amount to atomic units of an asset with `decimals` places
///
/// Fails when the amount has more significant fractional digits than the asset supports.
pub fn convert_to_atomic_unit(
    amount: &StandardAmount,
    decimals: u32,
) -> Result<BigUint, WasmAlgoError> {
    check_decimals(decimals)?;
    if amount.scale > decimals {
        return Err(WasmAlgoError::InvalidAmount(format!(
            "{} has more than {} decimal places",
            amount, decimals
        )));
    }
    Ok(amount.units_at(decimals))
}

/// Convert atomic units back to a standard amount
pub fn convert_to_standard_unit(
    atomic: &BigUint,
    decimals: u32,
) -> Result<StandardAmount, WasmAlgoError> {
    check_decimals(decimals)?;
    Ok(StandardAmount::new(atomic.clone(), decimals))
}

/// Narrow an atomic amount to the `u64` range used on chain
pub fn atomic_to_u64(atomic: &BigUint) -> Result<u64, WasmAlgoError> {
    atomic
        .to_u64()
        .ok_or_else(|| WasmAlgoError::InvalidAmount(format!("{} does not fit in uint64", atomic)))
}

pub(crate) fn ten_pow(exponent: u32) -> BigUint {
    BigUint::from(10u32).pow(exponent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn amount(s: &str) -> StandardAmount {
        s.parse().unwrap()
    }

    #[test]
    fn test_one_and_a_half() {
        let atomic = convert_to_atomic_unit(&amount("1.5"), 6).unwrap();
        assert_eq!(atomic, BigUint::from(1_500_000u32));
        assert_eq!(convert_to_standard_unit(&atomic, 6).unwrap().to_string(), "1.5");
    }

    #[rstest]
    #[case("0", 0, 0)]
    #[case("1", 0, 1)]
    #[case("0.000001", 6, 1)]
    #[case("42.10", 2, 4210)]
    #[case(".5", 1, 5)]
    #[case("7.", 3, 7000)]
    fn test_to_atomic(#[case] input: &str, #[case] decimals: u32, #[case] expected: u64) {
        let atomic = convert_to_atomic_unit(&amount(input), decimals).unwrap();
        assert_eq!(atomic, BigUint::from(expected));
    }

    #[rstest]
    #[case(0, 6, "0")]
    #[case(1, 6, "0.000001")]
    #[case(1_000_000, 6, "1")]
    #[case(123_450, 3, "123.45")]
    #[case(5, 0, "5")]
    fn test_to_standard(#[case] atomic: u64, #[case] decimals: u32, #[case] expected: &str) {
        let standard = convert_to_standard_unit(&BigUint::from(atomic), decimals).unwrap();
        assert_eq!(standard.to_string(), expected);
    }

    #[test]
    fn test_excess_precision_rejected() {
        assert!(convert_to_atomic_unit(&amount("0.0000001"), 6).is_err());
        // Trailing zeros are not significant
        assert!(convert_to_atomic_unit(&amount("1.5000000"), 6).is_ok());
    }

    #[test]
    fn test_decimals_out_of_range() {
        assert!(convert_to_atomic_unit(&amount("1"), MAX_DECIMALS).is_ok());
        assert!(matches!(
            convert_to_atomic_unit(&amount("1"), 20_000_000),
            Err(WasmAlgoError::InvalidAmount(_))
        ));
        assert!(matches!(
            convert_to_standard_unit(&BigUint::from(1u32), MAX_DECIMALS + 1),
            Err(WasmAlgoError::InvalidAmount(_))
        ));
    }

    #[rstest]
    #[case("")]
    #[case(".")]
    #[case("-1")]
    #[case("1e5")]
    #[case("1.2.3")]
    #[case("abc")]
    fn test_parse_rejects(#[case] input: &str) {
        assert!(input.parse::<StandardAmount>().is_err());
    }

    #[test]
    fn test_ordering() {
        assert!(amount("1.5") > amount("1.49"));
        assert_eq!(amount("2.50"), amount("2.5"));
        assert!(amount("0.1") < amount("1"));
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(amount("999999.995").round_half_up(2).to_string(), "1000000");
        assert_eq!(amount("1.234").round_half_up(2).to_string(), "1.23");
        assert_eq!(amount("1.2").round_half_up(4).to_string(), "1.2");
    }

    #[test]
    fn test_atomic_to_u64() {
        assert_eq!(atomic_to_u64(&BigUint::from(u64::MAX)).unwrap(), u64::MAX);
        assert!(atomic_to_u64(&(BigUint::from(u64::MAX) + 1u32)).is_err());
    }

    proptest! {
        #[test]
        fn prop_standard_atomic_roundtrip(units in any::<u64>(), scale in 0u32..12, extra in 0u32..8) {
            let original = StandardAmount::new(BigUint::from(units), scale);
            let decimals = scale + extra;
            let atomic = convert_to_atomic_unit(&original, decimals).unwrap();
            prop_assert_eq!(convert_to_standard_unit(&atomic, decimals).unwrap(), original);
        }

        #[test]
        fn prop_display_parse_roundtrip(units in any::<u64>(), scale in 0u32..20) {
            let original = StandardAmount::new(BigUint::from(units), scale);
            let reparsed: StandardAmount = original.to_string().parse().unwrap();
            prop_assert_eq!(reparsed, original);
        }
    }
}
