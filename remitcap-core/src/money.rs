//! Monetary helpers.
//!
//! All amounts are `Decimal` with two fractional digits. Floats never reach
//! the ceiling arithmetic.

use rust_decimal::{Decimal, RoundingStrategy};

/// A monetary amount in the reference currency.
pub type Money = Decimal;

/// Number of fractional digits kept for every amount.
pub const MONEY_SCALE: u32 = 2;

/// Round to cents, half away from zero.
pub fn round_money(amount: Money) -> Money {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Clamp to `[0, ceiling]` and round to cents.
pub fn clamp_money(amount: Money, ceiling: Money) -> Money {
    let ceiling = ceiling.max(Decimal::ZERO);
    round_money(amount.max(Decimal::ZERO).min(ceiling))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_money_midpoint() {
        assert_eq!(round_money(dec!(10.005)), dec!(10.01));
        assert_eq!(round_money(dec!(10.004)), dec!(10.00));
        assert_eq!(round_money(dec!(7)), dec!(7));
    }

    #[test]
    fn test_clamp_money_bounds() {
        assert_eq!(clamp_money(dec!(-3), dec!(999)), Decimal::ZERO);
        assert_eq!(clamp_money(dec!(1500), dec!(999)), dec!(999));
        assert_eq!(clamp_money(dec!(12.345), dec!(999)), dec!(12.35));
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Clamped amounts stay inside the window and carry at most two decimals.
        #[test]
        fn prop_clamp_money_within_bounds(
            cents in -1_000_000i64..1_000_000,
            extra in 0u32..1000,
            ceiling_cents in 0i64..200_000,
        ) {
            let amount = Decimal::new(cents * 1000 + i64::from(extra), 5);
            let ceiling = Decimal::new(ceiling_cents, 2);
            let clamped = clamp_money(amount, ceiling);

            prop_assert!(clamped >= Decimal::ZERO);
            prop_assert!(clamped <= ceiling);
            prop_assert!(clamped.scale() <= MONEY_SCALE);
            prop_assert_eq!(round_money(clamped), clamped);
        }
    }
}
