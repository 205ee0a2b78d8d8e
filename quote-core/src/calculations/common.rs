//! Common helpers for price arithmetic.
//!
//! Nothing in the engine rounds; [`round_half_up`] is meant for display and
//! document output only.

use rust_decimal::Decimal;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Rounds a decimal value to exactly two decimal places using half-up rounding.
///
/// Values at exactly 0.005 are rounded away from zero.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use quote_core::calculations::common::round_half_up;
///
/// assert_eq!(round_half_up(dec!(1415.695)), dec!(1415.70));
/// assert_eq!(round_half_up(dec!(6.6666)), dec!(6.67));
/// ```
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
}

/// Returns the maximum of two decimal values.
pub fn max(
    a: Decimal,
    b: Decimal,
) -> Decimal {
    if a > b { a } else { b }
}

/// Clamps a discount percentage to `0..=100`.
pub fn clamp_percentage(percentage: Decimal) -> Decimal {
    percentage.clamp(Decimal::ZERO, HUNDRED)
}

/// Reduces `amount` by `percentage` percent (clamped to `0..=100`).
///
/// ```
/// use rust_decimal_macros::dec;
/// use quote_core::calculations::common::apply_discount;
///
/// assert_eq!(apply_discount(dec!(1300), dec!(10)), dec!(1170));
/// ```
pub fn apply_discount(
    amount: Decimal,
    percentage: Decimal,
) -> Decimal {
    amount * (HUNDRED - clamp_percentage(percentage)) / HUNDRED
}

/// `part` as a percentage of `whole`; zero when `whole` is zero.
pub fn percentage_of(
    part: Decimal,
    whole: Decimal,
) -> Decimal {
    if whole.is_zero() {
        return Decimal::ZERO;
    }
    part / whole * HUNDRED
}
