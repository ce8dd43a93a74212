//! Currency rounding

use rust_decimal::{Decimal, RoundingStrategy};

use crate::CURRENCY_SCALE;

/// Round to cents, half away from zero (2.345 -> 2.35, -2.345 -> -2.35)
///
/// The result always carries exactly two decimal places (13 -> 13.00).
pub fn round_currency(amount: Decimal) -> Decimal {
    let mut rounded =
        amount.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(CURRENCY_SCALE);
    rounded
}
