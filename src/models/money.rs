use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Prices are persisted as integer cents so SQLite can aggregate them.
pub fn to_cents(amount: Decimal) -> i64 {
    (amount * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(i64::MAX)
}

pub fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_cents_conversion() {
        assert_eq!(to_cents(dec!(12.99)), 1299);
        assert_eq!(to_cents(dec!(0.01)), 1);
        assert_eq!(to_cents(dec!(7)), 700);
        assert_eq!(to_cents(dec!(0.005)), 1);

        assert_eq!(from_cents(1299), dec!(12.99));
        assert_eq!(from_cents(0), dec!(0.00));
    }
}
