//! Tokyo Stock Exchange tick table.
//!
//! Every limit price leaving the bot passes through [`quantize`]. The
//! exchange rejects prices that are not on a tick, and a rejected order is
//! not retried, so this is the last step before an `OrderIntent` is built.

use crate::decimal::Price;
use crate::order::OrderSide;
use rust_decimal::Decimal;

/// Upper bound (inclusive) of the 1-yen tick band.
const ONE_YEN_BAND_MAX: Decimal = Decimal::from_parts(3000, 0, 0, false, 0);
/// Upper bound (inclusive) of the 5-yen tick band.
const FIVE_YEN_BAND_MAX: Decimal = Decimal::from_parts(5000, 0, 0, false, 0);

/// Tick size for a whole-yen price.
#[must_use]
pub fn tick_size(price: Price) -> Decimal {
    let p = price.floor_yen().inner();
    if p <= ONE_YEN_BAND_MAX {
        Decimal::ONE
    } else if p <= FIVE_YEN_BAND_MAX {
        Decimal::from(5)
    } else {
        Decimal::TEN
    }
}

/// Map a raw price onto a tradable tick.
///
/// The fractional yen is dropped first, then the price is floored to its
/// band's tick. Both sides floor: a resting limit order is never moved past
/// the computed price, so `_side` does not change the result. Non-positive
/// input yields zero.
#[must_use]
pub fn quantize(raw: Price, _side: OrderSide) -> Price {
    if !raw.is_positive() {
        return Price::ZERO;
    }
    let whole = raw.floor_yen();
    whole.round_to_tick(tick_size(whole))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn p(d: Decimal) -> Price {
        Price::new(d)
    }

    #[test]
    fn test_band_examples() {
        assert_eq!(quantize(p(dec!(5012)), OrderSide::Buy), p(dec!(5010)));
        assert_eq!(quantize(p(dec!(4327)), OrderSide::Buy), p(dec!(4325)));
        assert_eq!(quantize(p(dec!(2999)), OrderSide::Sell), p(dec!(2999)));
    }

    #[test]
    fn test_band_boundaries() {
        assert_eq!(quantize(p(dec!(3000)), OrderSide::Buy), p(dec!(3000)));
        assert_eq!(quantize(p(dec!(3000.9)), OrderSide::Buy), p(dec!(3000)));
        assert_eq!(quantize(p(dec!(3004)), OrderSide::Buy), p(dec!(3000)));
        assert_eq!(quantize(p(dec!(5000)), OrderSide::Sell), p(dec!(5000)));
        assert_eq!(quantize(p(dec!(5009)), OrderSide::Sell), p(dec!(5000)));
    }

    #[test]
    fn test_fraction_is_floored() {
        assert_eq!(quantize(p(dec!(1055.853)), OrderSide::Sell), p(dec!(1055)));
        assert_eq!(quantize(p(dec!(950.99)), OrderSide::Sell), p(dec!(950)));
    }

    #[test]
    fn test_buy_and_sell_agree() {
        for raw in [dec!(999.9), dec!(3004), dec!(5009.5), dec!(30049)] {
            assert_eq!(quantize(p(raw), OrderSide::Buy), quantize(p(raw), OrderSide::Sell));
        }
    }

    #[test]
    fn test_non_positive_is_zero() {
        assert_eq!(quantize(p(dec!(0)), OrderSide::Buy), Price::ZERO);
        assert_eq!(quantize(p(dec!(-12)), OrderSide::Buy), Price::ZERO);
    }

    #[test]
    fn test_idempotent_and_never_above_input() {
        let mut raw = dec!(0.5);
        while raw < dec!(12000) {
            for side in [OrderSide::Buy, OrderSide::Sell] {
                let once = quantize(p(raw), side);
                assert!(once.inner() <= raw, "{raw} -> {once}");
                assert_eq!(quantize(once, side), once, "not idempotent at {raw}");
                if once.is_positive() {
                    assert!((once.inner() % tick_size(once)).is_zero());
                }
            }
            raw += dec!(3.7);
        }
    }
}
