use serde::{Deserialize, Serialize};

use crate::error::{PricingError, gst_rate, non_negative};

/// Split of a GST-inclusive amount.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GstBreakdown {
    pub base: f64,
    pub gst: f64,
    pub total: f64,
}

/// Round to paise.
pub fn round_money(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// `base = inclusive / (1 + rate / 100)`; the GST is the remainder so that
/// `base + gst == total` after rounding.
pub fn back_calculate_gst(inclusive: f64, rate: f64) -> Result<GstBreakdown, PricingError> {
    let inclusive = non_negative("amount", inclusive)?;
    let rate = gst_rate(rate)?;

    let total = round_money(inclusive);
    let base = round_money(total / (1.0 + rate / 100.0));
    Ok(GstBreakdown {
        base,
        gst: round_money(total - base),
        total,
    })
}

/// Paise variant used for stored order amounts: `(taxable, gst)`.
///
/// Rates outside 0..=100 are clamped; order lines validate the rate before
/// they get here.
pub fn split_gst_paise(inclusive: u64, rate: f64) -> (u64, u64) {
    let rate = if rate.is_finite() { rate.clamp(0.0, 100.0) } else { 0.0 };
    let taxable = (inclusive as f64 / (1.0 + rate / 100.0)).round() as u64;
    let taxable = taxable.min(inclusive);
    (taxable, inclusive - taxable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn twelve_percent_back_calculation() {
        let b = back_calculate_gst(1120.0, 12.0).unwrap();
        assert_eq!(b, GstBreakdown { base: 1000.0, gst: 120.0, total: 1120.0 });
    }

    #[test]
    fn zero_rate_is_all_base() {
        let b = back_calculate_gst(499.99, 0.0).unwrap();
        assert_eq!(b.base, 499.99);
        assert_eq!(b.gst, 0.0);
    }

    #[test]
    fn rejects_bad_inputs() {
        assert_eq!(
            back_calculate_gst(-1.0, 12.0),
            Err(PricingError::Negative { field: "amount" })
        );
        assert_eq!(
            back_calculate_gst(100.0, 120.0),
            Err(PricingError::RateOutOfRange(120.0))
        );
    }

    #[test]
    fn paise_split() {
        assert_eq!(split_gst_paise(112_000, 12.0), (100_000, 12_000));
        assert_eq!(split_gst_paise(105, 5.0), (100, 5));
        assert_eq!(split_gst_paise(0, 18.0), (0, 0));
    }

    proptest! {
        #[test]
        fn paise_split_is_exhaustive(amount in 0u64..10_000_000_000, rate in 0.0f64..=28.0) {
            let (taxable, gst) = split_gst_paise(amount, rate);
            prop_assert_eq!(taxable + gst, amount);
        }

        #[test]
        fn breakdown_adds_up(amount in 0.0f64..1_000_000.0, rate in 0.0f64..=100.0) {
            let b = back_calculate_gst(amount, rate).unwrap();
            prop_assert!((b.base + b.gst - b.total).abs() < 0.005);
            prop_assert!(b.base <= b.total);
        }
    }
}
