use serde::{Deserialize, Serialize};

use crate::error::{PricingError, gst_rate, non_negative};
use crate::gst::{back_calculate_gst, round_money};
use crate::units::{LengthUnit, area_sqm};

/// Calculator request. `selling_price` is per piece and GST-inclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingInput {
    pub length: f64,
    pub width: f64,
    #[serde(default)]
    pub unit: LengthUnit,
    #[serde(default = "one")]
    pub quantity: u32,
    pub selling_price: f64,
    pub gst_rate: f64,
    /// Material cost of one SQM, from the product recipe.
    #[serde(default)]
    pub cost_per_sqm: Option<f64>,
}

fn one() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingBreakdown {
    pub area_sqm: f64,
    pub total_area_sqm: f64,
    /// Inclusive price per SQM; 0 when the area is 0.
    pub price_per_sqm: f64,
    pub base_price: f64,
    pub gst_amount: f64,
    pub unit_price: f64,
    pub total_price: f64,
    pub cost_per_unit: Option<f64>,
    pub margin_per_unit: Option<f64>,
    pub margin_percent: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PricingCalculator;

impl PricingCalculator {
    pub fn new() -> Self {
        Self
    }

    pub fn calculate(&self, input: &PricingInput) -> Result<PricingBreakdown, PricingError> {
        let length = non_negative("length", input.length)?;
        let width = non_negative("width", input.width)?;
        let selling_price = non_negative("selling_price", input.selling_price)?;
        let rate = gst_rate(input.gst_rate)?;
        let cost_per_sqm = input
            .cost_per_sqm
            .map(|c| non_negative("cost_per_sqm", c))
            .transpose()?;

        let area = area_sqm(length, width, input.unit);
        let quantity = f64::from(input.quantity);

        let price_per_sqm = if area > 0.0 {
            round_money(selling_price / area)
        } else {
            0.0
        };

        let per_unit = back_calculate_gst(selling_price, rate)?;
        let cost_per_unit = cost_per_sqm.map(|c| round_money(c * area));
        let margin_per_unit = cost_per_unit.map(|c| round_money(per_unit.base - c));
        let margin_percent = margin_per_unit.map(|m| {
            if per_unit.base > 0.0 {
                round_money(m / per_unit.base * 100.0)
            } else {
                0.0
            }
        });

        Ok(PricingBreakdown {
            area_sqm: round_area(area),
            total_area_sqm: round_area(area * quantity),
            price_per_sqm,
            base_price: round_money(per_unit.base * quantity),
            gst_amount: round_money(per_unit.gst * quantity),
            unit_price: per_unit.total,
            total_price: round_money(per_unit.total * quantity),
            cost_per_unit,
            margin_per_unit,
            margin_percent,
        })
    }
}

fn round_area(sqm: f64) -> f64 {
    (sqm * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> PricingInput {
        PricingInput {
            length: 200.0,
            width: 300.0,
            unit: LengthUnit::Cm,
            quantity: 2,
            selling_price: 33_600.0,
            gst_rate: 12.0,
            cost_per_sqm: Some(2_000.0),
        }
    }

    #[test]
    fn six_square_metre_rug() {
        let b = PricingCalculator::new().calculate(&input()).unwrap();

        assert_eq!(b.area_sqm, 6.0);
        assert_eq!(b.total_area_sqm, 12.0);
        assert_eq!(b.price_per_sqm, 5_600.0);
        assert_eq!(b.unit_price, 33_600.0);
        assert_eq!(b.base_price, 60_000.0);
        assert_eq!(b.gst_amount, 7_200.0);
        assert_eq!(b.total_price, 67_200.0);
        assert_eq!(b.cost_per_unit, Some(12_000.0));
        assert_eq!(b.margin_per_unit, Some(18_000.0));
        assert_eq!(b.margin_percent, Some(60.0));
    }

    #[test]
    fn zero_area_does_not_divide() {
        let mut i = input();
        i.width = 0.0;
        let b = PricingCalculator::new().calculate(&i).unwrap();
        assert_eq!(b.area_sqm, 0.0);
        assert_eq!(b.price_per_sqm, 0.0);
        assert!(b.price_per_sqm.is_finite());
    }

    #[test]
    fn no_recipe_cost_means_no_margin() {
        let mut i = input();
        i.cost_per_sqm = None;
        let b = PricingCalculator::new().calculate(&i).unwrap();
        assert_eq!(b.cost_per_unit, None);
        assert_eq!(b.margin_percent, None);
    }

    #[test]
    fn negative_length_is_an_error() {
        let mut i = input();
        i.length = -1.0;
        assert_eq!(
            PricingCalculator::new().calculate(&i),
            Err(PricingError::Negative { field: "length" })
        );
    }

    #[test]
    fn quantity_defaults_to_one_when_deserialized() {
        let i: PricingInput = serde_json::from_str(
            r#"{"length": 5, "width": 8, "unit": "ft", "selling_price": 11200, "gst_rate": 12}"#,
        )
        .unwrap();
        assert_eq!(i.quantity, 1);
        assert_eq!(i.cost_per_sqm, None);
    }
}
