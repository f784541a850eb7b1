use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PricingError;

/// Length units accepted on product dimensions and in the calculator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthUnit {
    Mm,
    Cm,
    M,
    #[default]
    Ft,
    In,
    Yd,
}

impl LengthUnit {
    pub const ALL: [LengthUnit; 6] = [
        LengthUnit::Mm,
        LengthUnit::Cm,
        LengthUnit::M,
        LengthUnit::Ft,
        LengthUnit::In,
        LengthUnit::Yd,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LengthUnit::Mm => "mm",
            LengthUnit::Cm => "cm",
            LengthUnit::M => "m",
            LengthUnit::Ft => "ft",
            LengthUnit::In => "in",
            LengthUnit::Yd => "yd",
        }
    }
}

impl core::fmt::Display for LengthUnit {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LengthUnit {
    type Err = PricingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unit = match s.trim().to_ascii_lowercase().as_str() {
            "mm" | "millimeter" | "millimeters" | "millimetre" | "millimetres" => LengthUnit::Mm,
            "cm" | "centimeter" | "centimeters" | "centimetre" | "centimetres" => LengthUnit::Cm,
            "m" | "meter" | "meters" | "metre" | "metres" => LengthUnit::M,
            "ft" | "feet" | "foot" => LengthUnit::Ft,
            "in" | "inch" | "inches" => LengthUnit::In,
            "yd" | "yard" | "yards" => LengthUnit::Yd,
            _ => return Err(PricingError::UnknownUnit(s.to_string())),
        };
        Ok(unit)
    }
}

/// Metric units divide so that `100 cm` is exactly `1 m`.
pub fn convert_to_meters(value: f64, unit: LengthUnit) -> f64 {
    match unit {
        LengthUnit::Mm => value / 1000.0,
        LengthUnit::Cm => value / 100.0,
        LengthUnit::M => value,
        LengthUnit::Ft => value * 0.3048,
        LengthUnit::In => value * 0.0254,
        LengthUnit::Yd => value * 0.9144,
    }
}

fn convert_from_meters(meters: f64, unit: LengthUnit) -> f64 {
    match unit {
        LengthUnit::Mm => meters * 1000.0,
        LengthUnit::Cm => meters * 100.0,
        LengthUnit::M => meters,
        LengthUnit::Ft => meters / 0.3048,
        LengthUnit::In => meters / 0.0254,
        LengthUnit::Yd => meters / 0.9144,
    }
}

pub fn convert(value: f64, from: LengthUnit, to: LengthUnit) -> f64 {
    if from == to {
        return value;
    }
    convert_from_meters(convert_to_meters(value, from), to)
}

/// Area in square metres of a `length × width` rectangle.
pub fn area_sqm(length: f64, width: f64, unit: LengthUnit) -> f64 {
    convert_to_meters(length, unit) * convert_to_meters(width, unit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn hundred_centimetres_is_one_metre() {
        assert_eq!(convert_to_meters(100.0, LengthUnit::Cm), 1.0);
        assert_eq!(convert_to_meters(2500.0, LengthUnit::Mm), 2.5);
    }

    #[test]
    fn imperial_factors() {
        assert!((convert_to_meters(1.0, LengthUnit::Ft) - 0.3048).abs() < 1e-12);
        assert!((convert_to_meters(12.0, LengthUnit::In) - 0.3048).abs() < 1e-12);
        assert!((convert_to_meters(1.0, LengthUnit::Yd) - 0.9144).abs() < 1e-12);
    }

    #[test]
    fn parse_accepts_aliases() {
        assert_eq!("Feet".parse::<LengthUnit>().unwrap(), LengthUnit::Ft);
        assert_eq!(" inch ".parse::<LengthUnit>().unwrap(), LengthUnit::In);
        assert_eq!("METRES".parse::<LengthUnit>().unwrap(), LengthUnit::M);
        assert!(matches!(
            "cubit".parse::<LengthUnit>(),
            Err(PricingError::UnknownUnit(u)) if u == "cubit"
        ));
    }

    #[test]
    fn area_of_a_five_by_eight_foot_rug() {
        let sqm = area_sqm(5.0, 8.0, LengthUnit::Ft);
        assert!((sqm - 3.716_12).abs() < 1e-5);
    }

    proptest! {
        #[test]
        fn conversion_round_trips(value in 0.0f64..10_000.0, from_idx in 0usize..6, to_idx in 0usize..6) {
            let from = LengthUnit::ALL[from_idx];
            let to = LengthUnit::ALL[to_idx];
            let back = convert(convert(value, from, to), to, from);
            prop_assert!((back - value).abs() <= 1e-9 * value.max(1.0));
        }
    }
}
