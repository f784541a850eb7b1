//! Carpet pricing arithmetic: length units, area, GST back-calculation and
//! the per-SQM price calculator.
//!
//! Pure functions over `f64` rupees; callers that store money as paise
//! convert at the edge (see [`gst::split_gst_paise`]).

pub mod calculator;
pub mod error;
pub mod gst;
pub mod units;

pub use calculator::{PricingBreakdown, PricingCalculator, PricingInput};
pub use error::PricingError;
pub use gst::{GstBreakdown, back_calculate_gst, round_money, split_gst_paise};
pub use units::{LengthUnit, area_sqm, convert, convert_to_meters};
