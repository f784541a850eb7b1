use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PricingError {
    #[error("unknown length unit '{0}' (expected mm, cm, m, ft, in or yd)")]
    UnknownUnit(String),

    #[error("{field} cannot be negative")]
    Negative { field: &'static str },

    #[error("{field} must be a finite number")]
    NotFinite { field: &'static str },

    #[error("GST rate {0} is outside 0..=100")]
    RateOutOfRange(f64),
}

pub(crate) fn non_negative(field: &'static str, value: f64) -> Result<f64, PricingError> {
    if !value.is_finite() {
        return Err(PricingError::NotFinite { field });
    }
    if value < 0.0 {
        return Err(PricingError::Negative { field });
    }
    Ok(value)
}

pub(crate) fn gst_rate(rate: f64) -> Result<f64, PricingError> {
    if !rate.is_finite() || !(0.0..=100.0).contains(&rate) {
        return Err(PricingError::RateOutOfRange(rate));
    }
    Ok(rate)
}
