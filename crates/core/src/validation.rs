//! Form-level validation rules applied before a command is accepted.
//!
//! These are shallow shape checks on user input (length, format, range). They
//! return `DomainError::Validation` with a message naming the offending field.

use crate::error::{DomainError, DomainResult};

pub const NAME_MIN_LEN: usize = 2;
pub const NAME_MAX_LEN: usize = 100;

/// Trimmed length must be within `NAME_MIN_LEN..=NAME_MAX_LEN` characters.
pub fn validate_name(field: &str, value: &str) -> DomainResult<()> {
    let len = value.trim().chars().count();
    if len < NAME_MIN_LEN {
        return Err(DomainError::validation(format!(
            "{field} must be at least {NAME_MIN_LEN} characters"
        )));
    }
    if len > NAME_MAX_LEN {
        return Err(DomainError::validation(format!(
            "{field} must be at most {NAME_MAX_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_email(value: &str) -> DomainResult<()> {
    let invalid = || DomainError::validation(format!("invalid email address '{value}'"));

    if value.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = value.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    let (host, tld) = domain.rsplit_once('.').ok_or_else(invalid)?;
    if host.is_empty() || tld.len() < 2 {
        return Err(invalid());
    }
    Ok(())
}

/// Indian mobile number: optional `+91`, `91` or `0` prefix, then ten digits
/// starting with 6-9. Spaces and dashes are ignored.
pub fn validate_phone(value: &str) -> DomainResult<()> {
    normalize_phone(value).map(|_| ())
}

/// Returns the bare ten-digit mobile number.
pub fn normalize_phone(value: &str) -> DomainResult<String> {
    let cleaned: String = value
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();
    let digits = cleaned.strip_prefix('+').unwrap_or(&cleaned);

    let invalid = || DomainError::validation(format!("invalid phone number '{value}'"));
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let national = match digits.len() {
        10 => digits,
        11 if digits.starts_with('0') => &digits[1..],
        12 if digits.starts_with("91") => &digits[2..],
        _ => return Err(invalid()),
    };

    match national.chars().next() {
        Some('6'..='9') => Ok(national.to_string()),
        _ => Err(invalid()),
    }
}

/// GSTIN: `22AAAAA0000A1Z5` (state code, PAN, entity number, `Z`, checksum).
pub fn validate_gstin(value: &str) -> DomainResult<()> {
    let v = value.trim().to_ascii_uppercase();
    let b = v.as_bytes();
    let ok = b.len() == 15
        && b[0..2].iter().all(u8::is_ascii_digit)
        && b[2..7].iter().all(u8::is_ascii_uppercase)
        && b[7..11].iter().all(u8::is_ascii_digit)
        && b[11].is_ascii_uppercase()
        && (b[12].is_ascii_uppercase() || (b[12].is_ascii_digit() && b[12] != b'0'))
        && b[13] == b'Z'
        && b[14].is_ascii_alphanumeric();
    if ok {
        Ok(())
    } else {
        Err(DomainError::validation(format!("invalid GSTIN '{value}'")))
    }
}

/// Six digits, not starting with zero.
pub fn validate_pincode(value: &str) -> DomainResult<()> {
    let v = value.trim();
    let ok = v.len() == 6 && v.chars().all(|c| c.is_ascii_digit()) && !v.starts_with('0');
    if ok {
        Ok(())
    } else {
        Err(DomainError::validation(format!("invalid pincode '{value}'")))
    }
}

/// Finite and strictly greater than zero.
pub fn validate_positive(field: &str, value: f64) -> DomainResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(DomainError::validation(format!("{field} must be greater than zero")))
    }
}

/// Finite and zero or greater.
pub fn validate_non_negative(field: &str, value: f64) -> DomainResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(DomainError::validation(format!("{field} cannot be negative")))
    }
}

pub fn validate_percentage(field: &str, value: f64) -> DomainResult<()> {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(DomainError::validation(format!("{field} must be between 0 and 100")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn name_under_two_characters_is_rejected() {
        assert!(validate_name("name", "A").is_err());
        assert!(validate_name("name", "  A  ").is_err());
        assert!(validate_name("name", "").is_err());
        assert!(validate_name("name", "Al").is_ok());
    }

    #[test]
    fn name_over_limit_is_rejected() {
        let long = "x".repeat(NAME_MAX_LEN + 1);
        let err = validate_name("company name", &long).unwrap_err();
        assert_eq!(
            err,
            DomainError::validation("company name must be at most 100 characters")
        );
    }

    #[test]
    fn email_shapes() {
        assert!(validate_email("orders@kashmirrugs.in").is_ok());
        assert!(validate_email("a.b+c@mail.co").is_ok());
        assert!(validate_email("missing-at.in").is_err());
        assert!(validate_email("@nolocal.in").is_err());
        assert!(validate_email("no@tld").is_err());
        assert!(validate_email("two@@signs.in").is_err());
        assert!(validate_email("sp ace@x.in").is_err());
    }

    #[test]
    fn indian_mobile_numbers() {
        assert_eq!(normalize_phone("9876543210").unwrap(), "9876543210");
        assert_eq!(normalize_phone("+91 98765-43210").unwrap(), "9876543210");
        assert_eq!(normalize_phone("09876543210").unwrap(), "9876543210");
        assert_eq!(normalize_phone("919876543210").unwrap(), "9876543210");
        assert!(validate_phone("5876543210").is_err());
        assert!(validate_phone("98765").is_err());
        assert!(validate_phone("98765abcde").is_err());
    }

    #[test]
    fn gstin_format() {
        assert!(validate_gstin("27AAPFU0939F1ZV").is_ok());
        assert!(validate_gstin("27aapfu0939f1zv").is_ok());
        assert!(validate_gstin("27AAPFU0939F1XV").is_err());
        assert!(validate_gstin("27AAPFU0939F0ZV").is_err());
        assert!(validate_gstin("27AAPFU0939F1Z").is_err());
    }

    #[test]
    fn pincode_format() {
        assert!(validate_pincode("221401").is_ok());
        assert!(validate_pincode("021401").is_err());
        assert!(validate_pincode("22140").is_err());
    }

    #[test]
    fn numeric_ranges() {
        assert!(validate_positive("quantity", 0.5).is_ok());
        assert!(validate_positive("quantity", 0.0).is_err());
        assert!(validate_positive("quantity", f64::NAN).is_err());
        assert!(validate_non_negative("stock", 0.0).is_ok());
        assert!(validate_non_negative("stock", -0.1).is_err());
        assert!(validate_percentage("gst_rate", 18.0).is_ok());
        assert!(validate_percentage("gst_rate", 101.0).is_err());
    }

    proptest! {
        #[test]
        fn any_ten_digit_mobile_starting_six_to_nine_is_valid(
            first in 6u8..=9,
            rest in "[0-9]{9}"
        ) {
            let number = format!("{first}{rest}");
            prop_assert_eq!(normalize_phone(&number).unwrap(), number.clone());
            let prefixed = format!("+91{number}");
            prop_assert_eq!(normalize_phone(&prefixed).unwrap(), number);
        }
    }
}
