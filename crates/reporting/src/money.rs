/// Groups digits the Indian way: last three, then pairs (`12,34,567`).
pub fn format_indian_number(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let grouped = group_indian(&digits);
    if value < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }
    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut parts: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 2 {
        parts.push(&head[end - 2..end]);
        end -= 2;
    }
    parts.push(&head[..end]);
    parts.reverse();
    format!("{},{}", parts.join(","), tail)
}

/// `₹12,34,567.50`; negatives render as `-₹...`.
pub fn format_inr(amount: f64) -> String {
    if !amount.is_finite() {
        return "₹0.00".to_string();
    }
    let paise = (amount * 100.0).round() as i64;
    format_inr_paise(paise)
}

pub fn format_inr_paise(paise: i64) -> String {
    let sign = if paise < 0 { "-" } else { "" };
    let abs = paise.unsigned_abs();
    format!(
        "{sign}₹{}.{:02}",
        group_indian(&(abs / 100).to_string()),
        abs % 100
    )
}

const THOUSAND: f64 = 1_000.0;
const LAKH: f64 = 1_00_000.0;
const CRORE: f64 = 1_00_00_000.0;

/// Dashboard shorthand: `₹950`, `₹1.5 K`, `₹12.3 L`, `₹4.2 Cr`.
pub fn format_inr_compact(amount: f64) -> String {
    if !amount.is_finite() {
        return "₹0".to_string();
    }
    let sign = if amount < 0.0 { "-" } else { "" };
    let abs = amount.abs();
    let (scaled, suffix) = if abs >= CRORE {
        (abs / CRORE, " Cr")
    } else if abs >= LAKH {
        (abs / LAKH, " L")
    } else if abs >= THOUSAND {
        (abs / THOUSAND, " K")
    } else {
        return format!("{sign}₹{}", group_indian(&(abs.round() as u64).to_string()));
    };
    format!("{sign}₹{}{suffix}", one_decimal(scaled))
}

fn one_decimal(v: f64) -> String {
    let s = format!("{:.1}", (v * 10.0).floor() / 10.0);
    s.strip_suffix(".0").map(str::to_string).unwrap_or(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn indian_grouping() {
        assert_eq!(format_indian_number(0), "0");
        assert_eq!(format_indian_number(999), "999");
        assert_eq!(format_indian_number(1000), "1,000");
        assert_eq!(format_indian_number(100000), "1,00,000");
        assert_eq!(format_indian_number(1234567), "12,34,567");
        assert_eq!(format_indian_number(-123456789), "-12,34,56,789");
    }

    #[test]
    fn rupees_with_paise() {
        assert_eq!(format_inr(1234567.5), "₹12,34,567.50");
        assert_eq!(format_inr(0.0), "₹0.00");
        assert_eq!(format_inr(-250.0), "-₹250.00");
        assert_eq!(format_inr_paise(1_120_05), "₹1,120.05");
    }

    #[test]
    fn compact_suffixes() {
        assert_eq!(format_inr_compact(950.0), "₹950");
        assert_eq!(format_inr_compact(1500.0), "₹1.5 K");
        assert_eq!(format_inr_compact(2000.0), "₹2 K");
        assert_eq!(format_inr_compact(1234567.0), "₹12.3 L");
        assert_eq!(format_inr_compact(42_000_000.0), "₹4.2 Cr");
        assert_eq!(format_inr_compact(-1500.0), "-₹1.5 K");
    }

    proptest! {
        #[test]
        fn grouping_preserves_digits(n in any::<i64>()) {
            let formatted = format_indian_number(n);
            let stripped: String = formatted.chars().filter(|c| *c != ',').collect();
            prop_assert_eq!(stripped, n.to_string());
        }
    }
}
