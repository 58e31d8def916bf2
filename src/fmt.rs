use colored::Colorize;

/// Format a float as an amount with thousands separators: 1,234.56
pub fn money(val: f64) -> String {
    let negative = val < 0.0 && format!("{:.2}", val.abs()) != "0.00";
    let cents = format!("{:.2}", val.abs());
    let (int_part, dec_part) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));

    let mut with_commas = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    let with_commas: String = with_commas.chars().rev().collect();

    if negative {
        format!("-{with_commas}.{dec_part}")
    } else {
        format!("{with_commas}.{dec_part}")
    }
}

/// Outflows in red, inflows in green.
pub fn signed_money(val: f64) -> String {
    let text = money(val);
    if val < 0.0 {
        text.red().to_string()
    } else {
        text.green().to_string()
    }
}

/// Shortened fingerprint for table output.
pub fn short_hash(hash_id: &str) -> &str {
    hash_id.get(..12).unwrap_or(hash_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_formatting() {
        assert_eq!(money(1234.56), "1,234.56");
        assert_eq!(money(-500.00), "-500.00");
        assert_eq!(money(0.0), "0.00");
        assert_eq!(money(-0.001), "0.00");
        assert_eq!(money(1000000.99), "1,000,000.99");
        assert_eq!(money(42.10), "42.10");
    }

    #[test]
    fn test_short_hash() {
        assert_eq!(short_hash("0123456789abcdef"), "0123456789ab");
        assert_eq!(short_hash("abc"), "abc");
    }
}
