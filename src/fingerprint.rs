use chrono::NaiveDate;
use sha2::{Digest, Sha256};

/// Deterministic identity of a transaction: date, amount rounded to cents and
/// trimmed description. Used as the store's primary key and sole dedup key.
pub fn fingerprint(date: NaiveDate, amount: f64, description: &str) -> String {
    let raw = format!(
        "{}{}{}",
        date.format("%Y-%m-%d"),
        cents(amount),
        description.trim()
    );
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

/// Rounds to two decimals and renders without a negative zero.
fn cents(amount: f64) -> String {
    let rounded = round_cents(amount);
    if rounded == 0.0 {
        "0.00".to_string()
    } else {
        format!("{rounded:.2}")
    }
}

pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let a = fingerprint(d(2024, 5, 2), -42.5, "BAKERY");
        let b = fingerprint(d(2024, 5, 2), -42.5, "BAKERY");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_fingerprint_trims_and_rounds() {
        let a = fingerprint(d(2024, 5, 2), -42.5, "  BAKERY ");
        let b = fingerprint(d(2024, 5, 2), -42.499999, "BAKERY");
        assert_eq!(a, b);
    }

    #[test]
    fn test_fingerprint_distinguishes_fields() {
        let base = fingerprint(d(2024, 5, 2), -42.5, "BAKERY");
        assert_ne!(base, fingerprint(d(2024, 5, 3), -42.5, "BAKERY"));
        assert_ne!(base, fingerprint(d(2024, 5, 2), 42.5, "BAKERY"));
        assert_ne!(base, fingerprint(d(2024, 5, 2), -42.5, "BAKERY 2"));
    }

    #[test]
    fn test_negative_zero_collapses() {
        assert_eq!(
            fingerprint(d(2024, 1, 1), -0.001, "X"),
            fingerprint(d(2024, 1, 1), 0.0, "X")
        );
    }
}
