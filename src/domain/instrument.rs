//! Stock identity and price-history types.

use chrono::NaiveDateTime;

/// A tradable instrument: one row of the Stocks table.
#[derive(Debug, Clone, PartialEq)]
pub struct Stock {
    pub id: i64,
    pub ticker: String,
    pub name: String,
}

/// One appended price observation for a stock.
#[derive(Debug, Clone, PartialEq)]
pub struct PricePoint {
    pub ticker: String,
    pub at: NaiveDateTime,
    pub price: f64,
    pub volume: i64,
}

/// Latest quote for a stock plus its return over the report window.
#[derive(Debug, Clone, PartialEq)]
pub struct StockSummary {
    pub ticker: String,
    pub name: String,
    pub price: f64,
    pub return_pct: f64,
}

/// Percent change of `current` against `baseline`:
/// `(current - baseline) / baseline * 100`.
///
/// A missing or zero baseline yields 0.0.
pub fn percent_change(current: f64, baseline: Option<f64>) -> f64 {
    match baseline {
        Some(base) if base != 0.0 => (current - base) / base * 100.0,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_change_up() {
        let pct = percent_change(110.0, Some(100.0));
        assert!((pct - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn percent_change_down() {
        let pct = percent_change(90.0, Some(100.0));
        assert!((pct - (-10.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn percent_change_flat() {
        let pct = percent_change(42.5, Some(42.5));
        assert!((pct - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn percent_change_no_baseline() {
        let pct = percent_change(123.4, None);
        assert!((pct - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn percent_change_zero_baseline() {
        let pct = percent_change(123.4, Some(0.0));
        assert!(pct.is_finite());
        assert!((pct - 0.0).abs() < f64::EPSILON);
    }
}
