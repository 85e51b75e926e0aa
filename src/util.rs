// Utility helpers for parsing sensor exports and formatting numbers.
//
// Sensor exports arrive with blank cells, "NA" markers and thousands
// separators; everything here turns those into `Option`s so the rest of
// the crate only ever sees typed values.
use chrono::NaiveDate;
use num_format::{Locale, ToFormattedString};

/// Date layouts seen in the reading exports, tried in order.
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y", "%Y/%m/%d"];

/// Reading cell to `f64`. Blank cells, "NA" markers and the `NaN`/`inf`
/// spellings some loggers write all come back as `None`; scientific
/// notation such as `1e-3` is a real reading.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim().replace(',', "");
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn parse_u64_safe(s: Option<&str>) -> Option<u64> {
    let s = s?.trim().replace(',', "");
    if s.is_empty() {
        return None;
    }
    s.parse::<u64>().ok()
}

pub fn parse_date_safe(s: Option<&str>) -> Option<NaiveDate> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    // Some exports append a time component; only the date matters here.
    let date_part = s.split(['T', ' ']).next().unwrap_or(s);
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
}

/// Trim a text cell, substituting `fallback` when it is missing or blank.
pub fn clean_text(s: Option<&str>, fallback: &str) -> String {
    match s.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => fallback.to_string(),
    }
}

/// Trim a text cell, returning `None` when it is missing or blank.
pub fn non_blank(s: Option<&str>) -> Option<String> {
    s.map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Mean of the latest readings in a scope. Callers skip scopes with no
/// readings, so the empty case only guards against a zero divisor.
pub fn average(v: &[f64]) -> f64 {
    if v.is_empty() {
        return 0.0;
    }
    let sum: f64 = v.iter().copied().sum();
    sum / v.len() as f64
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals with locale-aware thousands separators, e.g. `1,234.50`.
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        res.push('.');
        res.push_str(frac);
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

/// Format an optional reading, printing `-` for a missing value.
pub fn format_reading(v: Option<f64>, decimals: usize) -> String {
    v.map(|n| format_number(n, decimals))
        .unwrap_or_else(|| "-".to_string())
}

/// Record and row counts for the console, grouped like `12,480`.
pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_f64_handles_noise() {
        assert_eq!(parse_f64_safe(Some(" 0.35 ")), Some(0.35));
        assert_eq!(parse_f64_safe(Some("1,250")), Some(1250.0));
        assert_eq!(parse_f64_safe(Some("NA")), None);
        assert_eq!(parse_f64_safe(Some("")), None);
        assert_eq!(parse_f64_safe(None), None);
    }

    #[test]
    fn parse_f64_reads_logger_notation() {
        assert_eq!(parse_f64_safe(Some("1e-3")), Some(0.001));
        assert_eq!(parse_f64_safe(Some("2.5E1")), Some(25.0));
        assert_eq!(parse_f64_safe(Some("nan")), None);
        assert_eq!(parse_f64_safe(Some("inf")), None);
        assert_eq!(parse_f64_safe(Some("n/a")), None);
    }

    #[test]
    fn parse_date_accepts_export_layouts() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9);
        assert_eq!(parse_date_safe(Some("2024-03-09")), expected);
        assert_eq!(parse_date_safe(Some("09-03-2024")), expected);
        assert_eq!(parse_date_safe(Some("09/03/2024")), expected);
        assert_eq!(parse_date_safe(Some("2024-03-09T10:15:00")), expected);
        assert_eq!(parse_date_safe(Some("yesterday")), None);
    }

    #[test]
    fn format_number_groups_thousands() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-12.5, 1), "-12.5");
        assert_eq!(format_number(42.0, 0), "42");
        assert_eq!(format_reading(None, 2), "-");
    }

    #[test]
    fn scope_mean_and_row_counts() {
        assert_eq!(average(&[0.25, 0.75]), 0.5);
        assert_eq!(average(&[]), 0.0);
        assert_eq!(format_int(12480usize), "12,480");
    }

    #[test]
    fn clean_text_falls_back_on_blank() {
        assert_eq!(clean_text(Some("  Nagpur "), "Unknown"), "Nagpur");
        assert_eq!(clean_text(Some("   "), "Unknown"), "Unknown");
        assert_eq!(non_blank(Some(" ")), None);
    }
}
