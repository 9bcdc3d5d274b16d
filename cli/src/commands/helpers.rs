use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};

use weighlog_core::models::DATE_FORMAT;

/// Parse a date argument. Accepts `YYYY.MM.DD`, `YYYY-MM-DD`, `today` and
/// `yesterday`; `None` means today.
pub(crate) fn parse_date(date_str: Option<&str>) -> Result<NaiveDate> {
    let today = Local::now().date_naive();
    match date_str.map(str::trim) {
        None | Some("today") => Ok(today),
        Some("yesterday") => Ok(today - chrono::Duration::days(1)),
        Some(s) => NaiveDate::parse_from_str(s, DATE_FORMAT)
            .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
            .with_context(|| {
                format!("Invalid date '{s}'. Use YYYY.MM.DD, YYYY-MM-DD, today or yesterday")
            }),
    }
}

pub(crate) fn parse_weight(value: f64) -> Result<f64> {
    if !value.is_finite() || value <= 0.0 {
        bail!("Weight must be greater than 0");
    }
    Ok(value)
}

pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub(crate) fn json_error(message: &str) -> String {
    serde_json::json!({ "error": message }).to_string()
}

pub(crate) fn no_neg_zero(v: f64) -> f64 {
    if v == 0.0 { 0.0 } else { v }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_none() {
        let today = Local::now().date_naive();
        assert_eq!(parse_date(None).unwrap(), today);
    }

    #[test]
    fn test_parse_date_keywords() {
        let today = Local::now().date_naive();
        assert_eq!(parse_date(Some("today")).unwrap(), today);
        assert_eq!(
            parse_date(Some("yesterday")).unwrap(),
            today - chrono::Duration::days(1)
        );
    }

    #[test]
    fn test_parse_date_formats() {
        let want = NaiveDate::from_ymd_opt(2025, 7, 15).unwrap();
        assert_eq!(parse_date(Some("2025.07.15")).unwrap(), want);
        assert_eq!(parse_date(Some("2025-07-15")).unwrap(), want);
    }

    #[test]
    fn test_parse_date_invalid() {
        assert!(parse_date(Some("nope")).is_err());
        assert!(parse_date(Some("15/07/2025")).is_err());
    }

    #[test]
    fn test_parse_weight() {
        assert!((parse_weight(70.5).unwrap() - 70.5).abs() < f64::EPSILON);
        assert!(parse_weight(0.0).is_err());
        assert!(parse_weight(-1.0).is_err());
        assert!(parse_weight(f64::NAN).is_err());
    }

    #[test]
    fn test_json_error() {
        assert_eq!(json_error("oops"), r#"{"error":"oops"}"#);
    }

    #[test]
    fn test_json_error_escapes_message() {
        let out = json_error(r#"bad "quote" \ path"#);
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["error"], r#"bad "quote" \ path"#);
    }

    #[test]
    fn test_no_neg_zero() {
        assert_eq!(no_neg_zero(-0.0).to_bits(), 0.0_f64.to_bits());
        assert_eq!(no_neg_zero(5.0), 5.0);
        assert_eq!(no_neg_zero(-3.0), -3.0);
    }
}
