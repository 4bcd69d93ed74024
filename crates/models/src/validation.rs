//! Field checks shared by product and inventory payloads.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde_json::Number;

use crate::errors::ModelError;

/// Largest integer a JSON float can carry without losing precision.
const MAX_EXACT_FLOAT_INT: f64 = 9_007_199_254_740_992.0;

/// Returns the trimmed value or an error naming the missing field.
pub fn require_text(field: &str, value: Option<&str>) -> Result<String, ModelError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ModelError::validation(format!("{field} is required"))),
    }
}

pub fn require<'a, T>(field: &str, value: Option<&'a T>) -> Result<&'a T, ModelError> {
    value.ok_or_else(|| ModelError::validation(format!("{field} is required")))
}

/// Product codes are used as URL path segments.
pub fn validate_codigo(codigo: &str) -> Result<(), ModelError> {
    if codigo.trim().is_empty() {
        return Err(ModelError::validation("codigo is required"));
    }
    if codigo.contains('/') || codigo.chars().any(char::is_control) {
        return Err(ModelError::validation("codigo must not contain '/' or control characters"));
    }
    Ok(())
}

/// Accepts `10` and `10.0`, rejects negatives, fractions and non-finite values.
pub fn non_negative_integer(field: &str, n: &Number) -> Result<u64, ModelError> {
    if let Some(v) = n.as_u64() {
        return Ok(v);
    }
    let err = || ModelError::validation(format!("{field} must be a non-negative integer"));
    match n.as_f64() {
        Some(f) if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= MAX_EXACT_FLOAT_INT => Ok(f as u64),
        _ => Err(err()),
    }
}

pub fn positive_integer(field: &str, n: &Number) -> Result<u64, ModelError> {
    match non_negative_integer(field, n) {
        Ok(0) | Err(_) => Err(ModelError::validation(format!("{field} must be a positive integer"))),
        Ok(v) => Ok(v),
    }
}

/// Non-negative amount with at most two decimal places.
pub fn price(field: &str, n: &Number) -> Result<Decimal, ModelError> {
    let err = || ModelError::validation(format!("{field} must be a non-negative number with at most 2 decimal places"));
    let d = Decimal::from_str(&n.to_string()).map_err(|_| err())?;
    if d.is_sign_negative() && !d.is_zero() {
        return Err(err());
    }
    let d = d.normalize();
    if d.scale() > 2 {
        return Err(err());
    }
    Ok(d)
}

/// RFC 3339 timestamp or a plain `YYYY-MM-DD` date taken as midnight UTC.
pub fn parse_fecha(raw: &str) -> Result<DateTime<Utc>, ModelError> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| ModelError::validation("fecha is not a valid date"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(v: serde_json::Value) -> Number {
        match v {
            serde_json::Value::Number(n) => n,
            other => panic!("not a number: {other}"),
        }
    }

    #[test]
    fn integers() {
        assert_eq!(non_negative_integer("cantidad", &num(serde_json::json!(0))), Ok(0));
        assert_eq!(non_negative_integer("cantidad", &num(serde_json::json!(10.0))), Ok(10));
        assert!(non_negative_integer("cantidad", &num(serde_json::json!(-1))).is_err());
        assert!(non_negative_integer("cantidad", &num(serde_json::json!(2.5))).is_err());
        assert!(positive_integer("cantidad", &num(serde_json::json!(0))).is_err());
        assert_eq!(positive_integer("cantidad", &num(serde_json::json!(7))), Ok(7));
    }

    #[test]
    fn prices_allow_two_decimals() {
        assert_eq!(price("p", &num(serde_json::json!(12.5))).map(|d| d.to_string()), Ok("12.5".into()));
        assert!(price("p", &num(serde_json::json!(0.99))).is_ok());
        assert!(price("p", &num(serde_json::json!(3))).is_ok());
        assert!(price("p", &num(serde_json::json!(1.234))).is_err());
        assert!(price("p", &num(serde_json::json!(-0.5))).is_err());
    }

    #[test]
    fn fecha_formats() {
        let d = parse_fecha("2024-03-01").expect("date");
        assert_eq!(d.to_rfc3339(), "2024-03-01T00:00:00+00:00");
        let ts = parse_fecha("2024-03-01T10:30:00-03:00").expect("timestamp");
        assert_eq!(ts.to_rfc3339(), "2024-03-01T13:30:00+00:00");
        assert!(parse_fecha("2024-13-45").is_err());
        assert!(parse_fecha("ayer").is_err());
    }

    #[test]
    fn codigo_rules() {
        assert!(validate_codigo("A1").is_ok());
        assert!(validate_codigo("  ").is_err());
        assert!(validate_codigo("a/b").is_err());
        assert_eq!(require_text("nombre", Some("  x ")), Ok("x".to_string()));
        assert!(require_text("nombre", None).is_err());
    }
}
