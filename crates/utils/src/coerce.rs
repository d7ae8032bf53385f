//! Loose value coercions for form submissions.
//!
//! Browser forms deliver everything as strings, while JSON clients may send
//! numbers, booleans or lists for the same field. The helpers in this
//! module collapse all of those shapes into the scalar the compose record
//! needs, following the loose truthiness and numeric conversion rules the
//! LMS host applies to request data. Every function is total: malformed
//! input maps to a default instead of an error.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Leading numeric prefix: optional sign, digits with optional fraction,
/// optional exponent.
static NUMERIC_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?").expect("valid numeric prefix regex")
});

/// Whether `value` is "empty": null, `false`, `0`, `0.0`, `""`, `"0"` or an
/// empty list/map.
///
/// # Examples
///
/// ```rust
/// use serde_json::json;
///
/// assert!(quickmail_utils::is_empty(&json!("0")));
/// assert!(quickmail_utils::is_empty(&json!([])));
/// assert!(!quickmail_utils::is_empty(&json!("0.0")));
/// ```
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().map(|f| f == 0.0).unwrap_or(false),
        Value::String(s) => s.is_empty() || s == "0",
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// Boolean cast, the negation of [`is_empty`].
pub fn to_bool(value: &Value) -> bool {
    !is_empty(value)
}

/// Integer cast.
///
/// Strings contribute their leading numeric prefix (after leading
/// whitespace), so `"42abc"` is `42` and `"abc"` is `0`. Fractions are
/// truncated toward zero and non-finite floats become `0`. Lists and maps
/// cast to `1` when non-empty.
///
/// # Examples
///
/// ```rust
/// use serde_json::json;
///
/// assert_eq!(quickmail_utils::to_int(&json!(" 17 ")), 17);
/// assert_eq!(quickmail_utils::to_int(&json!("12.9")), 12);
/// assert_eq!(quickmail_utils::to_int(&json!(null)), 0);
/// ```
pub fn to_int(value: &Value) -> i64 {
    match value {
        Value::Null => 0,
        Value::Bool(b) => i64::from(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => i,
            None => n.as_f64().map(float_to_int).unwrap_or(0),
        },
        Value::String(s) => str_to_int(s),
        Value::Array(a) => i64::from(!a.is_empty()),
        Value::Object(o) => i64::from(!o.is_empty()),
    }
}

/// Integer cast of a string, using its leading numeric prefix.
pub fn str_to_int(raw: &str) -> i64 {
    let trimmed = raw.trim_start_matches(is_php_whitespace);
    let Some(prefix) = NUMERIC_PREFIX.find(trimmed) else {
        return 0;
    };
    let prefix = prefix.as_str();
    if prefix.contains(['.', 'e', 'E']) {
        return prefix.parse::<f64>().map(float_to_int).unwrap_or(0);
    }
    match prefix.parse::<i64>() {
        Ok(i) => i,
        // out of range for i64, saturate in the direction of the sign
        Err(_) if prefix.starts_with('-') => i64::MIN,
        Err(_) => i64::MAX,
    }
}

/// String cast.
///
/// `true` becomes `"1"`, `false` and null become `""`, whole floats are
/// written without a fraction. Lists and maps have no scalar form and
/// become `""`.
pub fn to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => String::new(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return i.to_string();
            }
            match n.as_f64() {
                Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => {
                    format!("{}", f as i64)
                }
                Some(f) => f.to_string(),
                None => n.to_string(),
            }
        }
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => String::new(),
    }
}

/// Loose equality of `value` against the integer `target`.
///
/// Numbers and numeric strings compare numerically, booleans compare by
/// truthiness, null only equals `0`. Non-numeric strings, lists and maps
/// never match.
///
/// # Examples
///
/// ```rust
/// use serde_json::json;
///
/// assert!(quickmail_utils::loose_eq_int(&json!("-1"), -1));
/// assert!(quickmail_utils::loose_eq_int(&json!(-1.0), -1));
/// assert!(!quickmail_utils::loose_eq_int(&json!("-1abc"), -1));
/// ```
pub fn loose_eq_int(value: &Value, target: i64) -> bool {
    match value {
        Value::Null => target == 0,
        Value::Bool(b) => *b == (target != 0),
        Value::Number(n) => match n.as_i64() {
            Some(i) => i == target,
            None => n.as_f64().map(|f| f == target as f64).unwrap_or(false),
        },
        Value::String(s) => match parse_numeric_str(s) {
            Some(f) => f == target as f64,
            None => false,
        },
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// Parses a fully numeric string (surrounding whitespace allowed).
fn parse_numeric_str(raw: &str) -> Option<f64> {
    let trimmed = raw.trim_matches(is_php_whitespace);
    let prefix = NUMERIC_PREFIX.find(trimmed)?;
    if prefix.end() != trimmed.len() {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

fn float_to_int(value: f64) -> i64 {
    if value.is_finite() {
        value.trunc() as i64
    } else {
        0
    }
}

fn is_php_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0B' | '\x0C')
}
