//! Raw compose form submissions.
//!
//! [`FormData`] holds a submission exactly as it arrived, either as a JSON
//! object or as `application/x-www-form-urlencoded` pairs. Bracketed keys
//! such as `message_editor[text]` or `included_entity_ids[]` are expanded
//! into nested maps and lists so both sources end up with the same shape.

use std::fmt::Display;

use serde_json::{Map, Value};
use tracing::debug;

/// Deepest bracket nesting accepted in urlencoded keys. Deeper keys are
/// dropped from the submission, as the host does with its own limit.
pub const MAX_INPUT_NESTING: usize = 64;

static NULL: Value = Value::Null;

/// Errors that can occur while reading a form submission.
#[derive(Debug)]
pub enum FormError {
    /// The payload is not valid JSON.
    Json(serde_json::Error),
    /// The payload is valid JSON but not an object.
    NotAnObject,
}

impl Display for FormError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormError::Json(e) => write!(f, "Form JSON error: {e}"),
            FormError::NotAnObject => write!(f, "Form data must be a JSON object"),
        }
    }
}

impl std::error::Error for FormError {}

impl From<serde_json::Error> for FormError {
    fn from(e: serde_json::Error) -> Self {
        FormError::Json(e)
    }
}

/// A loosely typed form submission keyed by field name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormData {
    fields: Map<String, Value>,
}

impl FormData {
    /// Creates an empty submission.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps a JSON value, which must be an object.
    pub fn from_value(value: Value) -> Result<Self, FormError> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            _ => Err(FormError::NotAnObject),
        }
    }

    /// Parses a JSON object submission.
    pub fn from_json(raw: &str) -> Result<Self, FormError> {
        Self::from_value(serde_json::from_str(raw)?)
    }

    /// Parses an `application/x-www-form-urlencoded` body.
    ///
    /// # Examples
    ///
    /// ```rust
    /// let form = quickmail_utils::FormData::from_urlencoded(
    ///     b"subject=Hi&message_editor%5Btext%5D=Body&included_entity_ids%5B%5D=user_1",
    /// );
    /// assert_eq!(form.get("subject"), "Hi");
    /// assert_eq!(form.get_nested("message_editor", "text"), "Body");
    /// assert_eq!(form.get("included_entity_ids"), &serde_json::json!(["user_1"]));
    /// ```
    pub fn from_urlencoded(body: &[u8]) -> Self {
        Self::from_pairs(form_urlencoded::parse(body))
    }

    /// Builds a submission from decoded key/value pairs, expanding bracketed
    /// keys. Later scalar values replace earlier ones for the same key, keys
    /// nested deeper than [`MAX_INPUT_NESTING`] are ignored.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut fields = Map::new();
        for (key, value) in pairs {
            let key = key.as_ref();
            let Some(segments) = split_key(key) else {
                debug!(key_len = key.len(), "Ignoring form key");
                continue;
            };
            insert_path(&mut fields, &segments, value.into());
        }
        Self { fields }
    }

    /// Sets a field, replacing any previous value.
    pub fn insert(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Returns the value of a top-level field, null when absent.
    pub fn get(&self, key: &str) -> &Value {
        self.fields.get(key).unwrap_or(&NULL)
    }

    /// Returns `key[field]`, null when either level is absent or `key` is
    /// not a map.
    pub fn get_nested(&self, key: &str, field: &str) -> &Value {
        match self.fields.get(key) {
            Some(Value::Object(inner)) => inner.get(field).unwrap_or(&NULL),
            _ => &NULL,
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Splits `a[b][]` into `["a", "b", ""]`. Keys with unbalanced brackets are
/// kept whole. Empty keys and keys with more than [`MAX_INPUT_NESTING`]
/// bracket groups yield `None`.
fn split_key(key: &str) -> Option<Vec<&str>> {
    if key.is_empty() {
        return None;
    }
    let open = match key.find('[') {
        Some(open) if open > 0 => open,
        _ => return Some(vec![key]),
    };

    let mut segments = vec![&key[..open]];
    let mut rest = &key[open..];
    while let Some(stripped) = rest.strip_prefix('[') {
        let Some(close) = stripped.find(']') else {
            return Some(vec![key]);
        };
        if segments.len() > MAX_INPUT_NESTING {
            return None;
        }
        segments.push(&stripped[..close]);
        rest = &stripped[close + 1..];
    }
    if !rest.is_empty() {
        return Some(vec![key]);
    }
    Some(segments)
}

/// Recursion depth is bounded by the segment count, which [`split_key`]
/// caps at [`MAX_INPUT_NESTING`] + 1.
fn insert_path(target: &mut Map<String, Value>, segments: &[&str], value: String) {
    let (head, rest) = match segments.split_first() {
        Some(split) => split,
        None => return,
    };

    let Some((next, tail)) = rest.split_first() else {
        target.insert(head.to_string(), Value::String(value));
        return;
    };

    let entry = target.entry(head.to_string());
    if next.is_empty() {
        let slot = entry.or_insert_with(|| Value::Array(Vec::new()));
        if !slot.is_array() {
            *slot = Value::Array(Vec::new());
        }
        if let Value::Array(items) = slot {
            if tail.is_empty() {
                items.push(Value::String(value));
            } else {
                let mut inner = Map::new();
                insert_path(&mut inner, tail, value);
                items.push(Value::Object(inner));
            }
        }
    } else {
        let slot = entry.or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        if let Value::Object(inner) = slot {
            insert_path(inner, rest, value);
        }
    }
}
