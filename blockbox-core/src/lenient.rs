//! Forgiving deserializers for stored configuration.
//!
//! Stored presets come from admin forms and older plugin versions, so a field
//! may hold a number as a string (`"20px"`), a boolean as `"1"`, or an enum
//! value nobody recognises. Every helper here maps such input to `None` so the
//! resolvers can substitute the documented default instead of failing the
//! whole object.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Deserialize any `T`, yielding `None` when the value has the wrong shape.
pub fn optional<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match serde_json::from_value::<T>(v.clone()) {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            tracing::warn!(value = %v, error = %err, "ignoring malformed setting");
            None
        }
    }))
}

/// Numbers, numeric strings and CSS lengths like `"12px"`.
pub fn number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(number_from_value))
}

/// Booleans plus the `"true"`/`"1"`/`1` spellings form posts produce.
pub fn flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(flag_from_value))
}

pub fn number_from_value(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches("px").trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(n) if n.is_finite() => Some(n),
        _ => {
            if !value.is_null() {
                tracing::warn!(value = %value, "ignoring non-numeric setting");
            }
            None
        }
    }
}

pub fn flag_from_value(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(s) => match s.trim() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Decode a JSON document into `T`, falling back to `T::default()` on any error.
pub fn from_json_str<T>(input: &str) -> T
where
    T: DeserializeOwned + Default,
{
    if input.trim().is_empty() {
        return T::default();
    }
    match serde_json::from_str::<T>(input) {
        Ok(parsed) => parsed,
        Err(err) => {
            tracing::warn!(error = %err, "malformed JSON configuration, using defaults");
            T::default()
        }
    }
}

/// Same as [`from_json_str`] for an already-parsed value. A JSON string that
/// itself contains JSON (double-encoded columns) is unwrapped once.
pub fn from_json_value<T>(value: &Value) -> T
where
    T: DeserializeOwned + Default,
{
    match value {
        Value::Null => T::default(),
        Value::String(s) => from_json_str(s),
        other => match serde_json::from_value::<T>(other.clone()) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::warn!(error = %err, "malformed configuration object, using defaults");
                T::default()
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct Sample {
        #[serde(default, deserialize_with = "number")]
        size: Option<f64>,
        #[serde(default, deserialize_with = "flag")]
        enabled: Option<bool>,
    }

    #[test]
    fn test_number_accepts_css_lengths() {
        assert_eq!(number_from_value(&json!(12)), Some(12.0));
        assert_eq!(number_from_value(&json!("12px")), Some(12.0));
        assert_eq!(number_from_value(&json!(" 7 ")), Some(7.0));
        assert_eq!(number_from_value(&json!("wide")), None);
        assert_eq!(number_from_value(&json!([1])), None);
    }

    #[test]
    fn test_flag_spellings() {
        assert_eq!(flag_from_value(&json!(true)), Some(true));
        assert_eq!(flag_from_value(&json!("1")), Some(true));
        assert_eq!(flag_from_value(&json!(0)), Some(false));
        assert_eq!(flag_from_value(&json!("maybe")), None);
    }

    #[test]
    fn test_from_json_str_malformed_is_default() {
        let parsed: Sample = from_json_str("{not json");
        assert_eq!(parsed, Sample::default());
    }

    #[test]
    fn test_wrong_field_type_does_not_poison_object() {
        let parsed: Sample = from_json_value(&json!({"size": "big", "enabled": "1"}));
        assert_eq!(parsed.size, None);
        assert_eq!(parsed.enabled, Some(true));
    }

    #[test]
    fn test_double_encoded_value() {
        let parsed: Sample = from_json_value(&json!("{\"size\": 3}"));
        assert_eq!(parsed.size, Some(3.0));
    }
}
