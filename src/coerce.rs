//! Lenient readers for loosely typed JSON sent by the browser front end.

use serde::{Deserialize, Deserializer, de};
use serde_json::Value;

/// A boolean that also accepts the textual and numeric encodings used by forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlexBool(pub bool);

impl<'de> Deserialize<'de> for FlexBool {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(FlexBool(truthy(&value)))
    }
}

/// Interprets a JSON value as a flag.
///
/// Known words map explicitly (`sim`/`não` included); anything else falls back
/// to ordinary truthiness, so `"abc"` is true and `""` or `0` are false.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "on" | "sim" | "yes" | "y" => true,
            "false" | "0" | "off" | "nao" | "não" | "no" | "n" => false,
            _ => !s.is_empty(),
        },
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Reads an integer from a JSON number or a numeric string such as `" 07 "`.
///
/// Fractional numbers, booleans and anything else are rejected.
pub fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Deserializes an optional id given as a number or numeric string.
///
/// `null`, `0` and `""` mean "no id".
pub fn optional_id<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(value) => {
            let id = integer(&value)
                .and_then(|id| i32::try_from(id).ok())
                .ok_or_else(|| de::Error::custom(format!("expected an integer id, got {value}")))?;
            Ok((id != 0).then_some(id))
        }
    }
}

/// Deserializes an optional integer given as a number or numeric string.
pub fn optional_int<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(value) => integer(&value)
            .and_then(|n| i32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("expected an integer, got {value}"))),
    }
}

/// Deserializes optional free text that forms sometimes send as a number
/// (`"preco": 25.5`).
pub fn optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(value) => Err(de::Error::custom(format!("expected text, got {value}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truthy_words() {
        for word in ["true", "1", "on", "sim", "yes", "y", " SIM ", "Yes"] {
            assert!(truthy(&json!(word)), "{word}");
        }
        for word in ["false", "0", "off", "nao", "não", "no", "n", "NÃO"] {
            assert!(!truthy(&json!(word)), "{word}");
        }
    }

    #[test]
    fn test_truthy_fallback() {
        assert!(truthy(&json!("talvez")));
        assert!(!truthy(&json!("")));
        assert!(truthy(&json!(2)));
        assert!(!truthy(&json!(0.0)));
        assert!(truthy(&json!([1])));
        assert!(!truthy(&json!({})));
        assert!(truthy(&json!(true)));
    }

    #[test]
    fn test_flex_bool_deserialize() {
        let value: FlexBool = serde_json::from_value(json!("sim")).unwrap();
        assert_eq!(value, FlexBool(true));
        let value: Option<FlexBool> = serde_json::from_value(json!(null)).unwrap();
        assert_eq!(value, None);
    }

    #[test]
    fn test_integer() {
        assert_eq!(integer(&json!(" 07 ")), Some(7));
        assert_eq!(integer(&json!(12)), Some(12));
        assert_eq!(integer(&json!("abc")), None);
        assert_eq!(integer(&json!(3.5)), None);
        assert_eq!(integer(&json!(true)), None);
        assert_eq!(integer(&json!("")), None);
    }

    #[derive(Debug, Deserialize)]
    struct WithId {
        #[serde(default, deserialize_with = "optional_id")]
        id: Option<i32>,
    }

    #[test]
    fn test_optional_id() {
        let parsed: WithId = serde_json::from_value(json!({})).unwrap();
        assert_eq!(parsed.id, None);
        let parsed: WithId = serde_json::from_value(json!({"id": "12"})).unwrap();
        assert_eq!(parsed.id, Some(12));
        let parsed: WithId = serde_json::from_value(json!({"id": 0})).unwrap();
        assert_eq!(parsed.id, None);
        assert!(serde_json::from_value::<WithId>(json!({"id": "x"})).is_err());
    }

    #[derive(Debug, Deserialize)]
    struct WithPrice {
        #[serde(default, deserialize_with = "optional_text")]
        preco: Option<String>,
    }

    #[test]
    fn test_optional_text_accepts_numbers() {
        let parsed: WithPrice = serde_json::from_value(json!({"preco": 25.5})).unwrap();
        assert_eq!(parsed.preco.as_deref(), Some("25.5"));
        let parsed: WithPrice = serde_json::from_value(json!({"preco": "R$ 10"})).unwrap();
        assert_eq!(parsed.preco.as_deref(), Some("R$ 10"));
        let parsed: WithPrice = serde_json::from_value(json!({})).unwrap();
        assert_eq!(parsed.preco, None);
        assert!(serde_json::from_value::<WithPrice>(json!({"preco": [1]})).is_err());
    }
}
