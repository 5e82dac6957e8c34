//! Coercion of raw request values into declared parameter types.
//!
//! Text sources are parsed; structured sources are checked structurally.
//! Every function returns the field-level message on failure so the resolver
//! can aggregate it.

use serde_json::{Number, Value};

use super::request::RawValue;
use crate::domain::ParamType;

pub(crate) const NOT_A_STRING: &str = "not a string";
pub(crate) const NOT_AN_INTEGER: &str = "not an integer";
pub(crate) const NOT_A_NUMBER: &str = "not a number";
pub(crate) const NOT_A_BOOLEAN: &str = "not a boolean";
pub(crate) const NOT_AN_OBJECT: &str = "not a JSON object";
pub(crate) const NOT_AN_ARRAY: &str = "not a JSON array";

/// Coerces one raw value into `ty`.
pub(crate) fn coerce(raw: RawValue<'_>, ty: ParamType) -> Result<Value, &'static str> {
    match raw {
        RawValue::Text(text) => coerce_text(text, ty),
        RawValue::TextList(items) => coerce_list(&items, ty),
        RawValue::Structured(value) => coerce_structured(value, ty),
    }
}

fn coerce_text(text: &str, ty: ParamType) -> Result<Value, &'static str> {
    match ty {
        ParamType::String => Ok(Value::String(text.to_owned())),
        ParamType::Integer => text
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| NOT_AN_INTEGER),
        ParamType::Float => text
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or(NOT_A_NUMBER),
        ParamType::Boolean => parse_bool(text).map(Value::Bool).ok_or(NOT_A_BOOLEAN),
        ParamType::Object => match serde_json::from_str::<Value>(text) {
            Ok(value @ Value::Object(_)) => Ok(value),
            _ => Err(NOT_AN_OBJECT),
        },
        ParamType::Array => match serde_json::from_str::<Value>(text) {
            Ok(value @ Value::Array(_)) => Ok(value),
            _ => Err(NOT_AN_ARRAY),
        },
    }
}

/// Query values: arrays collect every occurrence, scalars take the first one.
///
/// A lone value holding a JSON array (`?ids=[1,2]`) is taken as that array;
/// any other lone value becomes a one-element list.
fn coerce_list(items: &[&str], ty: ParamType) -> Result<Value, &'static str> {
    match (ty, items) {
        (ParamType::Array, [single]) => match serde_json::from_str::<Value>(single) {
            Ok(value @ Value::Array(_)) => Ok(value),
            _ => Ok(Value::Array(vec![Value::String((*single).to_owned())])),
        },
        (ParamType::Array, _) => Ok(Value::Array(
            items.iter().map(|item| Value::String((*item).to_owned())).collect(),
        )),
        (_, _) => match items.first() {
            Some(first) => coerce_text(first, ty),
            None => Err(NOT_A_STRING),
        },
    }
}

fn coerce_structured(value: &Value, ty: ParamType) -> Result<Value, &'static str> {
    match (ty, value) {
        (ParamType::String, Value::String(_)) => Ok(value.clone()),
        (ParamType::String, _) => Err(NOT_A_STRING),

        (ParamType::Integer, Value::Number(n)) if n.is_i64() || n.is_u64() => Ok(value.clone()),
        (ParamType::Integer, Value::Number(n)) => match n.as_f64() {
            // 42.0 is accepted as 42; 42.5 is not.
            Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 => {
                Ok(Value::from(f as i64))
            }
            _ => Err(NOT_AN_INTEGER),
        },
        (ParamType::Float, Value::Number(n)) => n
            .as_f64()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or(NOT_A_NUMBER),
        (ParamType::Boolean, Value::Bool(_)) => Ok(value.clone()),

        // Scalars sent as JSON strings ("42", "true") follow the text rules.
        (ParamType::Integer | ParamType::Float | ParamType::Boolean, Value::String(text)) => {
            coerce_text(text, ty)
        }
        (ParamType::Integer, _) => Err(NOT_AN_INTEGER),
        (ParamType::Float, _) => Err(NOT_A_NUMBER),
        (ParamType::Boolean, _) => Err(NOT_A_BOOLEAN),

        // Documents are taken as-is and never re-parsed from strings.
        (ParamType::Object, Value::Object(_)) => Ok(value.clone()),
        (ParamType::Object, _) => Err(NOT_AN_OBJECT),
        (ParamType::Array, Value::Array(_)) => Ok(value.clone()),
        (ParamType::Array, _) => Err(NOT_AN_ARRAY),
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text(s: &str, ty: ParamType) -> Result<Value, &'static str> {
        coerce(RawValue::Text(s), ty)
    }

    fn structured(v: Value, ty: ParamType) -> Result<Value, &'static str> {
        coerce(RawValue::Structured(&v), ty)
    }

    #[test]
    fn test_text_integer() {
        assert_eq!(text("42", ParamType::Integer), Ok(json!(42)));
        assert_eq!(text(" -7 ", ParamType::Integer), Ok(json!(-7)));
        assert_eq!(text("abc", ParamType::Integer), Err(NOT_AN_INTEGER));
        assert_eq!(text("4.2", ParamType::Integer), Err(NOT_AN_INTEGER));
    }

    #[test]
    fn test_text_float_rejects_non_finite() {
        assert_eq!(text("2.5", ParamType::Float), Ok(json!(2.5)));
        assert_eq!(text("NaN", ParamType::Float), Err(NOT_A_NUMBER));
        assert_eq!(text("inf", ParamType::Float), Err(NOT_A_NUMBER));
    }

    #[test]
    fn test_text_boolean_spellings() {
        for yes in ["true", "TRUE", "1", "yes", "on"] {
            assert_eq!(text(yes, ParamType::Boolean), Ok(json!(true)), "{yes}");
        }
        for no in ["false", "0", "No", "off"] {
            assert_eq!(text(no, ParamType::Boolean), Ok(json!(false)), "{no}");
        }
        assert_eq!(text("maybe", ParamType::Boolean), Err(NOT_A_BOOLEAN));
    }

    #[test]
    fn test_text_object_and_array_parse_json() {
        assert_eq!(text(r#"{"a":1}"#, ParamType::Object), Ok(json!({"a": 1})));
        assert_eq!(text("[1,2]", ParamType::Object), Err(NOT_AN_OBJECT));
        assert_eq!(text("[1,2]", ParamType::Array), Ok(json!([1, 2])));
        assert_eq!(text("nope", ParamType::Array), Err(NOT_AN_ARRAY));
    }

    #[test]
    fn test_text_string_is_verbatim() {
        assert_eq!(text(" 42 ", ParamType::String), Ok(json!(" 42 ")));
    }

    #[test]
    fn test_list_feeds_array_and_first_wins_for_scalars() {
        let items = RawValue::TextList(vec!["a", "b"]);
        assert_eq!(coerce(items.clone(), ParamType::Array), Ok(json!(["a", "b"])));
        assert_eq!(coerce(items, ParamType::String), Ok(json!("a")));
    }

    #[test]
    fn test_single_list_item_feeds_array() {
        let plain = RawValue::TextList(vec!["a"]);
        let encoded = RawValue::TextList(vec!["[1,2]"]);
        assert_eq!(coerce(plain, ParamType::Array), Ok(json!(["a"])));
        assert_eq!(coerce(encoded, ParamType::Array), Ok(json!([1, 2])));
    }

    #[test]
    fn test_single_list_item_follows_scalar_rules() {
        assert_eq!(coerce(RawValue::TextList(vec!["7"]), ParamType::Integer), Ok(json!(7)));
        assert_eq!(
            coerce(RawValue::TextList(vec!["x"]), ParamType::Integer),
            Err(NOT_AN_INTEGER)
        );
    }

    #[test]
    fn test_structured_object_taken_as_is() {
        let doc = json!({"lines": [{"sku": "A1", "qty": 2}]});
        assert_eq!(structured(doc.clone(), ParamType::Object), Ok(doc));
    }

    #[test]
    fn test_structured_object_is_not_reparsed_from_string() {
        assert_eq!(
            structured(json!(r#"{"a":1}"#), ParamType::Object),
            Err(NOT_AN_OBJECT)
        );
    }

    #[test]
    fn test_structured_integer_variants() {
        assert_eq!(structured(json!(5), ParamType::Integer), Ok(json!(5)));
        assert_eq!(structured(json!(5.0), ParamType::Integer), Ok(json!(5)));
        assert_eq!(structured(json!(5.5), ParamType::Integer), Err(NOT_AN_INTEGER));
        assert_eq!(structured(json!("12"), ParamType::Integer), Ok(json!(12)));
        assert_eq!(structured(json!(true), ParamType::Integer), Err(NOT_AN_INTEGER));
    }

    #[test]
    fn test_structured_string_requires_json_string() {
        assert_eq!(structured(json!("x"), ParamType::String), Ok(json!("x")));
        assert_eq!(structured(json!(1), ParamType::String), Err(NOT_A_STRING));
    }

    #[test]
    fn test_structured_float_accepts_integers() {
        assert_eq!(structured(json!(3), ParamType::Float), Ok(json!(3.0)));
    }
}
