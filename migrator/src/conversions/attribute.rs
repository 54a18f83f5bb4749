use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::types::AttributeValue;

/// The JSON wire form of an [`AttributeValue`]: an object carrying exactly one type tag.
///
/// Binary payloads are base64 encoded. Nested list and map elements are themselves
/// [`AttributeValue`]s, so validation applies recursively while deserializing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WireAttributeValue {
    #[serde(rename = "S", default, skip_serializing_if = "Option::is_none")]
    s: Option<String>,
    #[serde(rename = "N", default, skip_serializing_if = "Option::is_none")]
    n: Option<String>,
    #[serde(rename = "B", default, skip_serializing_if = "Option::is_none")]
    b: Option<String>,
    #[serde(rename = "BOOL", default, skip_serializing_if = "Option::is_none")]
    bool: Option<bool>,
    #[serde(rename = "NULL", default, skip_serializing_if = "Option::is_none")]
    null: Option<bool>,
    #[serde(rename = "L", default, skip_serializing_if = "Option::is_none")]
    l: Option<Vec<AttributeValue>>,
    #[serde(rename = "M", default, skip_serializing_if = "Option::is_none")]
    m: Option<BTreeMap<String, AttributeValue>>,
    #[serde(rename = "SS", default, skip_serializing_if = "Option::is_none")]
    ss: Option<Vec<String>>,
    #[serde(rename = "NS", default, skip_serializing_if = "Option::is_none")]
    ns: Option<Vec<String>>,
    #[serde(rename = "BS", default, skip_serializing_if = "Option::is_none")]
    bs: Option<Vec<String>>,
}

/// Error raised when a wire value does not describe a valid [`AttributeValue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidAttributeValue(String);

impl fmt::Display for InvalidAttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid attribute value: {}", self.0)
    }
}

impl std::error::Error for InvalidAttributeValue {}

fn invalid(message: impl Into<String>) -> InvalidAttributeValue {
    InvalidAttributeValue(message.into())
}

impl WireAttributeValue {
    fn tag_count(&self) -> usize {
        [
            self.s.is_some(),
            self.n.is_some(),
            self.b.is_some(),
            self.bool.is_some(),
            self.null.is_some(),
            self.l.is_some(),
            self.m.is_some(),
            self.ss.is_some(),
            self.ns.is_some(),
            self.bs.is_some(),
        ]
        .into_iter()
        .filter(|present| *present)
        .count()
    }
}

impl TryFrom<WireAttributeValue> for AttributeValue {
    type Error = InvalidAttributeValue;

    fn try_from(wire: WireAttributeValue) -> Result<Self, Self::Error> {
        match wire.tag_count() {
            0 => return Err(invalid("no type tag present")),
            1 => {}
            count => return Err(invalid(format!("{count} type tags present, expected one"))),
        }

        let value = if let Some(value) = wire.s {
            AttributeValue::S(value)
        } else if let Some(value) = wire.n {
            AttributeValue::N(parse_number(value)?)
        } else if let Some(value) = wire.b {
            AttributeValue::B(decode_binary(&value)?)
        } else if let Some(value) = wire.bool {
            AttributeValue::Bool(value)
        } else if let Some(value) = wire.null {
            if !value {
                return Err(invalid("NULL must be true"));
            }
            AttributeValue::Null
        } else if let Some(values) = wire.l {
            AttributeValue::L(values)
        } else if let Some(values) = wire.m {
            AttributeValue::M(values)
        } else if let Some(values) = wire.ss {
            AttributeValue::Ss(check_set("SS", values)?)
        } else if let Some(values) = wire.ns {
            let values = values
                .into_iter()
                .map(parse_number)
                .collect::<Result<Vec<_>, _>>()?;
            AttributeValue::Ns(check_set("NS", values)?)
        } else if let Some(values) = wire.bs {
            let values = values
                .iter()
                .map(|value| decode_binary(value))
                .collect::<Result<Vec<_>, _>>()?;
            AttributeValue::Bs(check_set("BS", values)?)
        } else {
            return Err(invalid("no type tag present"));
        };

        Ok(value)
    }
}

impl From<AttributeValue> for WireAttributeValue {
    fn from(value: AttributeValue) -> Self {
        let mut wire = WireAttributeValue::default();
        match value {
            AttributeValue::S(value) => wire.s = Some(value),
            AttributeValue::N(value) => wire.n = Some(value),
            AttributeValue::B(value) => wire.b = Some(STANDARD.encode(value)),
            AttributeValue::Bool(value) => wire.bool = Some(value),
            AttributeValue::Null => wire.null = Some(true),
            AttributeValue::L(values) => wire.l = Some(values),
            AttributeValue::M(values) => wire.m = Some(values),
            AttributeValue::Ss(values) => wire.ss = Some(values),
            AttributeValue::Ns(values) => wire.ns = Some(values),
            AttributeValue::Bs(values) => {
                wire.bs = Some(values.into_iter().map(|v| STANDARD.encode(v)).collect())
            }
        }

        wire
    }
}

/// Validates the textual form of a number, keeping it unchanged.
fn parse_number(value: String) -> Result<String, InvalidAttributeValue> {
    let trimmed = value.trim();
    let parsed = trimmed.parse::<f64>().ok().filter(|number| number.is_finite());
    let textual = trimmed
        .bytes()
        .all(|byte| byte.is_ascii_digit() || matches!(byte, b'-' | b'+' | b'.' | b'e' | b'E'));

    match parsed {
        Some(_) if textual => Ok(value),
        _ => Err(invalid(format!("`{value}` is not a valid number"))),
    }
}

fn decode_binary(value: &str) -> Result<Vec<u8>, InvalidAttributeValue> {
    STANDARD
        .decode(value)
        .map_err(|err| invalid(format!("binary payload is not valid base64: {err}")))
}

/// Sets must be non-empty and must not contain duplicates.
fn check_set<T: Ord>(tag: &str, values: Vec<T>) -> Result<Vec<T>, InvalidAttributeValue> {
    if values.is_empty() {
        return Err(invalid(format!("{tag} set must not be empty")));
    }

    let distinct = values.iter().collect::<BTreeSet<_>>().len();
    if distinct != values.len() {
        return Err(invalid(format!("{tag} set contains duplicate elements")));
    }

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Image;

    fn parse(json: &str) -> Result<AttributeValue, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[test]
    fn decodes_every_type_tag() {
        assert_eq!(parse(r#"{"S":"a"}"#).unwrap(), AttributeValue::from("a"));
        assert_eq!(
            parse(r#"{"N":"-1.5e3"}"#).unwrap(),
            AttributeValue::N("-1.5e3".to_owned())
        );
        assert_eq!(
            parse(r#"{"B":"AQI="}"#).unwrap(),
            AttributeValue::B(vec![1, 2])
        );
        assert_eq!(parse(r#"{"BOOL":false}"#).unwrap(), AttributeValue::Bool(false));
        assert_eq!(parse(r#"{"NULL":true}"#).unwrap(), AttributeValue::Null);
        assert_eq!(
            parse(r#"{"L":[{"S":"x"},{"N":"2"}]}"#).unwrap(),
            AttributeValue::L(vec![
                AttributeValue::from("x"),
                AttributeValue::N("2".to_owned())
            ])
        );
        assert_eq!(
            parse(r#"{"SS":["a","b"]}"#).unwrap(),
            AttributeValue::Ss(vec!["a".to_owned(), "b".to_owned()])
        );
        assert_eq!(
            parse(r#"{"BS":["AA=="]}"#).unwrap(),
            AttributeValue::Bs(vec![vec![0]])
        );
    }

    #[test]
    fn rejects_zero_or_several_tags() {
        assert!(parse(r#"{}"#).is_err());
        assert!(parse(r#"{"S":"a","N":"1"}"#).is_err());
        assert!(parse(r#"{"X":"a"}"#).is_err());
    }

    #[test]
    fn rejects_invalid_payloads() {
        assert!(parse(r#"{"N":"abc"}"#).is_err());
        assert!(parse(r#"{"N":"NaN"}"#).is_err());
        assert!(parse(r#"{"B":"***"}"#).is_err());
        assert!(parse(r#"{"NULL":false}"#).is_err());
        assert!(parse(r#"{"SS":[]}"#).is_err());
        assert!(parse(r#"{"NS":["1","1"]}"#).is_err());
    }

    #[test]
    fn nested_values_are_validated() {
        assert!(parse(r#"{"M":{"inner":{"N":"oops"}}}"#).is_err());
    }

    #[test]
    fn images_serialize_in_wire_form() {
        let image = Image::new()
            .with("pk", "a")
            .with("blob", AttributeValue::B(vec![1, 2]));

        let json = serde_json::to_value(&image).unwrap();

        assert_eq!(
            json,
            serde_json::json!({"blob": {"B": "AQI="}, "pk": {"S": "a"}})
        );
        assert_eq!(serde_json::from_value::<Image>(json).unwrap(), image);
    }
}
