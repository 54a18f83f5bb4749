use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::conversions::attribute::WireAttributeValue;

/// A single attribute value of a table item.
///
/// Values serialize in the store's JSON wire form, where each value is an object with exactly one
/// type tag, e.g. `{"S": "hello"}` or `{"N": "42"}`. Numbers keep their textual representation
/// so no precision is lost between source and destination.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "WireAttributeValue", into = "WireAttributeValue")]
pub enum AttributeValue {
    S(String),
    N(String),
    B(Vec<u8>),
    Bool(bool),
    Null,
    L(Vec<AttributeValue>),
    M(BTreeMap<String, AttributeValue>),
    Ss(Vec<String>),
    Ns(Vec<String>),
    Bs(Vec<Vec<u8>>),
}

/// The scalar payload of a key attribute.
///
/// Only strings, numbers and binaries can be part of a primary key, so only those variants take
/// part in key comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyScalar<'a> {
    S(&'a str),
    N(&'a str),
    B(&'a [u8]),
}

impl AttributeValue {
    /// Returns the key scalar payload, or [`None`] for kinds that cannot be key attributes.
    pub fn key_scalar(&self) -> Option<KeyScalar<'_>> {
        match self {
            AttributeValue::S(value) => Some(KeyScalar::S(value)),
            AttributeValue::N(value) => Some(KeyScalar::N(value)),
            AttributeValue::B(value) => Some(KeyScalar::B(value)),
            _ => None,
        }
    }

    /// Returns the textual payload of string and number values.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::S(value) | AttributeValue::N(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the wire type tag of this value.
    pub fn type_tag(&self) -> &'static str {
        match self {
            AttributeValue::S(_) => "S",
            AttributeValue::N(_) => "N",
            AttributeValue::B(_) => "B",
            AttributeValue::Bool(_) => "BOOL",
            AttributeValue::Null => "NULL",
            AttributeValue::L(_) => "L",
            AttributeValue::M(_) => "M",
            AttributeValue::Ss(_) => "SS",
            AttributeValue::Ns(_) => "NS",
            AttributeValue::Bs(_) => "BS",
        }
    }
}

impl fmt::Display for KeyScalar<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyScalar::S(value) => write!(f, "S:{value}"),
            KeyScalar::N(value) => write!(f, "N:{value}"),
            KeyScalar::B(value) => write!(f, "B:{} bytes", value.len()),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::S(value.to_owned())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::S(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::N(value.to_string())
    }
}
