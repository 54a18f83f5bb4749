//! Destination key projection and comparison.

use std::borrow::Cow;

use config::shared::KeyMatchMode;

use crate::types::Image;

/// The attribute names identifying an item in the destination table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyFields(Vec<String>);

impl KeyFields {
    /// Creates key fields from attribute names, dropping repeated names.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut fields: Vec<String> = Vec::new();
        for name in names {
            let name = name.into();
            if !fields.contains(&name) {
                fields.push(name);
            }
        }

        Self(fields)
    }

    /// Returns the key fields of the declared configuration, or the attribute names of the
    /// source key when none are declared.
    pub fn resolve<'a>(declared: Option<&'a KeyFields>, source_key: &Image) -> Cow<'a, KeyFields> {
        match declared {
            Some(fields) => Cow::Borrowed(fields),
            None => Cow::Owned(KeyFields::new(source_key.attribute_names())),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|field| field == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Returns the subset of `image` whose attribute names are key fields.
///
/// Missing key attributes are skipped, so the result can be partial or empty.
pub fn project_key(image: &Image, key_fields: &KeyFields) -> Image {
    key_fields
        .iter()
        .filter_map(|field| image.get(field).map(|value| (field, value.clone())))
        .collect()
}

/// Returns the declared key fields missing from `image`.
pub fn missing_key_fields<'a>(image: &Image, key_fields: &'a KeyFields) -> Vec<&'a str> {
    key_fields
        .iter()
        .filter(|field| !image.contains(field))
        .collect()
}

/// Compares two keys by iterating the attributes of `a` only.
///
/// Every string, number or binary attribute of `a` must exist in `b` with the same kind and
/// payload. Attributes of other kinds in `a` are skipped and attributes only present in `b` are
/// not detected, so `keys_equal(a, b)` can differ from `keys_equal(b, a)`.
pub fn keys_equal(a: &Image, b: &Image) -> bool {
    a.iter().all(|(name, value)| match value.key_scalar() {
        None => true,
        Some(scalar) => b
            .get(name)
            .and_then(|other| other.key_scalar())
            .is_some_and(|other| other == scalar),
    })
}

/// Compares two keys requiring the same attribute names on both sides and equal scalar payloads.
pub fn keys_equal_symmetric(a: &Image, b: &Image) -> bool {
    a.len() == b.len()
        && a.attribute_names().eq(b.attribute_names())
        && keys_equal(a, b)
        && keys_equal(b, a)
}

/// Compares two keys with the comparator selected by `mode`.
pub fn keys_match(mode: KeyMatchMode, a: &Image, b: &Image) -> bool {
    match mode {
        KeyMatchMode::FirstOperand => keys_equal(a, b),
        KeyMatchMode::Symmetric => keys_equal_symmetric(a, b),
    }
}
