use crate::types::{AttributeValue, BatchEntry, Image, WriteRequest};

/// Reports an approximate serialized size in bytes, following the store's item size rules.
pub trait SizeHint {
    /// Returns the approximate size in bytes for this value.
    fn size_hint(&self) -> usize;
}

/// Overhead charged for every list or map value and for each of their elements.
const CONTAINER_OVERHEAD: usize = 3;
const ELEMENT_OVERHEAD: usize = 1;

impl SizeHint for AttributeValue {
    fn size_hint(&self) -> usize {
        match self {
            AttributeValue::S(value) => value.len(),
            AttributeValue::N(value) => number_size(value),
            AttributeValue::B(value) => value.len(),
            AttributeValue::Bool(_) | AttributeValue::Null => 1,
            AttributeValue::L(values) => {
                CONTAINER_OVERHEAD
                    + values
                        .iter()
                        .map(|value| value.size_hint() + ELEMENT_OVERHEAD)
                        .sum::<usize>()
            }
            AttributeValue::M(values) => {
                CONTAINER_OVERHEAD
                    + values
                        .iter()
                        .map(|(name, value)| name.len() + value.size_hint() + ELEMENT_OVERHEAD)
                        .sum::<usize>()
            }
            AttributeValue::Ss(values) => values.iter().map(String::len).sum(),
            AttributeValue::Ns(values) => values.iter().map(|value| number_size(value)).sum(),
            AttributeValue::Bs(values) => values.iter().map(Vec::len).sum(),
        }
    }
}

/// Numbers are stored with two significant digits per byte plus one byte.
fn number_size(value: &str) -> usize {
    let digits = value.bytes().filter(u8::is_ascii_digit).count();
    digits.div_ceil(2) + 1
}

impl SizeHint for Image {
    fn size_hint(&self) -> usize {
        self.iter()
            .map(|(name, value)| name.len() + value.size_hint())
            .sum()
    }
}

impl SizeHint for WriteRequest {
    fn size_hint(&self) -> usize {
        self.image().size_hint()
    }
}

impl SizeHint for BatchEntry {
    fn size_hint(&self) -> usize {
        self.request.size_hint()
    }
}

impl<T> SizeHint for Option<T>
where
    T: SizeHint,
{
    fn size_hint(&self) -> usize {
        match self {
            Some(value) => value.size_hint(),
            None => 0,
        }
    }
}
