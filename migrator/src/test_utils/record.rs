use crate::types::{AttributeValue, ChangeRecord, Image};

/// Builds an image of string attributes.
pub fn image(pairs: &[(&str, &str)]) -> Image {
    pairs
        .iter()
        .map(|(name, value)| (*name, AttributeValue::from(*value)))
        .collect()
}

/// Builds the source key of an image from its first attribute.
fn source_key(pairs: &[(&str, &str)]) -> Image {
    image(&pairs[..pairs.len().min(1)])
}

/// Builds an insert whose source key is the first attribute of `new`.
pub fn inserted(new: &[(&str, &str)]) -> ChangeRecord {
    ChangeRecord::Inserted {
        new_image: image(new),
        source_key: source_key(new),
    }
}

/// Builds a modification whose source key is the first attribute of `new`.
pub fn modified(new: &[(&str, &str)], old: &[(&str, &str)]) -> ChangeRecord {
    ChangeRecord::Modified {
        new_image: image(new),
        old_image: image(old),
        source_key: source_key(new),
    }
}

/// Builds a removal whose source key is the first attribute of `old`.
pub fn removed(old: &[(&str, &str)]) -> ChangeRecord {
    ChangeRecord::Removed {
        old_image: image(old),
        source_key: source_key(old),
    }
}

/// Builds `count` inserts with distinct `pk` values `item-0`, `item-1`, ...
pub fn distinct_inserts(count: usize) -> Vec<ChangeRecord> {
    (0..count)
        .map(|i| {
            let pk = format!("item-{i}");
            inserted(&[("pk", pk.as_str()), ("data", "value")])
        })
        .collect()
}
