use std::fmt;

use crate::types::Image;

/// One change captured from the source table.
///
/// `source_key` is the key of the changed item as reported by the change source. Its attribute
/// names are the default destination key fields when none are configured.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeRecord {
    Inserted {
        new_image: Image,
        source_key: Image,
    },
    Modified {
        new_image: Image,
        old_image: Image,
        source_key: Image,
    },
    Removed {
        old_image: Image,
        source_key: Image,
    },
}

/// The kind of a [`ChangeRecord`], used in logs and metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Insert,
    Modify,
    Remove,
}

impl ChangeRecord {
    pub fn kind(&self) -> ChangeKind {
        match self {
            ChangeRecord::Inserted { .. } => ChangeKind::Insert,
            ChangeRecord::Modified { .. } => ChangeKind::Modify,
            ChangeRecord::Removed { .. } => ChangeKind::Remove,
        }
    }

    pub fn source_key(&self) -> &Image {
        match self {
            ChangeRecord::Inserted { source_key, .. }
            | ChangeRecord::Modified { source_key, .. }
            | ChangeRecord::Removed { source_key, .. } => source_key,
        }
    }

    /// Returns the image that is converted to produce the primary write request: the new image
    /// for inserts and modifications, the old image for removals.
    pub fn effective_image(&self) -> &Image {
        match self {
            ChangeRecord::Inserted { new_image, .. } | ChangeRecord::Modified { new_image, .. } => {
                new_image
            }
            ChangeRecord::Removed { old_image, .. } => old_image,
        }
    }
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Insert => "insert",
            ChangeKind::Modify => "modify",
            ChangeKind::Remove => "remove",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
