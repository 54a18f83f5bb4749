use crate::types::Image;

/// A single request of a batch write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteRequest {
    /// Creates or replaces the whole item.
    Put { item: Image },
    /// Deletes the item with the given primary key. Deleting a missing item succeeds.
    Delete { key: Image },
}

impl WriteRequest {
    pub fn is_put(&self) -> bool {
        matches!(self, WriteRequest::Put { .. })
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, WriteRequest::Delete { .. })
    }

    /// Returns the image carried by the request: the item for puts, the key for deletes.
    pub fn image(&self) -> &Image {
        match self {
            WriteRequest::Put { item } => item,
            WriteRequest::Delete { key } => key,
        }
    }
}

/// A write request paired with the projected destination key used for deduplication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    pub key: Image,
    pub request: WriteRequest,
}

impl BatchEntry {
    pub fn put(key: Image, item: Image) -> Self {
        Self {
            key,
            request: WriteRequest::Put { item },
        }
    }

    pub fn delete(key: Image) -> Self {
        Self {
            request: WriteRequest::Delete { key: key.clone() },
            key,
        }
    }
}
