use config::shared::{BatchConfig, KeyMatchMode};

use crate::key::keys_match;
use crate::types::{BatchEntry, Image, SizeHint, WriteRequest};

/// The open batch of write requests accumulated between two flushes.
///
/// The batch itself does not enforce its limits; [`crate::replication::ChangeBatcher`] asks
/// before every append whether the entry can join it.
#[derive(Debug)]
pub struct WriteBatch {
    entries: Vec<BatchEntry>,
    size_bytes: usize,
    max_entries: usize,
    max_bytes: Option<usize>,
    key_match: KeyMatchMode,
}

impl WriteBatch {
    pub fn new(config: &BatchConfig, key_match: KeyMatchMode) -> Self {
        Self {
            entries: Vec::with_capacity(config.max_entries),
            size_bytes: 0,
            max_entries: config.max_entries,
            max_bytes: config.max_bytes,
            key_match,
        }
    }

    /// Returns `true` if an entry of the batch has a key matching `key`.
    ///
    /// Each existing entry key is the first operand of the comparison.
    pub fn contains_key(&self, key: &Image) -> bool {
        self.entries
            .iter()
            .any(|entry| keys_match(self.key_match, &entry.key, key))
    }

    /// Returns `true` once the batch holds as many entries as allowed.
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.max_entries
    }

    /// Returns `true` if appending `entry` would push the estimated size over the byte ceiling.
    ///
    /// An empty batch always accepts an entry, so a single oversized entry is still submitted and
    /// left for the destination to reject.
    pub fn exceeds_bytes_with(&self, entry: &BatchEntry) -> bool {
        match self.max_bytes {
            Some(max_bytes) => {
                !self.entries.is_empty() && self.size_bytes + entry.size_hint() > max_bytes
            }
            None => false,
        }
    }

    pub fn push(&mut self, entry: BatchEntry) {
        self.size_bytes += entry.size_hint();
        self.entries.push(entry);
    }

    /// Empties the batch and returns its write requests in insertion order.
    pub fn take_requests(&mut self) -> Vec<WriteRequest> {
        self.size_bytes = 0;
        std::mem::take(&mut self.entries)
            .into_iter()
            .map(|entry| entry.request)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }
}
