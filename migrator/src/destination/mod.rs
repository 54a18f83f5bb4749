//! Batch write destinations.
//!
//! The [`Destination`] trait is the batch submitter used by the change batcher. Implementations
//! apply up to 25 put or delete requests per call and report the requests they could not apply.

mod base;
#[cfg(feature = "dynamodb")]
pub mod dynamodb;
pub mod memory;

pub use base::{BatchWriteOutput, Destination};
