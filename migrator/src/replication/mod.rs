//! Change batching and batch submission.
//!
//! [`ChangeBatcher`] turns ordered change records into key-deduplicated batches and drives each
//! batch to completion through [`submit::submit_batch`].

mod batch;
pub mod batcher;
pub mod submit;

pub use batch::WriteBatch;
pub use batcher::{ChangeBatcher, ProcessSummary};
pub use submit::{Backoff, SubmitReport};
