//! Testing utilities for the change batcher and backfill.
//!
//! - [`record`] builds images and change records from string pairs.
//! - [`test_destination_wrapper`] records every batch write reaching a destination.
//! - [`failpoints`] configures fail points for fault injection tests.

#[cfg(feature = "failpoints")]
pub mod failpoints;
pub mod record;
pub mod test_destination_wrapper;
