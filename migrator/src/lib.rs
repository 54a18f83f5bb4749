//! Change migration between DynamoDB-style tables.
//!
//! The crate consumes ordered change records captured from a source table, reshapes every image
//! through an [`mapping::ImageMapper`] and writes the result to a destination table in batches
//! of at most 25 requests. Batches never contain two requests for the same primary key, a
//! modification that changes the primary key becomes a put of the new item plus a delete of the
//! old one, and requests left unprocessed by the destination are retried with bounded backoff.
//!
//! The [`backfill`] module seeds a migration by stamping every existing source item so that the
//! change stream replays it.

#[cfg(feature = "dynamodb")]
pub mod clients;
pub mod backfill;
pub mod conversions;
pub mod destination;
pub mod error;
pub mod failpoints;
pub mod key;
mod macros;
pub mod mapping;
pub mod metrics;
pub mod replication;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod types;
