//! Seeding a migration from the existing contents of the source table.
//!
//! The change stream only carries changes, so items written before the migration started are
//! replayed by touching them: [`Backfill`] pages through the keys of the source table and stamps
//! every item with a migration marker attribute. Each stamp produces a modification on the
//! stream, which the change batcher then migrates like any other change.

mod base;
#[cfg(feature = "dynamodb")]
pub mod dynamodb;
pub mod memory;
mod scanner;

pub use base::{MarkOutcome, ScanPage, SourceTable};
pub use scanner::{Backfill, BackfillProgress};
