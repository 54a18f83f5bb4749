//! Shared configuration types for the migrator library and the replicator binary.

mod backfill;
mod base;
mod batch;
mod destination;
mod mapping;
mod migrator;
mod replicator;
mod retry;

pub use backfill::BackfillConfig;
pub use base::ValidationError;
pub use batch::BatchConfig;
pub use destination::DestinationConfig;
pub use mapping::MappingRuleConfig;
pub use migrator::{KeyMatchMode, MigratorConfig};
pub use replicator::ReplicatorConfig;
pub use retry::RetryConfig;
