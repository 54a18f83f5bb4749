//! Configuration types and loading for the migrator workspace.
//!
//! The [`shared`] module holds the serde types consumed by the `migrator` library and the
//! `replicator` binary, while [`load_config`] assembles them from configuration files and
//! `APP_`-prefixed environment variables.

mod environment;
mod load;
pub mod shared;

pub use environment::Environment;
pub use load::{Config, LoadConfigError, load_config, load_config_from};
