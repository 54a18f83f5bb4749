//! Logging and metrics setup shared by the migrator binaries and tests.

pub mod metrics;
pub mod tracing;

pub use self::metrics::init_metrics;
pub use self::tracing::{LogFlusher, TracingError, init_test_tracing, init_tracing};
