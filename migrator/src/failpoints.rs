use fail::fail_point;

use crate::bail;
use crate::error::{ErrorKind, MigratorResult};

pub const BATCH_SUBMIT__BEFORE_WRITE: &str = "batch_submit.before_write";
pub const BACKFILL__BEFORE_MARK: &str = "backfill.before_mark";

/// Fails with an error whose kind is selected by the fail point parameter.
///
/// Without the `failpoints` feature the fail point compiles to nothing and this always succeeds.
pub fn migrator_fail_point(name: &str) -> MigratorResult<()> {
    fail_point!(name, |parameter| {
        let error_kind = match parameter.as_deref() {
            Some("throttled") => ErrorKind::DestinationThrottled,
            Some("connection") => ErrorKind::DestinationConnectionFailed,
            Some("source") => ErrorKind::SourceError,
            _ => ErrorKind::InjectedFailure,
        };

        bail!(
            error_kind,
            "An error occurred in a fail point",
            format!("The failpoint '{name}' returned an error")
        );
    });

    Ok(())
}
