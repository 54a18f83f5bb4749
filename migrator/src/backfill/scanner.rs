use chrono::{SecondsFormat, Utc};
use config::shared::BackfillConfig;
use futures::future::join_all;
use metrics::counter;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::backfill::{MarkOutcome, SourceTable};
use crate::error::{MigratorError, MigratorResult};
use crate::failpoints::{BACKFILL__BEFORE_MARK, migrator_fail_point};
use crate::key::{KeyFields, project_key};
use crate::metrics::{
    MIGRATOR_BACKFILL_ITEMS_MARKED_TOTAL, MIGRATOR_BACKFILL_ITEMS_MISSING_TOTAL,
    MIGRATOR_BACKFILL_PAGES_TOTAL, TABLE_NAME_LABEL,
};
use crate::types::Image;

/// Progress of a backfill run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BackfillProgress {
    /// Key to pass to the next run, absent once the whole table has been stamped.
    pub last_evaluated_key: Option<Image>,
    pub pages: usize,
    pub items_marked: usize,
    /// Items that were deleted between the scan and their update.
    pub items_missing: usize,
}

impl BackfillProgress {
    pub fn is_complete(&self) -> bool {
        self.last_evaluated_key.is_none()
    }
}

/// Stamps every item of a source table with the migration marker attribute.
#[derive(Debug)]
pub struct Backfill<S> {
    config: BackfillConfig,
    key_fields: KeyFields,
    source: S,
}

impl<S> Backfill<S>
where
    S: SourceTable + Sync,
{
    pub fn new(config: BackfillConfig, source: S) -> Self {
        let key_fields = KeyFields::new(&config.key_fields);

        Self {
            config,
            key_fields,
            source,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Scans and stamps pages starting after `start_key` until the table is exhausted or the
    /// time budget has elapsed.
    ///
    /// The items of a page are stamped concurrently. If any of them fails, the run stops with
    /// all failures of that page aggregated and can be resumed from the key returned by the
    /// previous run.
    pub async fn run(&self, start_key: Option<Image>) -> MigratorResult<BackfillProgress> {
        let started = Instant::now();
        let table_name = self.config.source_table.as_str();
        let mut progress = BackfillProgress::default();
        let mut exclusive_start_key = start_key;

        info!(
            table_name,
            resumed = exclusive_start_key.is_some(),
            source = S::name(),
            "starting backfill"
        );

        loop {
            let page = self
                .source
                .scan_keys(
                    table_name,
                    &self.key_fields,
                    self.config.page_size,
                    exclusive_start_key.as_ref(),
                )
                .await?;

            progress.pages += 1;
            counter!(
                MIGRATOR_BACKFILL_PAGES_TOTAL,
                TABLE_NAME_LABEL => table_name.to_owned()
            )
            .increment(1);

            self.mark_page(&page.items, &mut progress).await?;

            debug!(
                table_name,
                items = page.items.len(),
                pages = progress.pages,
                "backfilled page"
            );

            progress.last_evaluated_key = page.last_evaluated_key;
            let Some(last_evaluated_key) = &progress.last_evaluated_key else {
                break;
            };

            if let Some(time_budget) = self.config.time_budget()
                && started.elapsed() >= time_budget
            {
                info!(
                    table_name,
                    ?last_evaluated_key,
                    "backfill time budget elapsed, stopping"
                );
                break;
            }

            exclusive_start_key = Some(last_evaluated_key.clone());
        }

        info!(
            table_name,
            pages = progress.pages,
            items_marked = progress.items_marked,
            items_missing = progress.items_missing,
            complete = progress.is_complete(),
            "backfill finished"
        );

        Ok(progress)
    }

    async fn mark_page(
        &self,
        items: &[Image],
        progress: &mut BackfillProgress,
    ) -> MigratorResult<()> {
        let table_name = self.config.source_table.as_str();
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

        let marks = items.iter().map(|item| {
            let key = project_key(item, &self.key_fields);
            let timestamp = timestamp.as_str();
            async move {
                migrator_fail_point(BACKFILL__BEFORE_MARK)?;
                self.source
                    .mark_migrated(
                        table_name,
                        &key,
                        &self.config.migrated_attribute,
                        timestamp,
                    )
                    .await
            }
        });

        let mut errors: Vec<MigratorError> = Vec::new();
        let mut marked = 0;
        let mut missing = 0;
        for result in join_all(marks).await {
            match result {
                Ok(MarkOutcome::Marked) => marked += 1,
                Ok(MarkOutcome::Missing) => missing += 1,
                Err(err) => errors.push(err),
            }
        }

        progress.items_marked += marked;
        progress.items_missing += missing;
        counter!(
            MIGRATOR_BACKFILL_ITEMS_MARKED_TOTAL,
            TABLE_NAME_LABEL => table_name.to_owned()
        )
        .increment(marked as u64);
        counter!(
            MIGRATOR_BACKFILL_ITEMS_MISSING_TOTAL,
            TABLE_NAME_LABEL => table_name.to_owned()
        )
        .increment(missing as u64);

        if !errors.is_empty() {
            return Err(errors.into());
        }

        Ok(())
    }
}
