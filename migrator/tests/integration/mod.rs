mod backfill_test;
mod batching_test;
mod stream_events_test;
