//! Scheduled purge of expired patient records.
//!
//! A background task wakes on a cron schedule and deletes every record whose
//! creation date falls before `today - retention years`. Runs are idempotent
//! and support dry-run mode for checking a policy before enabling it.

mod worker;

pub use worker::{PurgeJob, start_purge_worker};
