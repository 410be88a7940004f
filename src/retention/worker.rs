use std::sync::Arc;

use chrono::{DateTime, Months, NaiveDate, Utc};
use tokio_util::sync::CancellationToken;

use crate::{
    clock::Clock,
    config::RetentionConfig,
    db::{DbError, DbResult, PatientRepo},
    observability::metrics,
};

/// Results from a single purge run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurgeRunResult {
    /// Records created strictly before this date were eligible.
    pub cutoff: NaiveDate,
    /// Records deleted, or on a dry run the number that would have been.
    pub deleted: u64,
    pub dry_run: bool,
}

impl PurgeRunResult {
    pub fn has_deletions(&self) -> bool {
        self.deleted > 0
    }
}

/// One purge pass over the patient store.
#[derive(Clone)]
pub struct PurgeJob {
    patients: Arc<dyn PatientRepo>,
    clock: Arc<dyn Clock>,
    retention_years: u32,
    dry_run: bool,
}

impl PurgeJob {
    pub fn new(
        patients: Arc<dyn PatientRepo>,
        clock: Arc<dyn Clock>,
        config: &RetentionConfig,
    ) -> Self {
        Self {
            patients,
            clock,
            retention_years: config.years,
            dry_run: config.dry_run,
        }
    }

    /// Oldest creation date that survives a run on `today`.
    ///
    /// Calendar-aware: 29 February minus whole years lands on 28 February.
    pub fn cutoff(&self, today: NaiveDate) -> DbResult<NaiveDate> {
        self.retention_years
            .checked_mul(12)
            .and_then(|months| today.checked_sub_months(Months::new(months)))
            .ok_or_else(|| {
                DbError::Internal(format!(
                    "retention of {} years is out of range for {}",
                    self.retention_years, today
                ))
            })
    }

    /// Run a single purge pass.
    pub async fn run_once(&self) -> DbResult<PurgeRunResult> {
        let cutoff = self.cutoff(self.clock.today())?;

        tracing::info!(
            cutoff = %cutoff,
            retention_years = self.retention_years,
            "Purging patient records created before {}",
            cutoff
        );

        if self.dry_run {
            let matched = self.patients.count_created_before(cutoff).await?;
            tracing::info!(
                cutoff = %cutoff,
                matched,
                "DRY RUN: Would delete patient records created before {}",
                cutoff
            );
            return Ok(PurgeRunResult {
                cutoff,
                deleted: matched,
                dry_run: true,
            });
        }

        let deleted = self.patients.delete_created_before(cutoff).await?;
        if deleted > 0 {
            metrics::record_purge_deletions(deleted);
        }

        Ok(PurgeRunResult {
            cutoff,
            deleted,
            dry_run: false,
        })
    }
}

/// First fire time strictly after both the previous fire time and `now`.
///
/// An early timer wake-up never repeats the tick that just ran, and ticks
/// that passed during a slow run are skipped.
fn next_fire(
    schedule: &cron::Schedule,
    last: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    schedule.after(&last.max(now)).next()
}

/// Starts the purge worker as a background task.
///
/// Sleeps until each upcoming fire time of `schedule` (UTC), runs the job and
/// loops. Failed runs are logged and retried at the next tick. Returns when
/// `shutdown` is cancelled or the schedule has no upcoming times.
pub async fn start_purge_worker(
    job: PurgeJob,
    schedule: cron::Schedule,
    shutdown: CancellationToken,
) {
    let dry_run_msg = if job.dry_run { " (DRY RUN)" } else { "" };

    tracing::info!(
        schedule = %schedule,
        retention_years = job.retention_years,
        dry_run = job.dry_run,
        "Starting purge worker{}",
        dry_run_msg
    );

    let mut last = Utc::now();
    loop {
        let Some(next) = next_fire(&schedule, last, Utc::now()) else {
            tracing::warn!(schedule = %schedule, "Purge schedule has no upcoming runs, stopping");
            return;
        };
        let wait = (next - Utc::now()).to_std().unwrap_or_default();
        tracing::debug!(next_run = %next, "Purge worker sleeping");

        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!("Purge worker shutting down");
                return;
            }
            _ = tokio::time::sleep(wait) => {}
        }
        last = next;

        match job.run_once().await {
            Ok(result) => {
                metrics::record_purge_run("success");
                if result.has_deletions() {
                    tracing::info!(
                        cutoff = %result.cutoff,
                        deleted = result.deleted,
                        dry_run = result.dry_run,
                        "Purge run complete{}",
                        dry_run_msg
                    );
                } else {
                    tracing::debug!(cutoff = %result.cutoff, "Purge run complete, no records to delete");
                }
            }
            Err(e) => {
                metrics::record_purge_run("error");
                tracing::error!(error = %e, "Error running purge");
            }
        }
    }
}

#[cfg(all(test, feature = "database-sqlite"))]
mod tests {
    use std::str::FromStr;

    use chrono::TimeZone;

    use super::*;
    use crate::{
        clock::FixedClock,
        db::tests::harness::create_sqlite_db,
        models::{Gender, NewPatient},
    };

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn today() -> NaiveDate {
        date(2024, 10, 18)
    }

    fn config(years: u32, dry_run: bool) -> RetentionConfig {
        RetentionConfig { years, dry_run }
    }

    fn job(patients: Arc<dyn PatientRepo>, config: &RetentionConfig) -> PurgeJob {
        PurgeJob::new(patients, Arc::new(FixedClock(today())), config)
    }

    async fn seed(repo: &dyn PatientRepo, created_on: NaiveDate) -> i64 {
        repo.create(NewPatient {
            first_name: "Praveen".into(),
            last_name: "Kumar".into(),
            gender: Gender::Male,
            birth_day: date(1990, 5, 17),
            created_on,
        })
        .await
        .unwrap()
        .id
    }

    #[test]
    fn test_cutoff_subtracts_calendar_years() {
        let job = PurgeJob {
            patients: Arc::new(NoopRepo),
            clock: Arc::new(FixedClock(today())),
            retention_years: 1,
            dry_run: false,
        };
        assert_eq!(job.cutoff(today()).unwrap(), date(2023, 10, 18));
        assert_eq!(job.cutoff(date(2024, 2, 29)).unwrap(), date(2023, 2, 28));
    }

    #[test]
    fn test_cutoff_out_of_range() {
        let job = PurgeJob {
            patients: Arc::new(NoopRepo),
            clock: Arc::new(FixedClock(today())),
            retention_years: 300_000,
            dry_run: false,
        };
        assert!(matches!(job.cutoff(today()), Err(DbError::Internal(_))));
    }

    #[tokio::test]
    async fn test_run_once_deletes_only_expired_records() {
        let db = create_sqlite_db().await;
        let repo = db.patients();

        let two_years = seed(repo.as_ref(), date(2022, 10, 18)).await;
        let just_over = seed(repo.as_ref(), date(2023, 10, 17)).await;
        let boundary = seed(repo.as_ref(), date(2023, 10, 18)).await;
        let fresh = seed(repo.as_ref(), today()).await;

        let job = job(repo.clone(), &config(1, false));
        let result = job.run_once().await.unwrap();
        assert_eq!(
            result,
            PurgeRunResult {
                cutoff: date(2023, 10, 18),
                deleted: 2,
                dry_run: false,
            }
        );

        assert!(repo.get_by_id(two_years).await.unwrap().is_none());
        assert!(repo.get_by_id(just_over).await.unwrap().is_none());
        assert!(repo.get_by_id(boundary).await.unwrap().is_some());
        assert!(repo.get_by_id(fresh).await.unwrap().is_some());

        // A second run finds nothing new
        let again = job.run_once().await.unwrap();
        assert_eq!(again.deleted, 0);
        assert!(!again.has_deletions());
        assert_eq!(repo.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_run_once_dry_run_keeps_records() {
        let db = create_sqlite_db().await;
        let repo = db.patients();
        seed(repo.as_ref(), date(2020, 1, 1)).await;
        seed(repo.as_ref(), today()).await;

        let result = job(repo.clone(), &config(1, true)).run_once().await.unwrap();
        assert!(result.dry_run);
        assert_eq!(result.deleted, 1);
        assert_eq!(repo.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_run_once_empty_store() {
        let db = create_sqlite_db().await;
        let result = job(db.patients(), &config(5, false)).run_once().await.unwrap();
        assert_eq!(result.deleted, 0);
        assert_eq!(result.cutoff, date(2019, 10, 18));
    }

    #[tokio::test]
    async fn test_worker_stops_on_cancel() {
        let db = create_sqlite_db().await;
        let job = job(db.patients(), &config(1, false));
        let schedule = cron::Schedule::from_str("0 0 0 1 1 *").unwrap();
        let token = CancellationToken::new();
        token.cancel();

        tokio::time::timeout(
            std::time::Duration::from_secs(5),
            start_purge_worker(job, schedule, token),
        )
        .await
        .expect("Worker should stop once cancelled");
    }

    #[tokio::test]
    async fn test_worker_purges_on_schedule() {
        let db = create_sqlite_db().await;
        let repo = db.patients();
        seed(repo.as_ref(), date(2020, 1, 1)).await;
        let fresh = seed(repo.as_ref(), today()).await;

        let job = job(repo.clone(), &config(1, false));
        let schedule = cron::Schedule::from_str("* * * * * *").unwrap();
        let token = CancellationToken::new();
        let handle = tokio::spawn(start_purge_worker(job, schedule, token.clone()));

        tokio::time::sleep(std::time::Duration::from_millis(2500)).await;
        token.cancel();
        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .expect("Worker should stop once cancelled")
            .unwrap();

        let remaining = repo.list().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, fresh);
    }

    #[test]
    fn test_next_fire_does_not_repeat_tick_on_early_wake() {
        let schedule = cron::Schedule::from_str("* * * * * *").unwrap();
        let last = Utc.with_ymd_and_hms(2024, 10, 18, 0, 0, 1).unwrap();
        let early = last - chrono::Duration::milliseconds(1);

        assert_eq!(
            next_fire(&schedule, last, early),
            Some(Utc.with_ymd_and_hms(2024, 10, 18, 0, 0, 2).unwrap())
        );
    }

    #[test]
    fn test_next_fire_skips_ticks_missed_during_slow_run() {
        let schedule = cron::Schedule::from_str("* * * * * *").unwrap();
        let last = Utc.with_ymd_and_hms(2024, 10, 18, 0, 0, 1).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 10, 18, 0, 0, 5).unwrap()
            + chrono::Duration::milliseconds(500);

        assert_eq!(
            next_fire(&schedule, last, now),
            Some(Utc.with_ymd_and_hms(2024, 10, 18, 0, 0, 6).unwrap())
        );
    }

    /// Repo that is never called; for tests of pure date arithmetic.
    struct NoopRepo;

    #[async_trait::async_trait]
    impl PatientRepo for NoopRepo {
        async fn create(&self, _: NewPatient) -> DbResult<crate::models::Patient> {
            unreachable!()
        }
        async fn get_by_id(&self, _: i64) -> DbResult<Option<crate::models::Patient>> {
            unreachable!()
        }
        async fn list(&self) -> DbResult<Vec<crate::models::Patient>> {
            unreachable!()
        }
        async fn list_by_gender(&self, _: Gender) -> DbResult<Vec<crate::models::Patient>> {
            unreachable!()
        }
        async fn list_by_name(&self, _: &str, _: &str) -> DbResult<Vec<crate::models::Patient>> {
            unreachable!()
        }
        async fn delete(&self, _: i64) -> DbResult<()> {
            unreachable!()
        }
        async fn delete_created_before(&self, _: NaiveDate) -> DbResult<u64> {
            unreachable!()
        }
        async fn count_created_before(&self, _: NaiveDate) -> DbResult<u64> {
            unreachable!()
        }
    }
}
