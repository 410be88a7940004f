use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{
    db::error::DbResult,
    models::{Gender, NewPatient, Patient},
};

/// Storage for patient records.
///
/// Every list is ordered by last name ascending, with the id as a tiebreaker
/// so that results are stable.
#[async_trait]
pub trait PatientRepo: Send + Sync {
    /// Insert a validated record and return it with its assigned id.
    async fn create(&self, input: NewPatient) -> DbResult<Patient>;

    /// Get a patient by id.
    async fn get_by_id(&self, id: i64) -> DbResult<Option<Patient>>;

    /// List every patient.
    async fn list(&self) -> DbResult<Vec<Patient>>;

    /// List patients of the given gender.
    async fn list_by_gender(&self, gender: Gender) -> DbResult<Vec<Patient>>;

    /// List patients whose first and last name match exactly.
    async fn list_by_name(&self, first_name: &str, last_name: &str) -> DbResult<Vec<Patient>>;

    /// Delete a patient by id. Returns `DbError::NotFound` if no row matched.
    async fn delete(&self, id: i64) -> DbResult<()>;

    /// Delete every patient created strictly before `cutoff`.
    ///
    /// Returns the number of records removed.
    async fn delete_created_before(&self, cutoff: NaiveDate) -> DbResult<u64>;

    /// Count patients created strictly before `cutoff` without deleting them.
    async fn count_created_before(&self, cutoff: NaiveDate) -> DbResult<u64>;
}
