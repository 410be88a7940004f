use std::sync::Arc;

use thiserror::Error;

use crate::{
    clock::Clock,
    db::{DbError, PatientRepo},
    models::{CreatePatient, Gender, NewPatient, Patient},
    validation::{Violation, validate_patient},
};

/// Errors that can occur during patient operations.
#[derive(Debug, Error)]
pub enum PatientError {
    #[error("Validation failed: {}", messages(.0).join(", "))]
    Validation(Vec<Violation>),

    #[error("Patient with Id {0} not found")]
    NotFound(i64),

    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

fn messages(violations: &[Violation]) -> Vec<&'static str> {
    violations.iter().map(|v| v.message).collect()
}

pub type PatientResult<T> = Result<T, PatientError>;

/// Service layer for patient records
#[derive(Clone)]
pub struct PatientService {
    repo: Arc<dyn PatientRepo>,
    clock: Arc<dyn Clock>,
}

impl PatientService {
    pub fn new(repo: Arc<dyn PatientRepo>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    /// All patients, ordered by last name
    pub async fn list_all(&self) -> PatientResult<Vec<Patient>> {
        tracing::debug!(">> list_all");
        let patients = self.repo.list().await?;
        tracing::debug!(count = patients.len(), "<< list_all");
        Ok(patients)
    }

    /// Female patients, ordered by last name
    pub async fn list_female(&self) -> PatientResult<Vec<Patient>> {
        tracing::debug!(">> list_female");
        let patients = self.repo.list_by_gender(Gender::Female).await?;
        tracing::debug!(count = patients.len(), "<< list_female");
        Ok(patients)
    }

    pub async fn get_by_id(&self, id: i64) -> PatientResult<Option<Patient>> {
        tracing::debug!(id, ">> get_by_id");
        Ok(self.repo.get_by_id(id).await?)
    }

    /// Exact, case-sensitive match on both names
    pub async fn find_by_name(
        &self,
        first_name: &str,
        last_name: &str,
    ) -> PatientResult<Vec<Patient>> {
        tracing::debug!(first_name, last_name, ">> find_by_name");
        let patients = self.repo.list_by_name(first_name, last_name).await?;
        tracing::debug!(count = patients.len(), "<< find_by_name");
        Ok(patients)
    }

    /// Validate `candidate` and persist it, stamped with today's date.
    ///
    /// Nothing is written when any rule fails.
    pub async fn create(&self, candidate: CreatePatient) -> PatientResult<Patient> {
        let today = self.clock.today();
        let violations = validate_patient(&candidate, today);
        if !violations.is_empty() {
            tracing::debug!(violations = violations.len(), "Rejected patient record");
            return Err(PatientError::Validation(violations));
        }

        let (Some(first_name), Some(last_name), Some(gender), Some(birth_day)) = (
            candidate.first_name,
            candidate.last_name,
            candidate.gender,
            candidate.birth_day,
        ) else {
            return Err(PatientError::Database(DbError::Internal(
                "validated candidate is missing a required field".into(),
            )));
        };

        let patient = self
            .repo
            .create(NewPatient {
                first_name,
                last_name,
                gender,
                birth_day,
                created_on: today,
            })
            .await?;

        tracing::info!(id = patient.id, "Created patient record");
        Ok(patient)
    }

    /// Delete a patient. Unknown ids leave the store untouched.
    pub async fn delete(&self, id: i64) -> PatientResult<()> {
        if self.repo.get_by_id(id).await?.is_none() {
            return Err(PatientError::NotFound(id));
        }

        match self.repo.delete(id).await {
            Ok(()) => {
                tracing::info!(id, "Deleted patient record");
                Ok(())
            }
            // Removed between the lookup and the delete
            Err(DbError::NotFound) => Err(PatientError::NotFound(id)),
            Err(e) => Err(e.into()),
        }
    }
}
