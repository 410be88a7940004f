mod patients;

use std::sync::Arc;

pub use patients::{PatientError, PatientService};

use crate::{clock::Clock, db::DbPool};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub patients: PatientService,
}

impl Services {
    pub fn new(db: Arc<DbPool>, clock: Arc<dyn Clock>) -> Self {
        Self {
            patients: PatientService::new(db.patients(), clock),
        }
    }
}
