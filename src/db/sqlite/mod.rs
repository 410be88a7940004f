mod common;
mod patients;

pub use patients::SqlitePatientRepo;
