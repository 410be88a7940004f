mod patients;

pub use patients::PostgresPatientRepo;
