//! Domain validation for patient records.

mod patient;

pub use patient::*;
