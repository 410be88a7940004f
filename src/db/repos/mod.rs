mod patients;

pub use patients::*;
