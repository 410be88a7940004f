mod patient;
mod validators;

pub use patient::*;
pub use validators::*;
