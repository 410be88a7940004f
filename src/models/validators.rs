use std::borrow::Cow;

use chrono::NaiveDate;
use validator::ValidationError;

/// Minimum age, in whole years, for a patient to be registered.
pub const MINIMUM_PATIENT_AGE: u32 = 18;

/// Whether `value` is empty once ASCII control characters and spaces
/// (`<= U+0020`) are stripped from both ends.
///
/// Other Unicode whitespace such as U+00A0 counts as content.
pub fn is_blank(value: &str) -> bool {
    value.trim_matches(|c: char| c <= ' ').is_empty()
}

/// Reject empty or whitespace-only strings.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if is_blank(value) {
        let mut err = ValidationError::new("blank");
        err.message = Some(Cow::Borrowed("Value cannot be empty or whitespace-only"));
        return Err(err);
    }
    Ok(())
}

/// Whole calendar years elapsed between `birth_day` and `today`.
///
/// `None` when `birth_day` is after `today`.
pub fn age_in_years(birth_day: NaiveDate, today: NaiveDate) -> Option<u32> {
    today.years_since(birth_day)
}

/// Whether a patient born on `birth_day` is old enough on `today`.
///
/// A missing birth date is never eligible.
pub fn is_age_eligible(birth_day: Option<NaiveDate>, today: NaiveDate) -> bool {
    birth_day
        .and_then(|b| age_in_years(b, today))
        .is_some_and(|age| age >= MINIMUM_PATIENT_AGE)
}
