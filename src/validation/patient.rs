//! Rules a candidate patient must satisfy before it is stored.
//!
//! Every rule is evaluated; a candidate is acceptable only when none fail.
//! Rules that check the shape of a value (length, "in the past") pass when
//! the value is absent and leave that case to the matching "required" rule.
//! The age rule is the exception: an absent birth date fails it too.

use chrono::NaiveDate;
use serde::Serialize;
use validator::ValidateLength;

use crate::models::{CreatePatient, is_age_eligible, is_blank};

pub const NAME_MIN_CHARS: u64 = 2;
pub const NAME_MAX_CHARS: u64 = 100;

pub const FIRST_NAME_REQUIRED: &str = "First Name is required field";
pub const FIRST_NAME_SIZE: &str = "Size of First Name should be between 2 to 100 characters";
pub const LAST_NAME_REQUIRED: &str = "Last Name is required field";
pub const LAST_NAME_SIZE: &str = "Size of Last Name should be between 2 to 100 characters";
pub const GENDER_REQUIRED: &str = "Gender is required field";
pub const BIRTH_DAY_REQUIRED: &str = "Birthdate is required field";
pub const BIRTH_DAY_PAST: &str = "Date of Birth must be in the past";
pub const AGE_NOT_ELIGIBLE: &str = "Patient age should be greater than 18";

/// A single failed rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// JSON name of the offending field
    pub field: &'static str,
    pub message: &'static str,
}

struct Rule {
    field: &'static str,
    message: &'static str,
    /// Returns true when the candidate satisfies the rule.
    check: fn(&CreatePatient, NaiveDate) -> bool,
}

fn not_blank(value: Option<&str>) -> bool {
    value.is_some_and(|v| !is_blank(v))
}

fn length_ok(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.validate_length(Some(NAME_MIN_CHARS), Some(NAME_MAX_CHARS), None))
}

const RULES: &[Rule] = &[
    Rule {
        field: "firstName",
        message: FIRST_NAME_REQUIRED,
        check: |p, _| not_blank(p.first_name.as_deref()),
    },
    Rule {
        field: "firstName",
        message: FIRST_NAME_SIZE,
        check: |p, _| length_ok(p.first_name.as_deref()),
    },
    Rule {
        field: "lastName",
        message: LAST_NAME_REQUIRED,
        check: |p, _| not_blank(p.last_name.as_deref()),
    },
    Rule {
        field: "lastName",
        message: LAST_NAME_SIZE,
        check: |p, _| length_ok(p.last_name.as_deref()),
    },
    Rule {
        field: "gender",
        message: GENDER_REQUIRED,
        check: |p, _| p.gender.is_some(),
    },
    Rule {
        field: "birthDay",
        message: BIRTH_DAY_REQUIRED,
        check: |p, _| p.birth_day.is_some(),
    },
    Rule {
        field: "birthDay",
        message: BIRTH_DAY_PAST,
        check: |p, today| p.birth_day.is_none_or(|b| b < today),
    },
    Rule {
        field: "birthDay",
        message: AGE_NOT_ELIGIBLE,
        check: |p, today| is_age_eligible(p.birth_day, today),
    },
];

/// Evaluate every rule against `candidate` as of `today`.
///
/// An empty result means the candidate may be persisted.
pub fn validate_patient(candidate: &CreatePatient, today: NaiveDate) -> Vec<Violation> {
    RULES
        .iter()
        .filter(|rule| !(rule.check)(candidate, today))
        .map(|rule| Violation {
            field: rule.field,
            message: rule.message,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::models::Gender;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, 18).unwrap()
    }

    fn valid() -> CreatePatient {
        CreatePatient {
            first_name: Some("Praveen".into()),
            last_name: Some("Kumar".into()),
            gender: Some(Gender::Male),
            birth_day: NaiveDate::from_ymd_opt(1990, 5, 17),
        }
    }

    fn messages(candidate: &CreatePatient) -> Vec<&'static str> {
        validate_patient(candidate, today())
            .into_iter()
            .map(|v| v.message)
            .collect()
    }

    #[test]
    fn test_valid_candidate_has_no_violations() {
        assert!(validate_patient(&valid(), today()).is_empty());
    }

    #[rstest]
    #[case(0, vec![FIRST_NAME_REQUIRED, FIRST_NAME_SIZE])]
    #[case(1, vec![FIRST_NAME_SIZE])]
    #[case(2, vec![])]
    #[case(50, vec![])]
    #[case(100, vec![])]
    #[case(101, vec![FIRST_NAME_SIZE])]
    fn test_first_name_length(#[case] len: usize, #[case] expected: Vec<&'static str>) {
        let candidate = CreatePatient {
            first_name: Some("p".repeat(len)),
            ..valid()
        };
        assert_eq!(messages(&candidate), expected);
    }

    #[rstest]
    #[case(0, vec![LAST_NAME_REQUIRED, LAST_NAME_SIZE])]
    #[case(1, vec![LAST_NAME_SIZE])]
    #[case(2, vec![])]
    #[case(100, vec![])]
    #[case(101, vec![LAST_NAME_SIZE])]
    fn test_last_name_length(#[case] len: usize, #[case] expected: Vec<&'static str>) {
        let candidate = CreatePatient {
            last_name: Some("k".repeat(len)),
            ..valid()
        };
        assert_eq!(messages(&candidate), expected);
    }

    #[test]
    fn test_name_length_counts_characters_not_bytes() {
        let candidate = CreatePatient {
            first_name: Some("Ö".into()),
            last_name: Some("ü".repeat(100)),
            ..valid()
        };
        assert_eq!(messages(&candidate), vec![FIRST_NAME_SIZE]);
    }

    #[test]
    fn test_missing_first_name_reports_only_required() {
        let candidate = CreatePatient {
            first_name: None,
            ..valid()
        };
        assert_eq!(messages(&candidate), vec![FIRST_NAME_REQUIRED]);
    }

    #[test]
    fn test_whitespace_name_is_blank() {
        let candidate = CreatePatient {
            last_name: Some("   ".into()),
            ..valid()
        };
        assert_eq!(messages(&candidate), vec![LAST_NAME_REQUIRED]);
    }

    #[test]
    fn test_non_breaking_space_name_is_not_blank() {
        let candidate = CreatePatient {
            first_name: Some("\u{a0}\u{a0}".into()),
            ..valid()
        };
        assert!(messages(&candidate).is_empty());

        let candidate = CreatePatient {
            first_name: Some(" \t\n ".into()),
            ..valid()
        };
        assert_eq!(messages(&candidate), vec![FIRST_NAME_REQUIRED]);
    }

    #[test]
    fn test_missing_gender() {
        let candidate = CreatePatient {
            gender: None,
            ..valid()
        };
        let violations = validate_patient(&candidate, today());
        assert_eq!(
            violations,
            vec![Violation {
                field: "gender",
                message: GENDER_REQUIRED,
            }]
        );
    }

    #[test]
    fn test_missing_birth_day_reports_required_and_age() {
        let candidate = CreatePatient {
            birth_day: None,
            ..valid()
        };
        assert_eq!(
            messages(&candidate),
            vec![BIRTH_DAY_REQUIRED, AGE_NOT_ELIGIBLE]
        );
    }

    #[rstest]
    // 17 years old
    #[case(NaiveDate::from_ymd_opt(2007, 1, 1), vec![AGE_NOT_ELIGIBLE])]
    // One day short of 18
    #[case(NaiveDate::from_ymd_opt(2006, 10, 19), vec![AGE_NOT_ELIGIBLE])]
    // Exactly 18 today
    #[case(NaiveDate::from_ymd_opt(2006, 10, 18), vec![])]
    // 20 years old
    #[case(NaiveDate::from_ymd_opt(2004, 10, 18), vec![])]
    fn test_age_eligibility(
        #[case] birth_day: Option<NaiveDate>,
        #[case] expected: Vec<&'static str>,
    ) {
        let candidate = CreatePatient {
            birth_day,
            ..valid()
        };
        assert_eq!(messages(&candidate), expected);
    }

    #[rstest]
    #[case(today())]
    #[case(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap())]
    fn test_birth_day_not_in_past(#[case] birth_day: NaiveDate) {
        let candidate = CreatePatient {
            birth_day: Some(birth_day),
            ..valid()
        };
        assert_eq!(messages(&candidate), vec![BIRTH_DAY_PAST, AGE_NOT_ELIGIBLE]);
    }

    #[test]
    fn test_empty_candidate_reports_everything() {
        let violations = validate_patient(&CreatePatient::default(), today());
        let fields: Vec<_> = violations.iter().map(|v| v.field).collect();
        assert_eq!(
            fields,
            vec!["firstName", "lastName", "gender", "birthDay", "birthDay"]
        );
        assert_eq!(
            violations.iter().map(|v| v.message).collect::<Vec<_>>(),
            vec![
                FIRST_NAME_REQUIRED,
                LAST_NAME_REQUIRED,
                GENDER_REQUIRED,
                BIRTH_DAY_REQUIRED,
                AGE_NOT_ELIGIBLE,
            ]
        );
    }
}
