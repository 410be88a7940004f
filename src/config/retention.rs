use std::{collections::BTreeSet, str::FromStr};

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// `[patient]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatientConfig {
    pub records: PatientRecordsConfig,
}

/// `[patient.records]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatientRecordsConfig {
    pub retention: RetentionConfig,
}

/// Retention policy for patient records.
///
/// Records whose creation date is more than `years` calendar years before
/// the current date are removed by the purge job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetentionConfig {
    /// Number of whole years a record is kept after creation.
    pub years: u32,

    /// Log what would be deleted without deleting anything.
    #[serde(default)]
    pub dry_run: bool,
}

impl RetentionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.years.checked_mul(12).is_none() {
            return Err(ConfigError::Validation(format!(
                "patient.records.retention.years is out of range: {}",
                self.years
            )));
        }
        Ok(())
    }
}

/// `[app]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppSection {
    pub config: AppScheduleSection,
}

/// `[app.config]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppScheduleSection {
    pub schedule: ScheduleConfig,
}

/// Purge job schedule.
///
/// `time` is a cron expression with a leading seconds field, e.g.
/// `"0 0 0 * * *"` for every midnight (UTC). An optional trailing year field
/// is accepted.
///
/// Numeric day-of-week values use the `0-7` numbering where both `0` and
/// `7` are Sunday and `1` is Monday. Day names (`MON`, `Sun`) work as well.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScheduleConfig {
    pub time: String,
}

impl ScheduleConfig {
    /// Parse the cron expression.
    pub fn schedule(&self) -> Result<cron::Schedule, ConfigError> {
        let mut fields: Vec<String> = self.time.split_whitespace().map(String::from).collect();
        if let Some(day_of_week) = fields.get_mut(5) {
            *day_of_week = translate_day_of_week(day_of_week).map_err(|reason| {
                ConfigError::Validation(format!(
                    "app.config.schedule.time has an invalid day-of-week field ('{}'): {}",
                    self.time, reason
                ))
            })?;
        }

        cron::Schedule::from_str(&fields.join(" ")).map_err(|e| {
            ConfigError::Validation(format!(
                "app.config.schedule.time is not a valid cron expression ('{}'): {}",
                self.time, e
            ))
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.schedule().map(|_| ())
    }
}

/// Rewrite a day-of-week field from `0-7` (Sunday = 0 or 7) numbering to the
/// `cron` crate's `1-7` (Sunday = 1) numbering.
///
/// Purely numeric items (`1`, `1-5`, `0-6/2`, `1/2`) are expanded into an
/// explicit list of days. Anything else (`*`, `?`, `*/2`, names) is left for
/// the cron parser.
fn translate_day_of_week(field: &str) -> Result<String, String> {
    let items = field
        .split(',')
        .map(translate_day_of_week_item)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(items.join(","))
}

fn translate_day_of_week_item(item: &str) -> Result<String, String> {
    let numeric = item.starts_with(|c: char| c.is_ascii_digit())
        && item.chars().all(|c| c.is_ascii_digit() || c == '-' || c == '/');
    if !numeric {
        return Ok(item.to_string());
    }

    let parse = |s: &str| -> Result<u32, String> {
        s.parse::<u32>()
            .map_err(|_| format!("'{item}' is not a valid day of week"))
    };

    let (range, step) = match item.split_once('/') {
        Some((range, step)) => (range, Some(parse(step)?)),
        None => (item, None),
    };
    let (start, end) = match range.split_once('-') {
        Some((start, end)) => (parse(start)?, parse(end)?),
        // `n/step` runs to the end of the week
        None if step.is_some() => (parse(range)?, 7),
        None => {
            let day = parse(range)?;
            (day, day)
        }
    };
    let step = step.unwrap_or(1);

    if start > 7 || end > 7 {
        return Err(format!("'{item}' is outside 0-7"));
    }
    if start > end {
        return Err(format!("'{item}' has its range reversed"));
    }
    if step == 0 {
        return Err(format!("'{item}' has a zero step"));
    }

    let days: BTreeSet<u32> = (start..=end)
        .step_by(step as usize)
        .map(|day| if day == 0 || day == 7 { 1 } else { day + 1 })
        .collect();

    Ok(days
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(","))
}
