//! Validation of workout submissions into storable records.
//!
//! The ingestor never persists anything; it hands back candidate
//! [`WorkoutRecord`]s for the storage layer.

use chrono::{DateTime, Utc};
use tracing::debug;

use fitlog_core::calories::CalorieEstimator;
use fitlog_core::error::IngestError;
use fitlog_core::models::{
    FieldValue, ParsedWorkout, WorkoutRecord, WorkoutSubmission, RECOGNISED_FIELDS,
};
use fitlog_core::parser;

/// Submissions with fewer recognised fields than this are incomplete.
pub const MIN_PRESENT_FIELDS: usize = 5;

// ── WorkoutIngestor ───────────────────────────────────────────────────────────

/// Turns raw submissions into records with derived calories.
#[derive(Debug, Clone, Default)]
pub struct WorkoutIngestor {
    estimator: CalorieEstimator,
}

impl WorkoutIngestor {
    pub fn new(estimator: CalorieEstimator) -> Self {
        Self { estimator }
    }

    /// Validate `submission` and build the records it describes.
    ///
    /// Checks run in a fixed order, each with its own error:
    ///
    /// 1. absent or empty submission → [`IngestError::MissingSubmission`]
    /// 2. no non-empty category → [`IngestError::MissingCategory`]
    /// 3. fewer than five of the six recognised fields → [`IngestError::IncompleteFields`]
    /// 4. exactly five of six, or both a notation line and structured fields →
    ///    [`IngestError::InvalidFormat`]
    ///
    /// A structured submission yields one record; a notation line yields one
    /// record per `;`-separated workout. Every record is stamped with `now`.
    pub fn ingest(
        &self,
        owner: &str,
        submission: Option<&WorkoutSubmission>,
        now: DateTime<Utc>,
    ) -> Result<Vec<WorkoutRecord>, IngestError> {
        let submission = match submission {
            Some(s) if !s.is_empty() => s,
            _ => return Err(IngestError::MissingSubmission),
        };

        let categories = submission.categories();
        if categories.is_empty() {
            return Err(IngestError::MissingCategory);
        }

        let present = submission.present_fields().len();
        if present < MIN_PRESENT_FIELDS {
            return Err(IngestError::IncompleteFields { present });
        }
        if present < RECOGNISED_FIELDS.len() {
            return Err(IngestError::InvalidFormat(format!(
                "missing {}",
                submission.missing_fields().join(", ")
            )));
        }
        if submission.has_line() && submission.has_structured_fields() {
            return Err(IngestError::InvalidFormat(
                "give either a workout line or the individual workout fields, not both"
                    .to_string(),
            ));
        }

        let entries = match submission.line.as_deref() {
            Some(line) if submission.has_line() => parse_block(line)?,
            _ => vec![structured_entry(submission)?],
        };

        let category = categories.join(",");
        let records = entries
            .into_iter()
            .map(|entry| self.build_record(owner, &category, entry, now))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            owner,
            category = %category,
            count = records.len(),
            "submission accepted"
        );

        Ok(records)
    }

    fn build_record(
        &self,
        owner: &str,
        category: &str,
        entry: ParsedWorkout,
        now: DateTime<Utc>,
    ) -> Result<WorkoutRecord, IngestError> {
        let sets = to_count(entry.sets, "sets")?;
        let reps = to_count(entry.reps, "reps")?;
        let weight = non_negative(entry.weight, "weight")?;
        let duration = non_negative(entry.duration, "duration")?;
        let calories_burned = self
            .estimator
            .try_estimate(&entry)
            .ok_or(IngestError::CaloriesOutOfRange { weight, duration })?;

        Ok(WorkoutRecord {
            id: uuid::Uuid::new_v4().to_string(),
            owner: owner.to_string(),
            category: category.to_string(),
            workout_name: entry.workout_name,
            sets,
            reps,
            weight,
            duration,
            calories_burned,
            date: now,
        })
    }
}

// ── Field conversion ──────────────────────────────────────────────────────────

fn parse_block(block: &str) -> Result<Vec<ParsedWorkout>, IngestError> {
    let workouts = parser::split_workouts(block);
    if workouts.is_empty() {
        return Err(IngestError::InvalidFormat(
            "workout line is empty".to_string(),
        ));
    }
    workouts
        .into_iter()
        .enumerate()
        .map(|(i, w)| {
            parser::parse(w).map_err(|source| IngestError::Parse {
                workout: i + 1,
                source,
            })
        })
        .collect()
}

fn structured_entry(submission: &WorkoutSubmission) -> Result<ParsedWorkout, IngestError> {
    // Presence of every field was established by the count checks.
    let field = |value: &Option<FieldValue>, name: &'static str| {
        value
            .as_ref()
            .ok_or_else(|| IngestError::InvalidFormat(format!("missing {name}")))
            .and_then(|v| number(v, name))
    };

    Ok(ParsedWorkout {
        workout_name: submission
            .workout_name
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string(),
        sets: integer(field(&submission.sets, "sets")?, "sets")?,
        reps: integer(field(&submission.reps, "reps")?, "reps")?,
        weight: field(&submission.weight, "weight")?,
        duration: field(&submission.duration, "duration")?,
    })
}

fn number(value: &FieldValue, field: &'static str) -> Result<f64, IngestError> {
    let parsed = match value {
        FieldValue::Number(n) => Some(*n),
        FieldValue::Text(s) => s.trim().parse::<f64>().ok(),
    };
    match parsed {
        Some(n) if n.is_finite() => Ok(n),
        _ => Err(IngestError::InvalidNumber {
            field,
            value: value.to_string(),
        }),
    }
}

fn integer(n: f64, field: &'static str) -> Result<i64, IngestError> {
    if n.fract() != 0.0 || n.abs() > i64::MAX as f64 {
        return Err(IngestError::InvalidNumber {
            field,
            value: n.to_string(),
        });
    }
    Ok(n as i64)
}

fn to_count(n: i64, field: &'static str) -> Result<u32, IngestError> {
    if n < 0 {
        return Err(IngestError::NegativeValue { field });
    }
    u32::try_from(n).map_err(|_| IngestError::InvalidNumber {
        field,
        value: n.to_string(),
    })
}

fn non_negative(n: f64, field: &'static str) -> Result<f64, IngestError> {
    if n < 0.0 {
        return Err(IngestError::NegativeValue { field });
    }
    Ok(n)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
