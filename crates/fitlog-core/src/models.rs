use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Names of the fields a complete submission must carry, in form order.
pub const RECOGNISED_FIELDS: [&str; 6] = [
    "category",
    "workoutName",
    "sets",
    "reps",
    "weight",
    "duration",
];

// ── FieldValue ────────────────────────────────────────────────────────────────

/// A numeric form field as submitted: either a JSON number or text typed
/// into a form input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// `true` for text that is empty after trimming. Numbers are never blank.
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Number(_) => false,
            FieldValue::Text(s) => s.trim().is_empty(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(n) => write!(f, "{n}"),
            FieldValue::Text(s) => f.write_str(s.trim()),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

// ── WorkoutSubmission ─────────────────────────────────────────────────────────

/// Raw workout input exactly as a client sent it.
///
/// Either the structured fields or a single `line` in the workout notation
/// (see [`crate::parser`]) describe the workout. Unknown keys are rejected
/// when deserialising. `caloriesBurned` is accepted because the web form
/// posts it, but it is never read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WorkoutSubmission {
    /// Comma-separated category list, e.g. `"legs, strength"`.
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub workout_name: Option<String>,
    #[serde(default)]
    pub sets: Option<FieldValue>,
    #[serde(default)]
    pub reps: Option<FieldValue>,
    /// Kilograms.
    #[serde(default)]
    pub weight: Option<FieldValue>,
    /// Minutes.
    #[serde(default)]
    pub duration: Option<FieldValue>,
    /// Workout notation line replacing the five structured workout fields.
    #[serde(default)]
    pub line: Option<String>,
    #[serde(default, skip_serializing)]
    pub calories_burned: Option<FieldValue>,
}

impl WorkoutSubmission {
    /// Parse a submission from JSON, rejecting unknown keys.
    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// `true` when the line-notation form is in use.
    pub fn has_line(&self) -> bool {
        self.line.as_deref().is_some_and(|l| !l.trim().is_empty())
    }

    /// `true` when any of the five structured workout fields is filled in.
    pub fn has_structured_fields(&self) -> bool {
        self.structured_presence().iter().any(|(_, present)| *present)
    }

    /// `true` when nothing meaningful was supplied at all.
    pub fn is_empty(&self) -> bool {
        !self.has_category_text() && !self.has_line() && !self.has_structured_fields()
    }

    /// Recognised fields that carry a value.
    ///
    /// With a notation line, the line stands in for all five workout fields.
    pub fn present_fields(&self) -> Vec<&'static str> {
        let mut present = Vec::with_capacity(RECOGNISED_FIELDS.len());
        if self.has_category_text() {
            present.push("category");
        }
        if self.has_line() {
            present.extend_from_slice(&RECOGNISED_FIELDS[1..]);
        } else {
            present.extend(
                self.structured_presence()
                    .into_iter()
                    .filter(|(_, p)| *p)
                    .map(|(name, _)| name),
            );
        }
        present
    }

    /// Recognised fields that are absent or blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let present = self.present_fields();
        RECOGNISED_FIELDS
            .iter()
            .copied()
            .filter(|f| !present.contains(f))
            .collect()
    }

    /// Non-empty, trimmed category entries in submission order.
    pub fn categories(&self) -> Vec<&str> {
        self.category
            .as_deref()
            .map(|c| c.split(',').map(str::trim).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default()
    }

    fn has_category_text(&self) -> bool {
        self.category.as_deref().is_some_and(|c| !c.trim().is_empty())
    }

    fn structured_presence(&self) -> [(&'static str, bool); 5] {
        let filled = |v: &Option<FieldValue>| v.as_ref().is_some_and(|v| !v.is_blank());
        [
            (
                "workoutName",
                self.workout_name
                    .as_deref()
                    .is_some_and(|n| !n.trim().is_empty()),
            ),
            ("sets", filled(&self.sets)),
            ("reps", filled(&self.reps)),
            ("weight", filled(&self.weight)),
            ("duration", filled(&self.duration)),
        ]
    }
}

// ── ParsedWorkout ─────────────────────────────────────────────────────────────

/// The workout fields recovered from one notation line.
///
/// Values are signed: the parser does not police signs, the ingestor does.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedWorkout {
    pub workout_name: String,
    pub sets: i64,
    pub reps: i64,
    pub weight: f64,
    pub duration: f64,
}

// ── WorkoutRecord ─────────────────────────────────────────────────────────────

/// One logged exercise session as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutRecord {
    /// Store key, assigned at ingestion.
    pub id: String,
    /// Identifier of the owning user.
    pub owner: String,
    pub category: String,
    pub workout_name: String,
    pub sets: u32,
    pub reps: u32,
    /// Kilograms.
    pub weight: f64,
    /// Minutes.
    pub duration: f64,
    /// Always computed at ingestion, never taken from input.
    pub calories_burned: f64,
    /// UTC instant the workout was logged.
    pub date: DateTime<Utc>,
}

// ── Summaries ─────────────────────────────────────────────────────────────────

/// Calories attributed to one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub label: String,
    pub value: f64,
}

/// Statistics for a single calendar day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    pub total_calories_burnt: f64,
    pub total_workouts: u64,
    /// Exactly `0.0` when `total_workouts` is zero.
    pub avg_calories_burnt_per_workout: f64,
    /// In the order categories were first seen.
    pub category_breakdown: Vec<CategoryTotal>,
}

/// Grouping key for range statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    #[default]
    Category,
    Day,
}

/// Totals for one group inside a [`RangeSummary`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeGroup {
    /// Category label, or `YYYY-MM-DD` when grouped by day.
    pub key: String,
    pub total_calories_burnt: f64,
    pub workouts: u64,
}

/// Statistics over the half-open interval `[start, end)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeSummary {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub group_by: GroupBy,
    pub total_calories_burnt: f64,
    pub total_workouts: u64,
    pub groups: Vec<RangeGroup>,
}
