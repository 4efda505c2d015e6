//! Parser for the line-oriented workout notation.
//!
//! A workout is written as five segments, one per line:
//!
//! ```text
//! #Legs
//! -Back Squat
//! -5 sets X 15 reps
//! -30 kg
//! -10 min
//! ```
//!
//! Several workouts may be submitted together, separated by `;`.
//!
//! The first segment is a marker and is ignored. Each following segment may
//! start with one delimiter character (any non-alphanumeric character, usually
//! `-`), which is stripped. Between the `sets` and `reps` numbers a single
//! separator (`X`, `x`, `/` or `,`) is allowed.
//!
//! Signs are not policed here: `--5 sets` parses to `-5`. Rejecting negative
//! values is the ingestor's job.

use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::error::ParseError;
use crate::models::ParsedWorkout;

/// Minimum number of segments in a workout line.
pub const MIN_SEGMENTS: usize = 5;

/// Separates workouts inside one submitted block.
pub const WORKOUT_SEPARATOR: char = ';';

const SETS_REPS_SEPARATORS: &[char] = &['X', 'x', '/', ','];

fn segment_splitter() -> &'static Regex {
    static SPLITTER: OnceLock<Regex> = OnceLock::new();
    SPLITTER.get_or_init(|| Regex::new(r"[\r\n]+").expect("regex is valid"))
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Parse one workout description into its structured fields.
///
/// # Examples
///
/// ```
/// use fitlog_core::parser::parse;
///
/// let w = parse("#Legs\n-Back Squat\n-5 sets X 15 reps\n-30 kg\n-10 min").unwrap();
/// assert_eq!(w.workout_name, "Back Squat");
/// assert_eq!((w.sets, w.reps), (5, 15));
/// assert_eq!((w.weight, w.duration), (30.0, 10.0));
/// ```
pub fn parse(line: &str) -> Result<ParsedWorkout, ParseError> {
    let parts: Vec<&str> = segment_splitter()
        .split(line)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    if parts.len() < MIN_SEGMENTS {
        return Err(ParseError::MalformedLine(format!(
            "expected at least {MIN_SEGMENTS} segments, found {}",
            parts.len()
        )));
    }

    let workout_name = strip_delimiter(parts[1]).to_string();
    if workout_name.is_empty() {
        return Err(ParseError::MalformedLine(
            "workout name is empty".to_string(),
        ));
    }

    let (sets, reps) = parse_sets_reps(strip_delimiter(parts[2]))?;
    let weight = parse_quantity(strip_delimiter(parts[3]), "kg", "weight")?;
    let duration = parse_quantity(strip_delimiter(parts[4]), "min", "duration")?;

    debug!(
        workout = %workout_name,
        sets, reps, weight, duration, "parsed workout line"
    );

    Ok(ParsedWorkout {
        workout_name,
        sets,
        reps,
        weight,
        duration,
    })
}

/// Split a block of workouts on [`WORKOUT_SEPARATOR`], dropping blank entries.
pub fn split_workouts(block: &str) -> Vec<&str> {
    block
        .split(WORKOUT_SEPARATOR)
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .collect()
}

/// Render `workout` in the canonical notation accepted by [`parse`].
///
/// `marker` becomes the first segment (conventionally `#<category>`).
pub fn render(workout: &ParsedWorkout, marker: &str) -> String {
    format!(
        "{marker}\n-{}\n-{} sets X {} reps\n-{} kg\n-{} min",
        workout.workout_name, workout.sets, workout.reps, workout.weight, workout.duration
    )
}

// ── Segment helpers ───────────────────────────────────────────────────────────

/// Drop one leading delimiter character, then trim.
fn strip_delimiter(segment: &str) -> &str {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if !c.is_alphanumeric() => chars.as_str().trim(),
        _ => segment.trim(),
    }
}

fn parse_sets_reps(body: &str) -> Result<(i64, i64), ParseError> {
    let (sets_text, rest) = body
        .split_once("sets")
        .ok_or_else(|| ParseError::MalformedLine(format!("missing `sets` in {body:?}")))?;
    let (reps_text, _) = rest
        .split_once("reps")
        .ok_or_else(|| ParseError::MalformedLine(format!("missing `reps` in {body:?}")))?;

    let reps_text = reps_text.trim();
    let reps_text = reps_text
        .strip_prefix(SETS_REPS_SEPARATORS)
        .unwrap_or(reps_text);

    Ok((
        parse_int(sets_text, "sets")?,
        parse_int(reps_text, "reps")?,
    ))
}

fn parse_quantity(body: &str, unit: &str, field: &'static str) -> Result<f64, ParseError> {
    let (value, _) = body
        .split_once(unit)
        .ok_or_else(|| ParseError::MalformedLine(format!("missing `{unit}` in {body:?}")))?;
    parse_float(value, field)
}

fn parse_int(text: &str, field: &'static str) -> Result<i64, ParseError> {
    let text = text.trim();
    text.parse::<i64>().map_err(|_| ParseError::InvalidNumber {
        field,
        value: text.to_string(),
    })
}

fn parse_float(text: &str, field: &'static str) -> Result<f64, ParseError> {
    let text = text.trim();
    match text.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ParseError::InvalidNumber {
            field,
            value: text.to_string(),
        }),
    }
}
