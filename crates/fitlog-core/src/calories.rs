use crate::error::{FitlogError, Result};
use crate::models::{ParsedWorkout, WorkoutRecord};

/// Calories burnt per minute per kilogram when nothing else is configured.
pub const DEFAULT_CALORIES_PER_MINUTE: f64 = 5.0;

/// Anything carrying the two quantities the calorie model needs.
pub trait Exertion {
    /// Load moved, in kilograms.
    fn weight_kg(&self) -> f64;
    /// Time under exercise, in minutes.
    fn duration_minutes(&self) -> f64;
}

impl Exertion for WorkoutRecord {
    fn weight_kg(&self) -> f64 {
        self.weight
    }

    fn duration_minutes(&self) -> f64 {
        self.duration
    }
}

impl Exertion for ParsedWorkout {
    fn weight_kg(&self) -> f64 {
        self.weight
    }

    fn duration_minutes(&self) -> f64 {
        self.duration
    }
}

// ── CalorieEstimator ──────────────────────────────────────────────────────────

/// Linear calorie model: `duration * weight * calories_per_minute`.
///
/// An approximation, not a physiological model. The rate is fixed for the
/// lifetime of the estimator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalorieEstimator {
    calories_per_minute: f64,
}

impl Default for CalorieEstimator {
    fn default() -> Self {
        Self {
            calories_per_minute: DEFAULT_CALORIES_PER_MINUTE,
        }
    }
}

impl CalorieEstimator {
    /// Build an estimator; the rate must be finite and non-negative.
    pub fn new(calories_per_minute: f64) -> Result<Self> {
        if !calories_per_minute.is_finite() || calories_per_minute < 0.0 {
            return Err(FitlogError::Config(format!(
                "calories per minute must be a finite, non-negative number (got {calories_per_minute})"
            )));
        }
        Ok(Self {
            calories_per_minute,
        })
    }

    pub fn calories_per_minute(&self) -> f64 {
        self.calories_per_minute
    }

    /// Calories for `weight_kg` moved over `duration_minutes`.
    pub fn estimate_raw(&self, weight_kg: f64, duration_minutes: f64) -> f64 {
        duration_minutes * weight_kg * self.calories_per_minute
    }

    /// Calories for anything implementing [`Exertion`].
    pub fn estimate<E: Exertion + ?Sized>(&self, workout: &E) -> f64 {
        self.estimate_raw(workout.weight_kg(), workout.duration_minutes())
    }

    /// [`estimate`](Self::estimate), or `None` when the product overflows `f64`.
    pub fn try_estimate<E: Exertion + ?Sized>(&self, workout: &E) -> Option<f64> {
        let calories = self.estimate(workout);
        calories.is_finite().then_some(calories)
    }
}
