//! Caller-facing workout service.
//!
//! [`WorkoutService`] ties the ingestor, a [`WorkoutStore`] and the
//! aggregator together and produces the serialisable response payloads a
//! transport layer (or the CLI) hands back to the user. Each persisted record
//! is saved in its own tokio task; a failed save never aborts its siblings.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinSet;

use fitlog_core::error::{IngestError, StoreError};
use fitlog_core::models::{GroupBy, RangeSummary, WorkoutRecord, WorkoutSubmission};
use fitlog_core::time_utils::{date_range_bounds, day_bounds, today_in};
use fitlog_data::aggregator::StatsAggregator;
use fitlog_data::ingestor::WorkoutIngestor;
use fitlog_data::store::WorkoutStore;

pub const ADDED_MESSAGE: &str = "Workouts added successfully";
pub const PARTIALLY_ADDED_MESSAGE: &str = "Some workouts could not be saved";

// ── Response payloads ─────────────────────────────────────────────────────────

/// Error payload returned to callers: `{ "statusCode": 400, "reason": "..." }`.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[error("{reason} (status {status_code})")]
pub struct ErrorResponse {
    pub status_code: u16,
    pub reason: String,
}

impl ErrorResponse {
    pub fn new(status_code: u16, reason: impl Into<String>) -> Self {
        Self {
            status_code,
            reason: reason.into(),
        }
    }

    pub fn bad_request(reason: impl Into<String>) -> Self {
        Self::new(400, reason)
    }

    pub fn internal(reason: impl Into<String>) -> Self {
        Self::new(500, reason)
    }
}

impl From<IngestError> for ErrorResponse {
    fn from(err: IngestError) -> Self {
        Self::new(err.status_code(), err.to_string())
    }
}

impl From<StoreError> for ErrorResponse {
    fn from(err: StoreError) -> Self {
        Self::internal(err.to_string())
    }
}

/// A record that was ingested but could not be persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedWorkout {
    pub workout_name: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddWorkoutResponse {
    pub message: String,
    /// Persisted records, in submission order.
    pub workouts: Vec<WorkoutRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<FailedWorkout>,
}

/// One slice of the dashboard pie chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieSlice {
    pub id: usize,
    pub value: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub total_calories_burnt: f64,
    pub total_workouts: u64,
    pub avg_calories_burnt_per_workout: f64,
    pub pie_chart_data: Vec<PieSlice>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayWorkoutsResponse {
    pub todays_workouts: Vec<WorkoutRecord>,
    pub total_calories_burnt: f64,
}

// ── WorkoutService ────────────────────────────────────────────────────────────

pub struct WorkoutService {
    store: Arc<dyn WorkoutStore>,
    ingestor: WorkoutIngestor,
    tz: Tz,
}

impl WorkoutService {
    /// Create a service over `store`.
    ///
    /// `tz` decides which instants belong to a calendar day and what "today"
    /// means when a caller omits the date.
    pub fn new(store: Arc<dyn WorkoutStore>, ingestor: WorkoutIngestor, tz: Tz) -> Self {
        Self {
            store,
            ingestor,
            tz,
        }
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    /// Validate `submission`, then persist every record it yields.
    pub async fn add_workout(
        &self,
        owner: &str,
        submission: Option<&WorkoutSubmission>,
    ) -> Result<AddWorkoutResponse, ErrorResponse> {
        self.add_workout_at(owner, submission, Utc::now()).await
    }

    /// [`add_workout`](Self::add_workout) with an explicit ingestion time.
    ///
    /// Input errors map to status 400. When some saves fail the response
    /// lists them under `failed`; when every save fails the call returns a
    /// 500 carrying the first failure reason.
    pub async fn add_workout_at(
        &self,
        owner: &str,
        submission: Option<&WorkoutSubmission>,
        now: DateTime<Utc>,
    ) -> Result<AddWorkoutResponse, ErrorResponse> {
        let records = self.ingestor.ingest(owner, submission, now).map_err(|e| {
            tracing::debug!(owner, error = %e, "workout submission rejected");
            ErrorResponse::from(e)
        })?;

        let (saved, failed) = self.persist_all(records).await;

        if saved.is_empty() && !failed.is_empty() {
            return Err(ErrorResponse::internal(format!(
                "Failed to save workouts: {}",
                failed[0].reason
            )));
        }

        tracing::info!(
            owner,
            saved = saved.len(),
            failed = failed.len(),
            "workouts added"
        );

        let message = if failed.is_empty() {
            ADDED_MESSAGE
        } else {
            PARTIALLY_ADDED_MESSAGE
        };
        Ok(AddWorkoutResponse {
            message: message.to_string(),
            workouts: saved,
            failed,
        })
    }

    /// Dashboard figures for `date` (default: today in the service timezone).
    pub async fn dashboard(
        &self,
        owner: &str,
        date: Option<NaiveDate>,
    ) -> Result<DashboardResponse, ErrorResponse> {
        let date = date.unwrap_or_else(|| today_in(self.tz));
        let records = self.load_day(owner, date).await?;
        let summary = StatsAggregator::summarize_day(&records, date, self.tz);

        Ok(DashboardResponse {
            total_calories_burnt: summary.total_calories_burnt,
            total_workouts: summary.total_workouts,
            avg_calories_burnt_per_workout: summary.avg_calories_burnt_per_workout,
            pie_chart_data: summary
                .category_breakdown
                .into_iter()
                .enumerate()
                .map(|(id, c)| PieSlice {
                    id,
                    value: c.value,
                    label: c.label,
                })
                .collect(),
        })
    }

    /// Records logged on `date` (default: today) and their calorie total.
    pub async fn workouts_by_date(
        &self,
        owner: &str,
        date: Option<NaiveDate>,
    ) -> Result<DayWorkoutsResponse, ErrorResponse> {
        let date = date.unwrap_or_else(|| today_in(self.tz));
        let records = self.load_day(owner, date).await?;
        let todays_workouts: Vec<WorkoutRecord> =
            StatsAggregator::records_on(&records, date, self.tz)
                .into_iter()
                .cloned()
                .collect();
        let total_calories_burnt = StatsAggregator::total_calories(&todays_workouts);

        Ok(DayWorkoutsResponse {
            todays_workouts,
            total_calories_burnt,
        })
    }

    /// Totals over the local days `first..=last`, grouped by `group_by`.
    pub async fn range_stats(
        &self,
        owner: &str,
        first: NaiveDate,
        last: NaiveDate,
        group_by: GroupBy,
    ) -> Result<RangeSummary, ErrorResponse> {
        if last < first {
            return Err(ErrorResponse::bad_request(format!(
                "Start date {first} is after end date {last}"
            )));
        }

        let (start, end) = date_range_bounds(first, last, self.tz);
        let records = self
            .store
            .find_by_owner_and_date_range(owner, start, end)
            .await?;
        Ok(StatsAggregator::summarize_range(
            &records, start, end, group_by, self.tz,
        ))
    }

    // ── Private implementation ────────────────────────────────────────────

    async fn load_day(
        &self,
        owner: &str,
        date: NaiveDate,
    ) -> Result<Vec<WorkoutRecord>, ErrorResponse> {
        let (start, end) = day_bounds(date, self.tz);
        let records = self
            .store
            .find_by_owner_and_date_range(owner, start, end)
            .await?;
        tracing::debug!(owner, %date, count = records.len(), "day records loaded");
        Ok(records)
    }

    /// Save each record in its own task and split the outcomes.
    async fn persist_all(
        &self,
        records: Vec<WorkoutRecord>,
    ) -> (Vec<WorkoutRecord>, Vec<FailedWorkout>) {
        let mut tasks = JoinSet::new();
        for (idx, record) in records.iter().cloned().enumerate() {
            let store = Arc::clone(&self.store);
            tasks.spawn(async move { (idx, store.save(&record).await) });
        }

        let mut succeeded = BTreeSet::new();
        let mut errors: Vec<(usize, String)> = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, Ok(()))) => {
                    succeeded.insert(idx);
                }
                Ok((idx, Err(e))) => {
                    tracing::warn!(
                        workout = %records[idx].workout_name,
                        error = %e,
                        "failed to save workout"
                    );
                    errors.push((idx, e.to_string()));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "workout save task did not complete");
                }
            }
        }

        let mut saved = Vec::with_capacity(succeeded.len());
        let mut failed = Vec::new();
        for (idx, record) in records.into_iter().enumerate() {
            if succeeded.contains(&idx) {
                saved.push(record);
                continue;
            }
            let reason = errors
                .iter()
                .find(|(i, _)| *i == idx)
                .map(|(_, reason)| reason.clone())
                .unwrap_or_else(|| "save task did not complete".to_string());
            failed.push(FailedWorkout {
                workout_name: record.workout_name,
                reason,
            });
        }
        (saved, failed)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
