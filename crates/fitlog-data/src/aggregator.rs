//! Workout statistics over days and date ranges.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

use fitlog_core::models::{
    CategoryTotal, DailySummary, GroupBy, RangeGroup, RangeSummary, WorkoutRecord,
};
use fitlog_core::time_utils::{day_bounds, local_date};

// ── GroupTotals ───────────────────────────────────────────────────────────────

/// Calorie and workout totals accumulated across records.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GroupTotals {
    pub calories: f64,
    pub workouts: u64,
}

impl GroupTotals {
    /// Add one record to the running totals.
    pub fn add_record(&mut self, record: &WorkoutRecord) {
        self.calories += record.calories_burned;
        self.workouts += 1;
    }

    /// Mean calories per workout, `0.0` when there are none.
    pub fn average(&self) -> f64 {
        if self.workouts == 0 {
            0.0
        } else {
            self.calories / self.workouts as f64
        }
    }
}

// ── DiscoveryGroups ───────────────────────────────────────────────────────────

/// Groups keyed by label, kept in the order labels were first seen.
#[derive(Debug, Default)]
struct DiscoveryGroups {
    index: HashMap<String, usize>,
    groups: Vec<(String, GroupTotals)>,
}

impl DiscoveryGroups {
    fn add(&mut self, label: &str, record: &WorkoutRecord) {
        let slot = match self.index.get(label) {
            Some(&i) => i,
            None => {
                self.groups.push((label.to_string(), GroupTotals::default()));
                self.index.insert(label.to_string(), self.groups.len() - 1);
                self.groups.len() - 1
            }
        };
        self.groups[slot].1.add_record(record);
    }

    fn into_groups(self) -> Vec<(String, GroupTotals)> {
        self.groups
    }
}

// ── StatsAggregator ───────────────────────────────────────────────────────────

/// Stateless helper computing summaries from a user's workout records.
///
/// Callers may pass pre-filtered or raw records; every operation applies its
/// own half-open time filter.
pub struct StatsAggregator;

impl StatsAggregator {
    /// Records falling on `date` in `tz`, in input order.
    pub fn records_on<'a>(
        records: &'a [WorkoutRecord],
        date: NaiveDate,
        tz: Tz,
    ) -> Vec<&'a WorkoutRecord> {
        let (start, end) = day_bounds(date, tz);
        Self::records_between(records, start, end).collect()
    }

    /// Summary of the day `date` as seen in `tz`.
    ///
    /// The day is `[local midnight, next local midnight)`. The category
    /// breakdown keeps the order in which categories first appear.
    pub fn summarize_day(records: &[WorkoutRecord], date: NaiveDate, tz: Tz) -> DailySummary {
        let (start, end) = day_bounds(date, tz);

        let mut totals = GroupTotals::default();
        let mut categories = DiscoveryGroups::default();
        for record in Self::records_between(records, start, end) {
            totals.add_record(record);
            categories.add(&record.category, record);
        }

        DailySummary {
            total_calories_burnt: totals.calories,
            total_workouts: totals.workouts,
            avg_calories_burnt_per_workout: totals.average(),
            category_breakdown: categories
                .into_groups()
                .into_iter()
                .map(|(label, t)| CategoryTotal {
                    label,
                    value: t.calories,
                })
                .collect(),
        }
    }

    /// Totals over `[start, end)`, grouped by category (discovery order) or by
    /// calendar day in `tz` (ascending).
    pub fn summarize_range(
        records: &[WorkoutRecord],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        group_by: GroupBy,
        tz: Tz,
    ) -> RangeSummary {
        let mut totals = GroupTotals::default();
        let groups: Vec<(String, GroupTotals)> = match group_by {
            GroupBy::Category => {
                let mut groups = DiscoveryGroups::default();
                for record in Self::records_between(records, start, end) {
                    totals.add_record(record);
                    groups.add(&record.category, record);
                }
                groups.into_groups()
            }
            GroupBy::Day => {
                let mut days: BTreeMap<NaiveDate, GroupTotals> = BTreeMap::new();
                for record in Self::records_between(records, start, end) {
                    totals.add_record(record);
                    days.entry(local_date(record.date, tz))
                        .or_default()
                        .add_record(record);
                }
                days.into_iter()
                    .map(|(day, t)| (day.format("%Y-%m-%d").to_string(), t))
                    .collect()
            }
        };

        RangeSummary {
            start,
            end,
            group_by,
            total_calories_burnt: totals.calories,
            total_workouts: totals.workouts,
            groups: groups
                .into_iter()
                .map(|(key, t)| RangeGroup {
                    key,
                    total_calories_burnt: t.calories,
                    workouts: t.workouts,
                })
                .collect(),
        }
    }

    /// Sum of `caloriesBurned` over `records`.
    pub fn total_calories<'a>(records: impl IntoIterator<Item = &'a WorkoutRecord>) -> f64 {
        records.into_iter().map(|r| r.calories_burned).sum()
    }

    fn records_between(
        records: &[WorkoutRecord],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> impl Iterator<Item = &WorkoutRecord> {
        records
            .iter()
            .filter(move |r| r.date >= start && r.date < end)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn make_record(ts: &str, category: &str, calories: f64) -> WorkoutRecord {
        WorkoutRecord {
            id: format!("{ts}-{category}"),
            owner: "alice".to_string(),
            category: category.to_string(),
            workout_name: "Workout".to_string(),
            sets: 1,
            reps: 1,
            weight: 1.0,
            duration: 1.0,
            calories_burned: calories,
            date: DateTime::parse_from_rfc3339(ts)
                .unwrap()
                .with_timezone(&Utc),
        }
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // ── summarize_day ─────────────────────────────────────────────────────────

    #[test]
    fn test_summarize_day_empty() {
        let summary = StatsAggregator::summarize_day(&[], ymd(2024, 1, 15), Tz::UTC);
        assert_eq!(summary, DailySummary::default());
        assert_eq!(summary.avg_calories_burnt_per_workout, 0.0);
        assert!(summary.category_breakdown.is_empty());
    }

    #[test]
    fn test_summarize_day_two_categories() {
        let records = vec![
            make_record("2024-01-15T08:00:00Z", "cardio", 100.0),
            make_record("2024-01-15T18:00:00Z", "strength", 50.0),
        ];
        let summary = StatsAggregator::summarize_day(&records, ymd(2024, 1, 15), Tz::UTC);

        assert_eq!(summary.total_calories_burnt, 150.0);
        assert_eq!(summary.total_workouts, 2);
        assert_eq!(summary.avg_calories_burnt_per_workout, 75.0);
        assert_eq!(
            summary.category_breakdown,
            vec![
                CategoryTotal {
                    label: "cardio".to_string(),
                    value: 100.0
                },
                CategoryTotal {
                    label: "strength".to_string(),
                    value: 50.0
                },
            ]
        );
    }

    #[test]
    fn test_summarize_day_breakdown_keeps_discovery_order() {
        let records = vec![
            make_record("2024-01-15T08:00:00Z", "yoga", 10.0),
            make_record("2024-01-15T09:00:00Z", "cardio", 500.0),
            make_record("2024-01-15T10:00:00Z", "yoga", 15.0),
        ];
        let summary = StatsAggregator::summarize_day(&records, ymd(2024, 1, 15), Tz::UTC);
        let labels: Vec<&str> = summary
            .category_breakdown
            .iter()
            .map(|c| c.label.as_str())
            .collect();
        assert_eq!(labels, vec!["yoga", "cardio"]);
        assert_eq!(summary.category_breakdown[0].value, 25.0);
    }

    #[test]
    fn test_summarize_day_is_half_open() {
        let records = vec![
            make_record("2024-01-15T00:00:00Z", "cardio", 1.0),
            make_record("2024-01-15T23:59:59Z", "cardio", 2.0),
            make_record("2024-01-16T00:00:00Z", "cardio", 4.0),
            make_record("2024-01-14T23:59:59Z", "cardio", 8.0),
        ];
        let summary = StatsAggregator::summarize_day(&records, ymd(2024, 1, 15), Tz::UTC);
        assert_eq!(summary.total_workouts, 2);
        assert_eq!(summary.total_calories_burnt, 3.0);
    }

    #[test]
    fn test_summarize_day_uses_local_timezone() {
        // 23:30 UTC on the 14th is 00:30 on the 15th in Berlin.
        let records = vec![make_record("2024-01-14T23:30:00Z", "cardio", 40.0)];
        let berlin = StatsAggregator::summarize_day(
            &records,
            ymd(2024, 1, 15),
            chrono_tz::Europe::Berlin,
        );
        assert_eq!(berlin.total_workouts, 1);
        let utc = StatsAggregator::summarize_day(&records, ymd(2024, 1, 15), Tz::UTC);
        assert_eq!(utc.total_workouts, 0);
    }

    #[test]
    fn test_summarize_day_is_idempotent() {
        let records = vec![
            make_record("2024-01-15T08:00:00Z", "cardio", 100.0),
            make_record("2024-01-15T09:00:00Z", "strength", 50.0),
            make_record("2024-01-15T10:00:00Z", "cardio", 25.0),
        ];
        let first = StatsAggregator::summarize_day(&records, ymd(2024, 1, 15), Tz::UTC);
        let second = StatsAggregator::summarize_day(&records, ymd(2024, 1, 15), Tz::UTC);
        assert_eq!(first, second);
    }

    // ── summarize_range ───────────────────────────────────────────────────────

    fn week() -> Vec<WorkoutRecord> {
        vec![
            make_record("2024-01-17T08:00:00Z", "cardio", 100.0),
            make_record("2024-01-15T08:00:00Z", "strength", 50.0),
            make_record("2024-01-15T20:00:00Z", "cardio", 30.0),
            make_record("2024-01-22T00:00:00Z", "cardio", 999.0),
        ]
    }

    #[test]
    fn test_summarize_range_by_category() {
        let start = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 22, 0, 0, 0).unwrap();
        let summary =
            StatsAggregator::summarize_range(&week(), start, end, GroupBy::Category, Tz::UTC);

        assert_eq!(summary.total_workouts, 3);
        assert_eq!(summary.total_calories_burnt, 180.0);
        let keys: Vec<&str> = summary.groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["cardio", "strength"]);
        assert_eq!(summary.groups[0].total_calories_burnt, 130.0);
        assert_eq!(summary.groups[0].workouts, 2);
    }

    #[test]
    fn test_summarize_range_by_day_sorted() {
        let start = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 22, 0, 0, 0).unwrap();
        let summary = StatsAggregator::summarize_range(&week(), start, end, GroupBy::Day, Tz::UTC);

        let keys: Vec<&str> = summary.groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["2024-01-15", "2024-01-17"]);
        assert_eq!(summary.groups[0].total_calories_burnt, 80.0);
        assert_eq!(summary.groups[0].workouts, 2);
    }

    #[test]
    fn test_summarize_range_empty() {
        let start = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let summary = StatsAggregator::summarize_range(&week(), start, end, GroupBy::Day, Tz::UTC);
        assert_eq!(summary.total_workouts, 0);
        assert!(summary.groups.is_empty());
    }

    // ── helpers ───────────────────────────────────────────────────────────────

    #[test]
    fn test_records_on_and_total_calories() {
        let records = week();
        let today = StatsAggregator::records_on(&records, ymd(2024, 1, 15), Tz::UTC);
        assert_eq!(today.len(), 2);
        assert_eq!(StatsAggregator::total_calories(today), 80.0);
    }

    #[test]
    fn test_group_totals_average() {
        assert_eq!(GroupTotals::default().average(), 0.0);
        let totals = GroupTotals {
            calories: 90.0,
            workouts: 4,
        };
        assert_eq!(totals.average(), 22.5);
    }
}
