use chrono_tz::Tz;
use clap::{Args, CommandFactory, FromArgMatches, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::calories::{CalorieEstimator, DEFAULT_CALORIES_PER_MINUTE};
use crate::error::Result;
use crate::models::{FieldValue, GroupBy, WorkoutSubmission};

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Personal workout log with daily calorie statistics
#[derive(Parser, Debug, Clone)]
#[command(
    name = "fitlog",
    about = "Personal workout log with daily calorie statistics",
    version
)]
pub struct Settings {
    /// User the command acts on
    #[arg(long, global = true, default_value = "default")]
    pub user: String,

    /// Timezone used for day boundaries (auto-detected if not specified)
    #[arg(long, global = true, default_value = "auto")]
    pub timezone: String,

    /// Calories burnt per minute per kilogram
    #[arg(long, global = true, default_value_t = DEFAULT_CALORIES_PER_MINUTE)]
    pub calories_per_minute: f64,

    /// Directory holding the workout store (defaults to ~/.fitlog/data)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Logging level
    #[arg(long, global = true, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Log file path
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long, global = true)]
    pub clear: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Log a workout
    Add(AddArgs),
    /// Show the calorie dashboard for a day (today by default)
    Dashboard {
        #[arg(long)]
        date: Option<String>,
    },
    /// List the workouts logged on a day (today by default)
    Workouts {
        #[arg(long)]
        date: Option<String>,
    },
    /// Totals over an inclusive range of days
    Stats {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long, value_enum, default_value_t = GroupBy::Category)]
        group_by: GroupBy,
    },
}

/// Workout fields for `fitlog add`, either individually, as a notation line,
/// or as a raw JSON submission.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct AddArgs {
    /// Comma-separated categories
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long = "name")]
    pub workout_name: Option<String>,
    #[arg(long)]
    pub sets: Option<String>,
    #[arg(long)]
    pub reps: Option<String>,
    /// Kilograms
    #[arg(long)]
    pub weight: Option<String>,
    /// Minutes
    #[arg(long)]
    pub duration: Option<String>,
    /// Workout notation: one segment per line, workouts separated by `;`
    #[arg(long)]
    pub line: Option<String>,
    /// Raw JSON submission; other workout flags are ignored when given
    #[arg(long, conflicts_with_all = ["category", "workout_name", "sets", "reps", "weight", "duration", "line"])]
    pub json: Option<String>,
}

impl AddArgs {
    /// Build the submission these flags describe; `None` when nothing was given.
    pub fn to_submission(&self) -> Result<Option<WorkoutSubmission>> {
        if let Some(json) = &self.json {
            return Ok(Some(WorkoutSubmission::from_json(json)?));
        }
        if *self == AddArgs::default() {
            return Ok(None);
        }
        let text = |v: &Option<String>| v.as_deref().map(FieldValue::from);
        Ok(Some(WorkoutSubmission {
            category: self.category.clone(),
            workout_name: self.workout_name.clone(),
            sets: text(&self.sets),
            reps: text(&self.reps),
            weight: text(&self.weight),
            duration: text(&self.duration),
            line: self.line.clone(),
            calories_burned: None,
        }))
    }
}

// ── SavedDefaults ──────────────────────────────────────────────────────────────

/// Defaults persisted to `~/.fitlog/config.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct SavedDefaults {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calories_per_minute: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl SavedDefaults {
    /// Default path of the persisted config file.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Config path rooted at `base_dir`.
    pub fn config_path_in(base_dir: &std::path::Path) -> PathBuf {
        base_dir.join(".fitlog").join("config.json")
    }

    /// Load persisted defaults; `Default` when the file is absent or unreadable.
    pub fn load_from(path: &std::path::Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config file");
            Self::default()
        })
    }

    /// Atomically write defaults to `path`, creating parent directories.
    pub fn save_to(&self, path: &std::path::Path) -> std::result::Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the config file at `path` if it exists.
    pub fn clear_at(path: &std::path::Path) -> std::result::Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse process arguments, fill unset values from the saved defaults,
    /// resolve `"auto"` values, and persist the explicit choices.
    pub fn load() -> Self {
        Self::load_impl(std::env::args_os().collect(), &SavedDefaults::config_path())
    }

    /// Same as [`Settings::load`] with explicit arguments and config path.
    pub fn load_impl(args: Vec<std::ffi::OsString>, config_path: &std::path::Path) -> Self {
        let matches = Settings::command().get_matches_from(args);
        let mut settings = Settings::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

        if settings.clear {
            if let Err(e) = SavedDefaults::clear_at(config_path) {
                tracing::warn!(error = %e, "failed to clear saved configuration");
            }
            return settings.resolve_auto_values();
        }

        let saved = SavedDefaults::load_from(config_path);
        let previous = saved.clone();

        // CLI always wins over saved values.
        if !is_arg_explicitly_set(&matches, "user") {
            if let Some(v) = saved.user {
                settings.user = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "timezone") {
            if let Some(v) = saved.timezone {
                settings.timezone = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "calories_per_minute") {
            if let Some(v) = saved.calories_per_minute {
                settings.calories_per_minute = v;
            }
        }
        if settings.data_dir.is_none() {
            settings.data_dir = saved.data_dir;
        }

        if let Err(e) = settings.persistable(previous).save_to(config_path) {
            tracing::warn!(error = %e, "failed to persist configuration");
        }

        settings.resolve_auto_values()
    }

    /// Values to save for the next run.
    ///
    /// An invalid calorie rate or timezone is not saved; the previously saved
    /// value is kept so later runs without the flag still start cleanly.
    fn persistable(&self, previous: SavedDefaults) -> SavedDefaults {
        let mut next = SavedDefaults::from(self);
        if let Err(e) = CalorieEstimator::new(self.calories_per_minute) {
            tracing::warn!(error = %e, "not saving calories per minute");
            next.calories_per_minute = previous.calories_per_minute;
        }
        if self.timezone != "auto" && !crate::time_utils::validate_timezone(&self.timezone) {
            tracing::warn!(timezone = %self.timezone, "not saving unrecognised timezone");
            next.timezone = previous.timezone;
        }
        next
    }

    /// Resolve the `"auto"` timezone and apply `--debug`.
    fn resolve_auto_values(mut self) -> Self {
        if self.timezone == "auto" {
            self.timezone = crate::time_utils::get_system_timezone();
        }
        if self.debug {
            self.log_level = "DEBUG".to_string();
        }
        self
    }

    /// Timezone used for day boundaries.
    pub fn tz(&self) -> Tz {
        crate::time_utils::resolve_timezone(&self.timezone)
    }

    /// Calorie estimator configured from `--calories-per-minute`.
    pub fn estimator(&self) -> Result<CalorieEstimator> {
        CalorieEstimator::new(self.calories_per_minute)
    }

    /// Workout store directory.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".fitlog")
                .join("data")
        })
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for SavedDefaults {
    fn from(s: &Settings) -> Self {
        SavedDefaults {
            user: Some(s.user.clone()),
            timezone: Some(s.timezone.clone()),
            calories_per_minute: Some(s.calories_per_minute),
            data_dir: s.data_dir.clone(),
        }
    }
}

/// Returns `true` when `name` was supplied explicitly on the command line.
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
