mod bootstrap;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;

use fitlog_core::settings::{Command, Settings};
use fitlog_core::time_utils::parse_date;
use fitlog_data::ingestor::WorkoutIngestor;
use fitlog_data::store::JsonlStore;
use fitlog_runtime::service::{ErrorResponse, WorkoutService};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let settings = Settings::load();
    let data_dir = settings.data_dir();

    bootstrap::ensure_directories(&data_dir)?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("fitlog v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "User: {}, Timezone: {}, Store: {}",
        settings.user,
        settings.timezone,
        data_dir.display()
    );

    let tz = settings.tz();
    let ingestor = WorkoutIngestor::new(settings.estimator()?);
    let service = WorkoutService::new(Arc::new(JsonlStore::new(&data_dir)), ingestor, tz);
    let user = settings.user.as_str();

    match &settings.command {
        Command::Add(args) => {
            let submission = args.to_submission()?;
            emit(service.add_workout(user, submission.as_ref()).await)
        }
        Command::Dashboard { date } => {
            let date = date.as_deref().map(|d| parse_date(d, tz)).transpose()?;
            emit(service.dashboard(user, date).await)
        }
        Command::Workouts { date } => {
            let date = date.as_deref().map(|d| parse_date(d, tz)).transpose()?;
            emit(service.workouts_by_date(user, date).await)
        }
        Command::Stats { from, to, group_by } => {
            let first = parse_date(from, tz).context("invalid --from")?;
            let last = parse_date(to, tz).context("invalid --to")?;
            emit(service.range_stats(user, first, last, *group_by).await)
        }
    }
}

/// Print a service outcome as pretty JSON: payloads to stdout, error
/// responses to stderr. Exit code 2 marks input errors, 1 everything else.
fn emit<T: Serialize>(outcome: std::result::Result<T, ErrorResponse>) -> Result<ExitCode> {
    match outcome {
        Ok(payload) => {
            println!("{}", serde_json::to_string_pretty(&payload)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            tracing::warn!(status = err.status_code, "{}", err.reason);
            eprintln!("{}", serde_json::to_string_pretty(&err)?);
            let code = if err.status_code < 500 { 2 } else { 1 };
            Ok(ExitCode::from(code))
        }
    }
}
