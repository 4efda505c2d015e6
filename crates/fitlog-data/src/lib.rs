//! Data layer for fitlog.
//!
//! Turns workout submissions into records, persists them through a
//! [`store::WorkoutStore`] and reduces stored records into daily and
//! range statistics.

pub mod aggregator;
pub mod ingestor;
pub mod store;
