//! Core domain layer for fitlog.
//!
//! Holds the workout data model, the workout notation parser, the calorie
//! model, time-zone aware day boundaries, errors and settings. Everything here
//! is synchronous and free of storage concerns.

pub mod calories;
pub mod error;
pub mod models;
pub mod parser;
pub mod settings;
pub mod time_utils;

pub use error::{FitlogError, IngestError, ParseError, Result, StoreError};
