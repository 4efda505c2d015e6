//! Service layer for fitlog.
//!
//! Wraps ingestion, persistence and aggregation behind [`service::WorkoutService`],
//! which speaks in serialisable request/response payloads.

pub mod service;
