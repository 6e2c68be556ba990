//! SignalRoot: idempotent webhook ingestion and incident correlation.
//!
//! Alerts and deploy events arrive from PagerDuty, CloudWatch, GitHub and
//! Jenkins. Each delivery is processed at most once, each upstream alert
//! opens at most one incident, and each incident notifies at most once per
//! notification window.

pub mod adapters;
pub mod api;
pub mod clock;
pub mod config;
pub mod correlation;
pub mod directory;
pub mod error;
pub mod metrics;
pub mod models;
pub mod notifications;
pub mod processing;
pub mod state;

pub use error::{AppError, Result};
