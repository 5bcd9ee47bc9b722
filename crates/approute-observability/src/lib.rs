//! AppRoute Observability
//!
//! This crate provides observability features:
//! - Metrics collection (Prometheus)
//! - Metrics-recording decorator for rotation handlers
//! - Health endpoints

pub mod health;
pub mod metrics;

pub use health::{HealthState, ReadinessChecker, health_router};
pub use metrics::{Metrics, RecordedHandler};
