//! Hub statistics

pub mod metrics;

pub use metrics::{HubMetrics, HubStats};
