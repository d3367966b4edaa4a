//! Analysis layer for usage-insights.
//!
//! Six analyzers turn a slice of [`usage_core::models::UsageEvent`]s into cost,
//! model, plan, cache, pattern and savings reports; [`engine`] composes them
//! and [`reader`] loads events from JSON / JSONL files.

pub mod cache_efficiency;
pub mod cost;
pub mod engine;
pub mod model_efficiency;
pub mod plan_optimizer;
pub mod reader;
pub mod savings;
pub mod usage_patterns;

pub use usage_core as core;
