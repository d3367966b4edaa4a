//! Shared building blocks for usage-insights: the usage event model, error
//! taxonomy, model registry, plan tiers and small numeric helpers.

pub mod error;
pub mod formatting;
pub mod models;
pub mod plans;
pub mod registry;
pub mod settings;
pub mod stats;

pub use error::{InsightError, Result};
