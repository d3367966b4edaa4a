//! Command-line front end for usage-insights: logging bootstrap, output
//! handling and the plain-text report.

pub mod bootstrap;
pub mod render;
