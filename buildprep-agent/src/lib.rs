//! Build Preparation Agent Library
//!
//! Backs up the deployed package tree once, then restores that baseline before
//! every build while leaving foreign and customized content alone.

pub mod config;
pub mod external;
pub mod fs;
pub mod location;
pub mod mirror;
pub mod orchestrator;
pub mod packages;
pub mod settings;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use orchestrator::{Orchestrator, RunSummary};
pub use utils::errors::PrepError;
