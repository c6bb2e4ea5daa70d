//! Utility modules for the build-prep agent.

pub mod errors;
pub mod format;
pub mod logger;

pub use errors::{ErrorKind, PrepError, Result};
