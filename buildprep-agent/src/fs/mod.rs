//! Filesystem helpers: tree scanning and volume probing.

pub mod volume;
pub mod walker;
