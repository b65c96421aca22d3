//! Tomate Core - Shared functionality for the Tomate timer
//!
//! Paths, user configuration and display formatting used by the
//! `tomate` library and binary.

pub mod config;
pub mod format;
pub mod paths;

pub use config::Config;
pub use paths::Paths;
