//! Configuration system for the Strata terrain engine.
//!
//! Provides runtime-configurable settings that persist to disk as RON files.
//! Supports CLI overrides via clap, hot-reload detection, validation, and
//! forward/backward compatible serialization.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{Config, DebugConfig, EditConfig, StreamingConfig, TerrainConfig, default_config_dir};
pub use error::ConfigError;
