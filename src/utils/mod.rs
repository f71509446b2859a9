//! Utility modules for configuration and logging

pub mod config;
pub mod logging;

pub use config::{ClassifierConfig, ConfigError, ConfigurationManager};
pub use logging::{init_logging, LogConfig, LogFormat, LogLevel};
