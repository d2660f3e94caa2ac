pub mod config;

pub use config::{
    Config, ConfigError, ConfigOverlay, DialectOverlay, DialectSettings, LoggingConfig, LoggingOverlay,
    PropertyOverrides,
};
