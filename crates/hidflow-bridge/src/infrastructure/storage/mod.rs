//! Persistent configuration.

pub mod config;

pub use config::{
    load_config, render_config, AppConfig, ConfigError, ConfigOverrides, FileConfigSource,
    StaticConfigSource,
};
