//! Configuration Module
//!
//! Configuration loading for the ticker service.

mod settings;

pub use settings::{
    BroadcastSettings, ConfigError, FetchSettings, ServerSettings, ServiceConfig,
};
