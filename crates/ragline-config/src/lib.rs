//! Ragline Config - Engine configuration from defaults, a TOML file and the environment.

mod config;
pub mod env;
mod error;
mod paths;

pub use config::*;
pub use error::{ConfigError, ConfigResult};
pub use paths::AppPaths;
