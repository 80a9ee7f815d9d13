//! Configuration module
//!
//! - types/mod.rs: Core `Config` and logging settings
//! - types/server.rs: Listener and CORS settings
//! - types/relay.rs: Rate gate, pump supervision and tool guard settings
//! - io.rs: Configuration loading and saving
//! - validation.rs: Configuration validation
//! - paths.rs: Configuration file paths

mod io;
mod paths;
mod types;
mod validation;

pub use types::relay::{GuardConfig, RelayConfig};
pub use types::server::ServerConfig;
pub use types::{Config, LogConfig, LogFormat};

pub use io::{
    apply_env_overrides, apply_overrides_from, load_config, load_config_from_path,
    load_config_with, save_config,
};
pub use paths::{config_dir, config_path};
pub use validation::{validate_config, ConfigValidationResult, ValidationIssue};
