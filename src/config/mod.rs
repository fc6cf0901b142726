// Configuration management module
// Handles TOML configuration, environment overrides, and interactive setup

pub mod interactive;
pub mod settings;

pub use interactive::{run_interactive_config, show_config};
pub use settings::{Config, ConfigError, LibraryConfig, OllamaConfig, ServerConfig};

/// Get the default configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::default_config_dir()
}
