//! Configuration file resolution and loading
//!
//! Bootstrap settings live in a TOML file. The file is located using the
//! following priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. Per-user config directory (`~/.config/livearena/<module>.toml` on Linux)
//! 4. System-wide `/etc/livearena/<module>.toml` (Linux only)
//!
//! A missing file is not an error: callers receive `None` and fall back to
//! built-in defaults after logging a warning.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Resolves the TOML config file for one module
#[derive(Debug, Clone)]
pub struct ConfigFileResolver {
    module_name: String,
    env_var_name: String,
}

impl ConfigFileResolver {
    /// Create resolver for a module (e.g. "battle")
    ///
    /// The environment variable consulted is `LIVEARENA_CONFIG`.
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            env_var_name: "LIVEARENA_CONFIG".to_string(),
        }
    }

    /// Override the environment variable name
    pub fn with_env_var(mut self, env_var_name: &str) -> Self {
        self.env_var_name = env_var_name.to_string();
        self
    }

    /// Resolve the config file path, or `None` if no candidate exists
    ///
    /// An explicit CLI path is returned even when it does not exist so that
    /// the caller can report the mistake instead of silently using defaults.
    pub fn resolve(&self, cli_arg: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = cli_arg {
            return Some(path.to_path_buf());
        }

        if let Ok(path) = std::env::var(&self.env_var_name) {
            if !path.is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        let file_name = format!("{}.toml", self.module_name);

        if let Some(user_config) = dirs::config_dir().map(|d| d.join("livearena").join(&file_name)) {
            if user_config.exists() {
                return Some(user_config);
            }
        }

        if cfg!(target_os = "linux") {
            let system_config = PathBuf::from("/etc/livearena").join(&file_name);
            if system_config.exists() {
                return Some(system_config);
            }
        }

        None
    }
}

/// Parse a TOML file into `T`
pub fn load_toml_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    let parsed = toml::from_str(&content)?;
    Ok(parsed)
}

/// Load config for a module, falling back to `T::default()` when no file exists
///
/// A file that exists but fails to parse is an error; a file that does not
/// exist only produces a warning.
pub fn load_or_default<T>(resolver: &ConfigFileResolver, cli_arg: Option<&Path>) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    match resolver.resolve(cli_arg) {
        Some(path) if path.exists() => {
            info!("Loading configuration from {}", path.display());
            load_toml_file(&path)
        }
        Some(path) if cli_arg.is_some() => Err(Error::Config(format!(
            "Config file not found: {}",
            path.display()
        ))),
        Some(path) => {
            warn!(
                "Config file {} does not exist, using built-in defaults",
                path.display()
            );
            Ok(T::default())
        }
        None => {
            warn!("No config file found, using built-in defaults");
            Ok(T::default())
        }
    }
}
