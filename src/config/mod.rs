mod init;
mod schema;
mod validation;

pub use init::write_default_config;
pub use schema::{default_composition, default_conversions, CatalogConfig, Config, DEFAULT_PRESET};
pub use validation::validate_config;

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

use crate::catalog::Catalog;

/// Get the config directory path (~/.config/hei-score/)
pub fn get_config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("hei-score"))
}

/// Get the default config file path (~/.config/hei-score/config.yaml)
pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join("config.yaml"))
}

/// Load configuration from a YAML file
///
/// # Arguments
///
/// * `path` - Optional path to config file. If None, uses the default path
///   (~/.config/hei-score/config.yaml) and falls back to the built-in
///   configuration when that file does not exist.
///
/// # Errors
///
/// Returns an error if:
/// - An explicit config file does not exist
/// - The config file cannot be read
/// - The YAML cannot be parsed
pub fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Config file not found at {}", path.display());
            }
            path
        }
        None => {
            let default_path = get_config_path()?;
            if !default_path.exists() {
                tracing::debug!(path = %default_path.display(), "no config file, using built-in defaults");
                return Ok(Config::default());
            }
            default_path
        }
    };

    let config_content = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;

    let config: Config = serde_saphyr::from_str(&config_content)
        .with_context(|| format!("Failed to parse config: invalid YAML in {}", config_path.display()))?;

    Ok(config)
}

impl CatalogConfig {
    /// Resolve the configured catalog.
    pub fn build(&self) -> Result<Catalog> {
        match (&self.preset, &self.categories) {
            (Some(preset), None) => Catalog::preset(preset)
                .with_context(|| format!("Unknown catalog preset '{}'", preset)),
            (None, Some(categories)) => {
                let edition = self.edition.as_deref().unwrap_or("custom");
                Ok(Catalog::new(edition, categories.clone())?)
            }
            (Some(_), Some(_)) => {
                anyhow::bail!("catalog: set either 'preset' or 'categories', not both")
            }
            (None, None) => anyhow::bail!("catalog: one of 'preset' or 'categories' is required"),
        }
    }
}
