//! CLI configuration

use crate::error::{CliError, CliResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// CLI configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Catalog file replacing the built-in one; relative paths are resolved
    /// against the directory of the config file
    pub catalog: Option<PathBuf>,

    /// Print the banner when a chat session starts
    pub show_banner: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            catalog: None,
            show_banner: true,
        }
    }
}

impl CliConfig {
    /// Load configuration from file. A missing file means defaults.
    pub fn load(path: Option<&str>) -> CliResult<Self> {
        let config_path = match path {
            Some(p) => PathBuf::from(p),
            None => match Self::default_config_path() {
                Some(p) => p,
                None => {
                    tracing::warn!("Cannot find config directory, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        if !config_path.exists() {
            if path.is_some() {
                tracing::warn!(path = %config_path.display(), "Config file not found, using defaults");
            }
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;
        let mut config: CliConfig = toml::from_str(&contents)
            .map_err(|e| CliError::Config(format!("{}: {}", config_path.display(), e)))?;
        config.resolve_paths(&config_path);
        tracing::debug!(path = %config_path.display(), "Loaded config");
        Ok(config)
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("thia").join("config.toml"))
    }

    fn resolve_paths(&mut self, config_path: &Path) {
        if let (Some(catalog), Some(base)) = (&self.catalog, config_path.parent()) {
            if catalog.is_relative() {
                self.catalog = Some(base.join(catalog));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = CliConfig::default();
        assert!(config.catalog.is_none());
        assert!(config.show_banner);
    }

    #[test]
    fn test_load_missing_config() {
        // Should return default config when file doesn't exist
        let config = CliConfig::load(Some("/nonexistent/path/config.toml")).unwrap();
        assert_eq!(config, CliConfig::default());
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "catalog = \"meu_catalogo.toml\"\nshow_banner = false").unwrap();

        let config = CliConfig::load(path.to_str()).unwrap();
        assert!(!config.show_banner);
        assert_eq!(config.catalog, Some(dir.path().join("meu_catalogo.toml")));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "catalog = \"/etc/thia/catalog.toml\"\n").unwrap();

        let config = CliConfig::load(path.to_str()).unwrap();
        assert!(config.show_banner);
        assert_eq!(config.catalog, Some(PathBuf::from("/etc/thia/catalog.toml")));
    }

    #[test]
    fn test_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "show_banner = \"talvez\"\n").unwrap();

        let err = CliConfig::load(path.to_str()).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }
}
