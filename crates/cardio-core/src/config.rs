//! Application configuration loaded from YAML.
//!
//! ```yaml
//! model_path: models/heart_gb.json
//! specialists:
//!   search_url: https://www.google.com/search
//!   location: Lahore
//!   categories:
//!     - title: Primary Care Doctor
//!       query: Primary Care Provider
//!     - title: Cardiologist
//!       query: Cardiologist
//! ```
//!
//! Every key is optional.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::specialists::{
    default_categories, SearchEngineDirectory, SpecialistCategory, DEFAULT_SEARCH_URL,
};

/// Default location of the classifier artifact.
pub const DEFAULT_MODEL_PATH: &str = "models/heart_gb.json";

/// Errors that can occur when loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Specialist lookup settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SpecialistConfig {
    /// Search endpoint the category query is appended to
    #[serde(default = "default_search_url")]
    pub search_url: String,

    /// Place to search near; "near me" when unset
    #[serde(default)]
    pub location: Option<String>,

    /// Specialists linked when disease is likely
    #[serde(default = "default_categories")]
    pub categories: Vec<SpecialistCategory>,
}

fn default_search_url() -> String {
    DEFAULT_SEARCH_URL.to_string()
}

impl Default for SpecialistConfig {
    fn default() -> Self {
        Self {
            search_url: default_search_url(),
            location: None,
            categories: default_categories(),
        }
    }
}

impl SpecialistConfig {
    /// Build the directory described by this configuration.
    pub fn directory(&self) -> SearchEngineDirectory {
        let directory = SearchEngineDirectory::new(self.search_url.clone());
        match &self.location {
            Some(location) => directory.with_location(location.clone()),
            None => directory,
        }
    }
}

fn default_model_path() -> PathBuf {
    PathBuf::from(DEFAULT_MODEL_PATH)
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Path to the classifier artifact
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    #[serde(default)]
    pub specialists: SpecialistConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            specialists: SpecialistConfig::default(),
        }
    }
}

impl AppConfig {
    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document means "all defaults".
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: AppConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML file.
    ///
    /// A relative `model_path` is resolved against the file's directory.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&contents)?;

        if config.model_path.is_relative() {
            if let Some(dir) = path.parent() {
                config.model_path = dir.join(&config.model_path);
            }
        }

        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.model_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("model_path is empty".to_string()));
        }

        let url = &self.specialists.search_url;
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(ConfigError::Invalid(format!(
                "specialists.search_url must be an http(s) URL, got '{}'",
                url
            )));
        }

        for category in &self.specialists.categories {
            if category.title.trim().is_empty() || category.query.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "specialist categories need a title and a query".to_string(),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::specialists::SpecialistDirectory;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AppConfig::from_yaml("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.model_path, PathBuf::from(DEFAULT_MODEL_PATH));
        assert_eq!(config.specialists.categories.len(), 2);
    }

    #[test]
    fn test_partial_config() {
        let yaml = r#"
model_path: /opt/models/heart.json
specialists:
  location: Lahore
"#;
        let config = AppConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.model_path, PathBuf::from("/opt/models/heart.json"));
        assert_eq!(config.specialists.search_url, DEFAULT_SEARCH_URL);
        assert_eq!(
            config.specialists.directory().search_url("Cardiologist"),
            "https://www.google.com/search?q=Cardiologist+near+Lahore"
        );
    }

    #[test]
    fn test_custom_categories() {
        let yaml = r#"
specialists:
  categories:
    - title: Cardiologist
      query: Cardiologist
"#;
        let config = AppConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.specialists.categories.len(), 1);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result = AppConfig::from_yaml("model: heart.json\n");
        assert!(matches!(result, Err(ConfigError::YamlError(_))));
    }

    #[test]
    fn test_non_http_search_url_rejected() {
        let yaml = r#"
specialists:
  search_url: "ftp://example.com"
"#;
        assert!(matches!(
            AppConfig::from_yaml(yaml),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_relative_model_path_resolves_against_config_dir() {
        let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..");
        let config = AppConfig::from_yaml_file(dir.join("cardio.yaml")).unwrap();

        assert_eq!(config.model_path, dir.join("models/heart_gb.json"));
        assert!(config.model_path.exists());
    }

    #[test]
    fn test_missing_config_file_is_io_error() {
        assert!(matches!(
            AppConfig::from_yaml_file("/nonexistent/cardio.yaml"),
            Err(ConfigError::IoError(_))
        ));
    }

    #[test]
    fn test_blank_category_rejected() {
        let yaml = r#"
specialists:
  categories:
    - title: ""
      query: Cardiologist
"#;
        assert!(AppConfig::from_yaml(yaml).is_err());
    }
}
