//! Configuration loading.
//!
//! Every field has a default; a config file only needs the values it changes.
//! Lookup order is `--config`, then `$DRUGPRICE_CONFIG`, then
//! `<config dir>/drugprice/config.toml` when it exists.

use std::{
    env,
    path::{Path, PathBuf},
    str::FromStr,
};

use directories::ProjectDirs;
use serde::Deserialize;

use crate::query::PageSize;

pub const CONFIG_ENV: &str = "DRUGPRICE_CONFIG";
pub const URL_ENV: &str = "DRUGPRICE_URL";
pub const API_KEY_ENV: &str = "DRUGPRICE_API_KEY";
pub const AI_KEY_ENV: &str = "DRUGPRICE_AI_KEY";

/// When edits to the search configuration reach the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerMode {
    /// Edits are held until submitted.
    #[default]
    Manual,
    /// Every edit is sent after a quiet period.
    Automatic,
}

impl FromStr for TriggerMode {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "manual" => Ok(TriggerMode::Manual),
            "automatic" | "auto" => Ok(TriggerMode::Automatic),
            other => Err(format!("unknown trigger mode '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub request_timeout_ms: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.0-flash".to_string(),
            request_timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Base URL of the hosted database (`https://<project>.supabase.co`).
    pub url: String,
    pub api_key: String,
    pub table: String,
    pub users_table: String,
    pub request_timeout_ms: u64,
    pub page_size: u32,
    pub debounce_ms: u64,
    pub trigger: TriggerMode,
    pub cache_ttl_secs: u64,
    pub cache_capacity: usize,
    pub selection_limit: usize,
    pub stats_sample_cap: usize,
    pub stats_max_rows: usize,
    pub export_dir: PathBuf,
    pub require_login: bool,
    pub ai: AiConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            table: "danh_muc_thuoc".to_string(),
            users_table: "users".to_string(),
            request_timeout_ms: 15_000,
            page_size: 20,
            debounce_ms: 300,
            trigger: TriggerMode::Manual,
            cache_ttl_secs: 300,
            cache_capacity: 64,
            selection_limit: 10_000,
            stats_sample_cap: 1_000,
            stats_max_rows: 50_000,
            export_dir: PathBuf::from("."),
            require_login: true,
            ai: AiConfig::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl Config {
    /// Reads the config file (if any) and applies environment overrides.
    /// Call [`Config::validate`] once command-line overrides are in.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(config_path_from_env)
            .or_else(|| default_config_path().filter(|path| path.is_file()));
        let mut config = match path {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Loading config");
                Self::from_path(&path)?
            }
            None => Self::default(),
        };
        config.apply_env(|name| env::var(name).ok());
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        if let Some(url) = non_empty(URL_ENV) {
            self.url = url;
        }
        if let Some(key) = non_empty(API_KEY_ENV) {
            self.api_key = key;
        }
        if let Some(key) = non_empty(AI_KEY_ENV) {
            self.ai.api_key = Some(key);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "url",
                reason: format!("must not be empty (set it in the config file, {URL_ENV} or --url)"),
            });
        }
        if !self.url.starts_with("http://") && !self.url.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                field: "url",
                reason: "must start with http:// or https://".to_string(),
            });
        }
        if self.table.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "table",
                reason: "must not be empty".to_string(),
            });
        }
        if PageSize::new(self.page_size).is_none() {
            return Err(ConfigError::InvalidValue {
                field: "page_size",
                reason: format!("must be one of {:?}", PageSize::CHOICES),
            });
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_ms",
                reason: "must be > 0".to_string(),
            });
        }
        if self.selection_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "selection_limit",
                reason: "must be > 0".to_string(),
            });
        }
        Ok(())
    }

    pub fn page_size(&self) -> PageSize {
        PageSize::new(self.page_size).unwrap_or_default()
    }
}

fn config_path_from_env() -> Option<PathBuf> {
    env::var(CONFIG_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
}

pub fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "drugprice")
}

pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_missing_fields() {
        let config = Config::from_toml(
            r#"
            url = "https://catalog.example.co"
            page_size = 50
            trigger = "automatic"

            [ai]
            model = "gemini-pro"
            "#,
        )
        .unwrap();
        assert_eq!(config.table, "danh_muc_thuoc");
        assert_eq!(config.page_size().get(), 50);
        assert_eq!(config.trigger, TriggerMode::Automatic);
        assert_eq!(config.debounce_ms, 300);
        assert_eq!(config.ai.model, "gemini-pro");
        assert!(config.ai.base_url.starts_with("https://"));
        config.validate().unwrap();
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(matches!(
            Config::from_toml("colour = \"blue\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn environment_overrides_file_values() {
        let mut config = Config::from_toml("url = \"https://file.example\"").unwrap();
        config.apply_env(|name| match name {
            URL_ENV => Some("https://env.example".to_string()),
            API_KEY_ENV => Some("  ".to_string()),
            AI_KEY_ENV => Some("ai-secret".to_string()),
            _ => None,
        });
        assert_eq!(config.url, "https://env.example");
        assert_eq!(config.api_key, "");
        assert_eq!(config.ai.api_key.as_deref(), Some("ai-secret"));
    }

    #[test]
    fn validation_failures() {
        let config = Config::default();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "url", .. })
        ));

        let config = Config {
            url: "https://x.example".to_string(),
            page_size: 25,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "page_size", .. })
        ));

        let config = Config {
            url: "https://x.example".to_string(),
            request_timeout_ms: 0,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "request_timeout_ms", .. })
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = Config::from_path(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.toml"));
    }
}
