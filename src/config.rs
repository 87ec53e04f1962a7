use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the backend function gateway. Logical endpoint names
    /// resolve to `<api_base_url>/<name>` unless overridden below.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Per-endpoint URL overrides keyed by logical name
    /// (e.g. "display-config", "users").
    #[serde(default)]
    pub endpoints: BTreeMap<String, String>,

    /// Path of the local key-value state file.
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,

    /// Role the console acts as when previewing visibility.
    #[serde(default)]
    pub operator_role: Option<String>,
}

fn default_api_base_url() -> String {
    "http://127.0.0.1:7878".to_string()
}

fn default_state_path() -> PathBuf {
    Config::cadaster_dir().join("state.json")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            endpoints: BTreeMap::new(),
            state_path: default_state_path(),
            operator_role: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let mut config = Self::default();
            config.apply_env_overrides();
            return Ok(config);
        }

        let contents = fs::read_to_string(&config_path)
            .context("Failed to read config file")?;
        let mut config: Config = toml::from_str(&contents)
            .context("Failed to parse config file")?;

        config.apply_env_overrides();

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(&config_path, contents)?;

        Ok(())
    }

    pub fn config_path() -> PathBuf {
        std::env::var("CADASTER_CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::cadaster_dir().join("config.toml"))
    }

    pub fn cadaster_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".cadaster")
    }

    /// Resolve a logical endpoint name to a full URL.
    pub fn endpoint_url(&self, name: &str) -> String {
        self.endpoints.get(name).cloned().unwrap_or_else(|| {
            format!("{}/{}", self.api_base_url.trim_end_matches('/'), name)
        })
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("CADASTER_API_URL") {
            self.api_base_url = val;
        }

        if let Ok(path) = std::env::var("CADASTER_STATE_PATH") {
            self.state_path = PathBuf::from(path);
        }

        if let Ok(val) = std::env::var("CADASTER_ROLE") {
            self.operator_role = Some(val);
        }
    }
}

pub async fn show_config() -> Result<()> {
    let config = Config::load()?;
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

pub async fn init_config() -> Result<()> {
    let config_path = Config::config_path();

    if config_path.exists() {
        anyhow::bail!("Config file already exists at: {}", config_path.display());
    }

    let config = Config::default();
    config.save()?;

    println!("Initialized config at: {}", config_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url_falls_back_to_base() {
        let config = Config {
            api_base_url: "https://api.example.dev/".to_string(),
            ..Config::default()
        };
        assert_eq!(
            config.endpoint_url("display-config"),
            "https://api.example.dev/display-config"
        );
    }

    #[test]
    fn test_endpoint_url_prefers_override() {
        let mut config = Config::default();
        config.endpoints.insert(
            "users".to_string(),
            "https://fn.example.dev/abc123".to_string(),
        );
        assert_eq!(config.endpoint_url("users"), "https://fn.example.dev/abc123");
    }
}
