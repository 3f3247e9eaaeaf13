use crate::agent::{DEFAULT_CODE_EXECUTION_TYPE, RunBudget};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const PTC_DIR: &str = ".ptc";

pub const DEFAULT_MODEL: &str = "claude-opus-4-6";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub api_key: String,
    pub base_url: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    /// Warn when the container has less than this many seconds left.
    pub expiry_buffer_secs: u64,
    pub code_execution_type: String,
    /// Sent as the `anthropic-beta` header when non-empty.
    pub betas: Vec<String>,
    pub max_turns: Option<usize>,
    pub max_tool_calls: Option<usize>,
    pub concurrent_tools: bool,
    pub caller_enforcement: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_key: String::new(),
            base_url: None,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 4096,
            expiry_buffer_secs: 30,
            code_execution_type: DEFAULT_CODE_EXECUTION_TYPE.to_string(),
            betas: Vec::new(),
            max_turns: None,
            max_tool_calls: None,
            concurrent_tools: true,
            caller_enforcement: false,
        }
    }
}

impl Config {
    pub fn load_or_init() -> Result<Self> {
        if config_exists() {
            load_config()
        } else {
            Ok(Config::default())
        }
    }

    pub fn budget(&self) -> RunBudget {
        RunBudget {
            max_turns: self.max_turns,
            max_tool_calls: self.max_tool_calls,
        }
    }

    pub fn expiry_buffer(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.expiry_buffer_secs)
    }
}

pub fn get_ptc_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(PTC_DIR)
}

pub fn get_config_path() -> PathBuf {
    get_ptc_dir().join("config.toml")
}

pub fn config_exists() -> bool {
    get_config_path().exists()
}

pub fn load_config() -> Result<Config> {
    load_config_from(&get_config_path())
}

pub fn load_config_from(config_path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(config_path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            anyhow::anyhow!("Config file not found. Run 'ptc onboard' to set up your configuration.")
        } else {
            anyhow::anyhow!("Failed to read config from {}: {}", config_path.display(), e)
        }
    })?;

    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config from {}", config_path.display()))
}

pub fn save_config(config: &Config) -> Result<()> {
    save_config_to(config, &get_config_path())
}

pub fn save_config_to(config: &Config, config_path: &Path) -> Result<()> {
    if let Some(dir) = config_path.parent()
        && !dir.exists()
    {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create config directory at {}", dir.display()))?;
    }

    let content =
        toml::to_string_pretty(config).with_context(|| "Failed to serialize config to TOML")?;

    std::fs::write(config_path, content)
        .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn config_round_trips_through_toml() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("config.toml");

        let config = Config {
            api_key: "sk-test".into(),
            max_turns: Some(12),
            betas: vec!["advanced-tool-use-2025-11-20".into()],
            ..Default::default()
        };
        save_config_to(&config, &path).unwrap();

        assert_eq!(load_config_from(&path).unwrap(), config);
    }

    #[test]
    fn partial_config_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "model = \"claude-sonnet-4-5\"\nmax_tool_calls = 40\n").unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.model, "claude-sonnet-4-5");
        assert_eq!(config.max_tokens, 4096);
        assert_eq!(config.expiry_buffer_secs, 30);
        assert!(config.concurrent_tools);
        assert_eq!(
            config.budget(),
            RunBudget::unbounded().with_max_tool_calls(40)
        );
    }

    #[test]
    fn missing_config_points_at_onboarding() {
        let tmp = TempDir::new().unwrap();
        let err = load_config_from(&tmp.path().join("absent.toml")).unwrap_err();
        assert!(err.to_string().contains("ptc onboard"));
    }
}
