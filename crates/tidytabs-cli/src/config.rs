use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use tidytabs_core::{AiConfig, OrganizeSettings};

pub const CONFIG_PATH_ENV: &str = "TIDYTABS_CONFIG";
pub const API_KEY_ENV: &str = "TIDYTABS_API_KEY";
pub const DEFAULT_CONFIG_PATH: &str = "config/tidytabs.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct CliConfig {
    pub ai: AiConfig,
    #[serde(default)]
    pub organize: OrganizeSettings,
    /// Where the task state lives; shared by every `tidytabs` process.
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,
    /// A `running` state older than this is treated as left over from a crash.
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,
}

impl CliConfig {
    pub fn load_default() -> Result<Self> {
        let path = env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut cfg = Self::load_from_path(path)?;
        if let Ok(key) = env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                cfg.ai.api_key = key;
            }
        }
        Ok(cfg)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path_ref = path.as_ref();
        let raw = fs::read_to_string(path_ref)
            .with_context(|| format!("failed to read config file {}", path_ref.display()))?;
        let cfg: Self = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path_ref.display()))?;

        if cfg.stale_after_secs == 0 {
            return Err(anyhow!("stale_after_secs must be greater than 0"));
        }

        Ok(cfg)
    }
}

fn default_state_path() -> PathBuf {
    PathBuf::from(".tidytabs/task.json")
}

fn default_stale_after_secs() -> u64 {
    600
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidytabs_core::ReasoningEffort;

    fn write(contents: &str) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(file.path(), contents).unwrap();
        file
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let file = write(
            r#"
            [ai]
            endpoint = "https://api.example.com/v1"
            model = "gpt-test"
            "#,
        );

        let cfg = CliConfig::load_from_path(file.path()).unwrap();

        assert_eq!(cfg.ai.api_key, "");
        assert_eq!(cfg.ai.reasoning_effort, ReasoningEffort::Off);
        assert!(cfg.organize.collapse_others);
        assert!(!cfg.organize.debug);
        assert_eq!(cfg.state_path, PathBuf::from(".tidytabs/task.json"));
        assert_eq!(cfg.stale_after_secs, 600);
    }

    #[test]
    fn full_config_is_read() {
        let file = write(
            r#"
            state_path = "/tmp/tt.json"
            stale_after_secs = 30

            [ai]
            endpoint = "http://localhost:8080/v1"
            api_key = "sk-file"
            model = "local"
            reasoning_effort = "high"

            [organize]
            collapse_others = false
            debug = true
            "#,
        );

        let cfg = CliConfig::load_from_path(file.path()).unwrap();

        assert_eq!(cfg.ai.api_key, "sk-file");
        assert_eq!(cfg.ai.reasoning_effort, ReasoningEffort::High);
        assert!(!cfg.organize.collapse_others);
        assert!(cfg.organize.debug);
        assert_eq!(cfg.stale_after_secs, 30);
    }

    #[test]
    fn zero_stale_age_is_rejected() {
        let file = write(
            r#"
            stale_after_secs = 0
            [ai]
            endpoint = "https://api.example.com/v1"
            model = "gpt-test"
            "#,
        );

        assert!(CliConfig::load_from_path(file.path()).is_err());
    }

    #[test]
    fn missing_file_mentions_the_path() {
        let err = CliConfig::load_from_path("/nonexistent/tidytabs.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/tidytabs.toml"));
    }
}
