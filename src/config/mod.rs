use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_staging_dir")]
    pub staging_dir: PathBuf,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    /// Explicit path to the extraction tool binary. When unset the tool is
    /// resolved from PATH by probing the known variants.
    #[serde(default)]
    pub tool_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            staging_dir: default_staging_dir(),
            log_format: default_log_format(),
            tool_path: None,
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path))?;
        toml::from_str(&contents).with_context(|| format!("Failed to parse config file {}", path))
    }

    /// The hosting environment may hand us a port through the environment.
    pub fn apply_env_overrides(&mut self) {
        if let Some(port) = std::env::var("PORT")
            .ok()
            .and_then(|value| value.trim().parse::<u16>().ok())
        {
            self.port = port;
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn get_logging_format(&self) -> &str {
        &self.log_format
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_staging_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_log_format() -> String {
    "json".to_string()
}
