use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::message::INBOX;
use crate::session::SessionSettings;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    pub client_id: String,
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
    /// Listing filter; every label must be present on a message.
    #[serde(default = "default_labels")]
    pub labels: Vec<String>,
    #[serde(default = "default_retry_interval")]
    pub retry_interval_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_connect_attempts: Option<u32>,
    /// 0 disables the timeout.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_path: Option<PathBuf>,
}

fn default_redirect_uri() -> String {
    "http://127.0.0.1:8080/callback".to_string()
}

fn default_labels() -> Vec<String> {
    vec![INBOX.to_string()]
}

fn default_retry_interval() -> u64 {
    5
}

fn default_request_timeout() -> u64 {
    30
}

impl Config {
    fn template() -> Self {
        Self {
            client_id: "YOUR_CLIENT_ID.apps.googleusercontent.com".to_string(),
            redirect_uri: default_redirect_uri(),
            labels: default_labels(),
            retry_interval_secs: default_retry_interval(),
            max_connect_attempts: None,
            request_timeout_secs: default_request_timeout(),
            log_path: None,
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    pub fn resolve_log_path(&self) -> Result<PathBuf> {
        match &self.log_path {
            Some(p) => Ok(p.clone()),
            None => crate::logging::default_log_path(),
        }
    }

    pub fn session_settings(&self, debug: bool) -> SessionSettings {
        let labels = if self.labels.is_empty() {
            default_labels()
        } else {
            self.labels.clone()
        };
        SessionSettings {
            labels,
            retry_interval: Duration::from_secs(self.retry_interval_secs),
            max_connect_attempts: self.max_connect_attempts,
            debug,
        }
    }
}

fn config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("no config dir available"))?
        .join("tegmail"))
}

pub fn config_path() -> Result<PathBuf> {
    let mut p = config_dir()?;
    fs::create_dir_all(&p)?;
    p.push("config.toml");
    Ok(p)
}

pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

/// Read `path`, or write a template there and fail so the user can edit it.
pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tom = toml::to_string_pretty(&Config::template())?;
        fs::write(path, tom)?;
        return Err(anyhow::anyhow!(
            "Created template config at {}; edit it and run again",
            path.display()
        ));
    }
    let s = fs::read_to_string(path)?;
    let cfg: Config = toml::from_str(&s)?;
    Ok(cfg)
}
