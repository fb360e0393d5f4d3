//! CLI configuration management.
//!
//! Settings are read from `~/.config/adtlink/config.json` and then
//! overridden from the environment (a `.env` file is loaded first):
//! `ADT_URL`, `ADT_CLIENT`, `ADT_LANGUAGE`, `ADT_USER`, `ADT_PASSWORD`.
//! The password is never written to the config file.

use std::path::PathBuf;

use adtlink_core::{AuthMethod, AutoRefreshConfig, ClientConfig};
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Application name used for the config directory path
const APP_NAME: &str = "adtlink";

/// Config file name
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub base_url: Option<String>,
    pub client: Option<String>,
    pub language: Option<String>,
    pub username: Option<String>,
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub accept_invalid_certs: bool,
    pub auto_refresh: Option<AutoRefreshConfig>,
    #[serde(skip)]
    pub password: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Environment variables take precedence over the file.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(url) = lookup("ADT_URL") {
            self.base_url = Some(url);
        }
        if let Some(client) = lookup("ADT_CLIENT") {
            self.client = Some(client);
        }
        if let Some(language) = lookup("ADT_LANGUAGE") {
            self.language = Some(language);
        }
        if let Some(user) = lookup("ADT_USER") {
            self.username = Some(user);
        }
        if let Some(password) = lookup("ADT_PASSWORD") {
            self.password = Some(password);
        }
    }

    pub fn server(&self) -> Result<&str> {
        self.base_url
            .as_deref()
            .ok_or_else(|| anyhow!("No server configured. Set ADT_URL or base_url in {}", CONFIG_FILE))
    }

    pub fn user(&self) -> Result<&str> {
        self.username
            .as_deref()
            .ok_or_else(|| anyhow!("No user configured. Set ADT_USER or username in {}", CONFIG_FILE))
    }

    pub fn to_client_config(&self, password: String) -> Result<ClientConfig> {
        let client = self
            .client
            .clone()
            .ok_or_else(|| anyhow!("No client number configured. Set ADT_CLIENT"))?;

        let mut config = ClientConfig::new(
            self.server()?,
            client,
            AuthMethod::Basic {
                username: self.user()?.to_string(),
                password,
            },
        );
        config.language = self.language.clone();
        config.accept_invalid_certs = self.accept_invalid_certs;
        if let Some(timeout) = self.timeout_secs {
            config.timeout_secs = timeout;
        }
        if let Some(ref refresh) = self.auto_refresh {
            config.auto_refresh = refresh.clone();
        }
        Ok(config)
    }
}
