//! TOML configuration for the console.
//!
//! ```toml
//! [server]
//! base_url = "http://127.0.0.1:9000"
//!
//! [auth]
//! mode = "basic"
//! username = "admin"
//!
//! [console]
//! project = "docs"
//! ```
//!
//! Secrets may be left out of the file and supplied through `RAGC_PASSWORD`
//! (basic auth) or `RAGC_TOKEN` (bearer auth).

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

use crate::client::{Anonymous, BasicAuth, BearerToken, Credentials};

/// Environment variable consulted when `auth.password` is absent.
pub const PASSWORD_ENV: &str = "RAGC_PASSWORD";
/// Environment variable consulted when `auth.token` is absent.
pub const TOKEN_ENV: &str = "RAGC_TOKEN";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub console: ConsoleConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub base_url: String,
    /// Per-request timeout. `0` disables it.
    #[serde(default)]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    #[serde(default = "default_auth_mode")]
    pub mode: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            mode: default_auth_mode(),
            username: None,
            password: None,
            token: None,
        }
    }
}

fn default_auth_mode() -> String {
    "none".to_string()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ConsoleConfig {
    #[serde(default)]
    pub project: Option<String>,
}

impl Config {
    /// Config pointing at `base_url` with no auth and no default project.
    pub fn minimal(base_url: &str) -> Self {
        Self {
            server: ServerConfig {
                base_url: base_url.to_string(),
                timeout_secs: 0,
            },
            auth: AuthConfig::default(),
            console: ConsoleConfig::default(),
        }
    }

    /// Build the credential provider described by `[auth]`.
    pub fn credentials(&self) -> Result<Arc<dyn Credentials>> {
        match self.auth.mode.as_str() {
            "none" => Ok(Arc::new(Anonymous)),
            "basic" => {
                let username = self
                    .auth
                    .username
                    .clone()
                    .ok_or_else(|| anyhow::anyhow!("auth.username required for basic auth"))?;
                let password = match &self.auth.password {
                    Some(p) => p.clone(),
                    None => std::env::var(PASSWORD_ENV).with_context(|| {
                        format!("auth.password not set and {} not in environment", PASSWORD_ENV)
                    })?,
                };
                Ok(Arc::new(BasicAuth::new(username, password)))
            }
            "bearer" => {
                let token = match &self.auth.token {
                    Some(t) => t.clone(),
                    None => std::env::var(TOKEN_ENV).with_context(|| {
                        format!("auth.token not set and {} not in environment", TOKEN_ENV)
                    })?,
                };
                Ok(Arc::new(BearerToken::new(token)))
            }
            other => bail!("Unknown auth mode: '{}'. Must be none, basic, or bearer.", other),
        }
    }

    /// Resolve the project to operate on: an explicit name wins over `[console].project`.
    pub fn project_name(&self, explicit: Option<&str>) -> Result<String> {
        let name = explicit
            .map(str::to_string)
            .or_else(|| self.console.project.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("no project selected: pass --project or set console.project")
            })?;
        if name.trim().is_empty() {
            bail!("project name must not be empty");
        }
        Ok(name)
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    let base = config.server.base_url.trim();
    if base.is_empty() {
        bail!("server.base_url must not be empty");
    }
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        bail!("server.base_url must start with http:// or https://");
    }

    match config.auth.mode.as_str() {
        "none" | "basic" | "bearer" => {}
        other => bail!(
            "Unknown auth mode: '{}'. Must be none, basic, or bearer.",
            other
        ),
    }

    if config.auth.mode == "basic" && config.auth.username.is_none() {
        bail!("auth.username must be specified when auth.mode is 'basic'");
    }

    Ok(config)
}
