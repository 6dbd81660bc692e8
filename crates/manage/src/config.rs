//! Connection settings

use crate::error::{Error, Result};
use base64::{Engine as _, engine::general_purpose};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where the management and admin APIs live and how to authenticate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ClientConfig {
    pub host: String,
    pub scheme: String,
    pub manage_port: u16,
    pub admin_port: u16,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    /// Per-request timeout in seconds; 0 disables it
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            scheme: "http".to_string(),
            manage_port: 8002,
            admin_port: 8001,
            username: "admin".to_string(),
            password: String::new(),
            timeout_secs: 60,
        }
    }
}

impl ClientConfig {
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::Config("host must not be empty".into()));
        }
        if !matches!(self.scheme.as_str(), "http" | "https") {
            return Err(Error::Config(format!(
                "unsupported scheme '{}' (expected http or https)",
                self.scheme
            )));
        }
        if self.username.is_empty() {
            return Err(Error::Config("username must not be empty".into()));
        }
        Ok(())
    }

    pub fn manage_base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.manage_port)
    }

    pub fn admin_base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.admin_port)
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    /// Value of the `Authorization` header
    pub fn basic_auth(&self) -> String {
        let credentials = format!("{}:{}", self.username, self.password);
        format!("Basic {}", general_purpose::STANDARD.encode(credentials))
    }
}
