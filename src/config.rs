//! `appdeploy.toml` loading
//!
//! ```toml
//! [connection]
//! host = "localhost"
//! username = "admin"
//!
//! [app]
//! name = "my-app"
//! config-dir = "src/main/ml-config"
//!
//! [restart]
//! deadline-secs = 300
//!
//! [commands.forests]
//! async-enabled = false
//!
//! [ranks.users]
//! execute = 5
//! ```

use crate::paths;
use anyhow::{Context, Result};
use manage::ClientConfig;
use orchestration::{AppConfig, CommandOverrides, RankOverride};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Environment variable that supplies the connection password
pub const ENV_PASSWORD: &str = "APPDEPLOY_PASSWORD";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Settings {
    pub connection: ClientConfig,
    pub app: AppConfig,
    pub restart: RestartSettings,
    pub commands: BTreeMap<String, CommandOverrides>,
    pub ranks: BTreeMap<String, RankOverride>,
}

/// How long to wait for the server to come back after a restart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RestartSettings {
    pub poll_interval_ms: u64,
    /// Unset means wait forever
    pub deadline_secs: Option<u64>,
}

impl Default for RestartSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            deadline_secs: None,
        }
    }
}

impl RestartSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }
}

impl Settings {
    /// Load settings from a TOML file
    ///
    /// The app's config dir is resolved relative to the file's directory and
    /// the password falls back to `APPDEPLOY_PASSWORD`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let mut settings = Self::parse(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;

        let base = path.parent().unwrap_or(Path::new("."));
        settings.app.config_dir = paths::resolve_against(base, &settings.app.config_dir);

        if settings.connection.password.is_empty()
            && let Ok(password) = std::env::var(ENV_PASSWORD)
        {
            log::debug!("Using password from {ENV_PASSWORD}");
            settings.connection.password = password;
        }
        Ok(settings)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Target configuration with the top-level command and rank tables merged in
    ///
    /// Entries in `[commands]`/`[ranks]` win over any nested under `[app]`.
    pub fn app_config(&self) -> AppConfig {
        let mut app = self.app.clone();
        app.commands.extend(self.commands.clone());
        app.ranks.extend(self.ranks.clone());
        app
    }
}
