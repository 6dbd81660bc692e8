//! Configuration file resolution
//!
//! # Resolution Priority
//!
//! 1. `--config` flag (clap also reads `APPDEPLOY_CONFIG` into it)
//! 2. `./appdeploy.toml` in the working directory
//! 3. `appdeploy/appdeploy.toml` under the platform config directory
//!    (`~/.config` on Linux, `~/Library/Application Support` on macOS)

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};

/// Default configuration file name
pub const CONFIG_FILE: &str = "appdeploy.toml";

/// Environment variable for the config file path
pub const ENV_CONFIG: &str = "APPDEPLOY_CONFIG";

/// Locate the configuration file
pub fn config_file(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        let path = expand(&path.to_string_lossy());
        log::debug!("Using config file from flag or {ENV_CONFIG}: {}", path.display());
        if !path.is_file() {
            bail!("Config file not found: {}", path.display());
        }
        return Ok(path);
    }

    let local = PathBuf::from(CONFIG_FILE);
    if local.is_file() {
        log::debug!("Using config file in working directory");
        return Ok(local);
    }

    let platform = dirs::config_dir()
        .context("Could not determine config directory")?
        .join("appdeploy")
        .join(CONFIG_FILE);
    if platform.is_file() {
        log::debug!("Using platform config file: {}", platform.display());
        return Ok(platform);
    }

    bail!(
        "No {CONFIG_FILE} found in the working directory or {}; pass --config or set {ENV_CONFIG}",
        platform.display()
    )
}

/// Expand ~ and environment variables in a path string
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

/// Resolve `path` against `base` unless it is already absolute
pub fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    let expanded = expand(&path.to_string_lossy());
    if expanded.is_absolute() {
        expanded
    } else {
        base.join(expanded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_explicit_config_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("custom.toml");
        fs::write(&file, "").unwrap();
        assert_eq!(config_file(Some(&file)).unwrap(), file);
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = config_file(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_expand_tilde() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(expand("~/ml-config"), home.join("ml-config"));
    }

    #[test]
    fn test_expand_plain_path_unchanged() {
        assert_eq!(expand("/absolute/path"), PathBuf::from("/absolute/path"));
        assert_eq!(expand("relative"), PathBuf::from("relative"));
    }

    #[test]
    fn test_resolve_against() {
        let base = Path::new("/project");
        assert_eq!(
            resolve_against(base, Path::new("src/main/ml-config")),
            PathBuf::from("/project/src/main/ml-config")
        );
        assert_eq!(
            resolve_against(base, Path::new("/etc/ml-config")),
            PathBuf::from("/etc/ml-config")
        );
    }
}
