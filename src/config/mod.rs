pub mod types;

use crate::error::{ConfigError, Result};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

pub use types::{Config, RerunPolicy, SyncPolicy};

const CONFIG_FILE_NAME: &str = ".fiber-bootstrap.toml";

/// Get the global config file path (~/.fiber-bootstrap.toml)
pub fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(CONFIG_FILE_NAME))
}

/// Get the local config file path (workdir/.fiber-bootstrap.toml)
pub fn local_config_path(workdir: &Path) -> PathBuf {
    workdir.join(CONFIG_FILE_NAME)
}

/// Load configuration.
///
/// An explicit file wins outright; otherwise the local file is tried, then
/// the global one, then defaults. Unlike a missing file, a file that exists
/// but does not parse is an error.
pub fn load_config(explicit: Option<&Path>, workdir: &Path) -> Result<Config> {
    if let Some(path) = explicit {
        return read_config(path);
    }

    let local = local_config_path(workdir);
    if local.is_file() {
        return read_config(&local);
    }

    if let Some(global) = global_config_path()
        && global.is_file()
    {
        return read_config(&global);
    }

    debug!("No configuration file found, using defaults");
    Ok(Config::default())
}

fn read_config(path: &Path) -> Result<Config> {
    debug!("Loading configuration from {}", path.display());
    let content = fs::read_to_string(path)?;
    parse_config(&content).map_err(|reason| {
        ConfigError::ParsingFailed {
            path: path.display().to_string(),
            reason,
        }
        .into()
    })
}

fn parse_config(content: &str) -> std::result::Result<Config, String> {
    toml::from_str(content).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = parse_config(
            r#"
            [source]
            revision = "4c7a1e0"
            sync_policy = "pin-then-sync"
            "#,
        )
        .unwrap();

        assert_eq!(config.source.revision.as_deref(), Some("4c7a1e0"));
        assert_eq!(config.source.sync_policy, SyncPolicy::PinThenSync);
        assert_eq!(config.source.repository, types::DEFAULT_REPOSITORY);
        assert_eq!(config.source.rerun_policy, RerunPolicy::Fail);
        assert_eq!(config.provision.environment_script, "setup_angr_env.sh");
        assert_eq!(config.provision.packages_script, "install_pkgs.sh");
        assert!(config.disassembler.detect);
    }

    #[test]
    fn test_local_file_is_loaded() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            local_config_path(temp_dir.path()),
            "[source]\nrevision = \"abc123\"\ncheckout_dir = \"fiber-src\"\n",
        )
        .unwrap();

        let config = load_config(None, temp_dir.path()).unwrap();
        assert_eq!(config.source.revision.as_deref(), Some("abc123"));
        assert_eq!(config.source.checkout_dir, "fiber-src");
    }

    #[test]
    fn test_explicit_file_must_parse() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.toml");
        fs::write(&path, "[source\nrevision =").unwrap();

        let err = load_config(Some(&path), temp_dir.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn test_unknown_policy_is_rejected() {
        assert!(parse_config("[source]\nsync_policy = \"sometimes\"\n").is_err());
    }
}
