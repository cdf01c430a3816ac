use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_REPOSITORY: &str = "https://github.com/fiberx/fiber.git";
pub const DEFAULT_CHECKOUT_DIR: &str = "fiber";
pub const DEFAULT_ENV_SCRIPT: &str = "setup_angr_env.sh";
pub const DEFAULT_PACKAGES_SCRIPT: &str = "install_pkgs.sh";
pub const DEFAULT_DISASSEMBLER_FILE: &str = "sym_tracer.py";
pub const DEFAULT_DISASSEMBLER_KEY: &str = "ADDR2LINE";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub provision: ProvisionConfig,
    pub disassembler: DisassemblerConfig,
}

/// Where the external project comes from and how it is pinned
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub repository: String,
    /// Revision to pin; there is no built-in default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    /// Directory name created under the working directory
    pub checkout_dir: String,
    pub sync_policy: SyncPolicy,
    pub rerun_policy: RerunPolicy,
}

/// External setup procedures run from the checkout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionConfig {
    pub shell: String,
    pub environment_script: String,
    pub packages_script: String,
}

/// The addr2line setting in the external tool's configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisassemblerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Look for addr2line on the host when no path is configured
    pub detect: bool,
    /// File inside the checkout that holds the setting
    pub config_file: PathBuf,
    pub key: String,
    /// `path` was found on the host rather than configured
    #[serde(skip)]
    pub detected: bool,
}

/// What to do about the remote's default branch after cloning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SyncPolicy {
    /// Check out the pinned revision and never pull
    #[default]
    Pinned,
    /// Pull the default branch and ignore the pinned revision
    Latest,
    /// Check out the pinned revision, then pull on top of it
    PinThenSync,
}

/// Behaviour when the checkout directory already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RerunPolicy {
    #[default]
    Fail,
    Resume,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            repository: DEFAULT_REPOSITORY.to_string(),
            revision: None,
            checkout_dir: DEFAULT_CHECKOUT_DIR.to_string(),
            sync_policy: SyncPolicy::default(),
            rerun_policy: RerunPolicy::default(),
        }
    }
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            shell: "bash".to_string(),
            environment_script: DEFAULT_ENV_SCRIPT.to_string(),
            packages_script: DEFAULT_PACKAGES_SCRIPT.to_string(),
        }
    }
}

impl Default for DisassemblerConfig {
    fn default() -> Self {
        Self {
            path: None,
            detect: true,
            config_file: PathBuf::from(DEFAULT_DISASSEMBLER_FILE),
            key: DEFAULT_DISASSEMBLER_KEY.to_string(),
            detected: false,
        }
    }
}
