//! # Host Tool Detection
//!
//! Locates the host binaries the bootstrap depends on (`git`, the shell that
//! runs the setup scripts, and `addr2line` for the external tool's config).

use log::{debug, info};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, SystemTime};

/// Tools reported by `status`; the run preflight only needs git
pub const REQUIRED_TOOLS: &[&str] = &["git", "bash"];
pub const DISASSEMBLER_TOOL: &str = "addr2line";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolStatus {
    pub available: bool,
    pub path: Option<PathBuf>,
    pub version: Option<String>,
    pub installation_source: InstallationSource,
    pub last_checked: SystemTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstallationSource {
    SystemPath,
    UserLocal,
    PackageManager(String),
    Manual,
    NotFound,
}

#[derive(Debug, Clone)]
pub struct ToolDetectionConfig {
    pub cache_ttl: Duration,
    pub enable_cache: bool,
    pub search_user_paths: bool,
    pub search_system_paths: bool,
}

impl Default for ToolDetectionConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(300),
            enable_cache: true,
            search_user_paths: true,
            search_system_paths: true,
        }
    }
}

pub struct ToolDetector {
    cache: HashMap<String, ToolStatus>,
    config: ToolDetectionConfig,
}

impl ToolDetector {
    pub fn new() -> Self {
        Self::with_config(ToolDetectionConfig::default())
    }

    pub fn with_config(config: ToolDetectionConfig) -> Self {
        Self {
            cache: HashMap::new(),
            config,
        }
    }

    /// Detect tool availability with caching
    pub fn detect_tool(&mut self, tool_name: &str) -> ToolStatus {
        if !self.config.enable_cache {
            return self.detect_tool_real_time(tool_name);
        }

        if let Some(cached) = self.cache.get(tool_name)
            && cached.last_checked.elapsed().unwrap_or(Duration::MAX) < self.config.cache_ttl
        {
            debug!(
                "Using cached status for {}: available={}",
                tool_name, cached.available
            );
            return cached.clone();
        }

        let status = self.detect_tool_real_time(tool_name);
        debug!(
            "Real-time detection for {}: available={}, path={:?}",
            tool_name, status.available, status.path
        );
        self.cache.insert(tool_name.to_string(), status.clone());
        status
    }

    /// Detect every tool the bootstrap uses, keyed by name
    pub fn detect_required_tools(&mut self, shell: &str) -> HashMap<String, ToolStatus> {
        let mut tools: Vec<&str> = REQUIRED_TOOLS.to_vec();
        tools.extend([shell, DISASSEMBLER_TOOL]);

        let mut results = HashMap::new();
        for tool in tools {
            if !results.contains_key(tool) {
                results.insert(tool.to_string(), self.detect_tool(tool));
            }
        }
        results
    }

    /// Absolute path of `addr2line` on this host, if one can be found
    pub fn find_disassembler(&mut self) -> Option<PathBuf> {
        let status = self.detect_tool(DISASSEMBLER_TOOL);
        status.path.filter(|p| p.is_absolute())
    }

    fn detect_tool_real_time(&self, tool_name: &str) -> ToolStatus {
        debug!("Starting real-time detection for {}", tool_name);

        for dir in self.search_paths() {
            let candidate = dir.join(tool_name);
            if !candidate.is_file() {
                continue;
            }
            let version = self.probe_version(&candidate);
            let source = determine_installation_source(&dir);
            info!(
                "Found {} at {:?} with version {:?} (source: {:?})",
                tool_name, candidate, version, source
            );
            return ToolStatus {
                available: true,
                path: Some(candidate),
                version,
                installation_source: source,
                last_checked: SystemTime::now(),
            };
        }

        debug!("Tool {} not found in any location", tool_name);
        ToolStatus {
            available: false,
            path: None,
            version: None,
            installation_source: InstallationSource::NotFound,
            last_checked: SystemTime::now(),
        }
    }

    /// PATH entries first, then user and system locations
    fn search_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = std::env::var_os("PATH")
            .map(|p| std::env::split_paths(&p).collect())
            .unwrap_or_default();

        if self.config.search_user_paths
            && let Some(home) = dirs::home_dir()
        {
            paths.push(home.join(".local").join("bin"));
        }

        if self.config.search_system_paths {
            paths.push(PathBuf::from("/usr/local/bin"));
            paths.push(PathBuf::from("/usr/bin"));
            paths.push(PathBuf::from("/bin"));
        }

        let mut seen = std::collections::HashSet::new();
        paths.retain(|p| p.is_absolute() && seen.insert(p.clone()));
        paths
    }

    fn probe_version(&self, tool_path: &Path) -> Option<String> {
        let output = Command::new(tool_path).arg("--version").output().ok()?;
        let text = if output.stdout.is_empty() {
            String::from_utf8_lossy(&output.stderr).into_owned()
        } else {
            String::from_utf8_lossy(&output.stdout).into_owned()
        };
        extract_version_generic(&text)
    }
}

impl Default for ToolDetector {
    fn default() -> Self {
        Self::new()
    }
}

fn determine_installation_source(path: &Path) -> InstallationSource {
    let path_str = path.to_string_lossy().to_lowercase();

    if path_str.contains(".local") {
        InstallationSource::UserLocal
    } else if path_str.contains("homebrew") || path_str.contains("linuxbrew") {
        InstallationSource::PackageManager("brew".to_string())
    } else if path_str == "/usr/bin" || path_str == "/bin" {
        InstallationSource::PackageManager("system".to_string())
    } else if path_str.starts_with("/usr/local") {
        InstallationSource::SystemPath
    } else {
        InstallationSource::Manual
    }
}

/// Extract version using common patterns
fn extract_version_generic(text: &str) -> Option<String> {
    let patterns = [r"\b(\d+\.\d+\.\d+(?:[+-][a-zA-Z0-9-.]+)?)\b", r"\b(\d+\.\d+)\b"];

    for pattern in patterns {
        if let Ok(re) = Regex::new(pattern)
            && let Some(captures) = re.captures(text)
            && let Some(version) = captures.get(1)
        {
            return Some(version.as_str().to_string());
        }
    }

    None
}
