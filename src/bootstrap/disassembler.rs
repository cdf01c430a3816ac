//! Writes the addr2line location into the external tool's configuration.
//!
//! fiber reads the path from an assignment line such as
//! `ADDR2LINE = '/usr/bin/addr2line'`; only that line is rewritten.

use crate::error::ConfigureError;
use log::info;
use regex::Regex;
use std::fs;
use std::path::Path;

/// The path must be absolute and name an existing file
pub fn validate_disassembler(path: &Path) -> Result<(), ConfigureError> {
    if path.is_absolute() && path.is_file() {
        Ok(())
    } else {
        Err(ConfigureError::InvalidDisassembler(path.display().to_string()))
    }
}

/// Rewrite the first `<key> = ...` line of `config_file`.
///
/// Returns whether the file content changed.
pub fn apply_disassembler_path(
    config_file: &Path,
    key: &str,
    disassembler: &Path,
) -> Result<bool, ConfigureError> {
    validate_disassembler(disassembler)?;
    if !config_file.is_file() {
        return Err(ConfigureError::MissingConfigFile(
            config_file.display().to_string(),
        ));
    }

    let original = fs::read_to_string(config_file)?;
    let updated = rewrite_setting(&original, key, &disassembler.to_string_lossy()).ok_or_else(
        || ConfigureError::MissingSetting {
            key: key.to_string(),
            file: config_file.display().to_string(),
        },
    )?;

    if updated == original {
        info!("{} already set in {}", key, config_file.display());
        return Ok(false);
    }

    fs::write(config_file, updated)?;
    info!(
        "Set {} = {} in {}",
        key,
        disassembler.display(),
        config_file.display()
    );
    Ok(true)
}

fn rewrite_setting(content: &str, key: &str, value: &str) -> Option<String> {
    let pattern = format!(r"(?m)^([ \t]*){}[ \t]*=[^\r\n]*", regex::escape(key));
    let re = Regex::new(&pattern).ok()?;
    let caps = re.captures(content)?;
    let whole = caps.get(0)?;
    let indent = caps.get(1).map(|m| m.as_str()).unwrap_or("");

    let mut out = String::with_capacity(content.len() + value.len());
    out.push_str(&content[..whole.start()]);
    out.push_str(indent);
    out.push_str(key);
    out.push_str(" = ");
    out.push_str(&quote(value));
    out.push_str(&content[whole.end()..]);
    Some(out)
}

fn quote(value: &str) -> String {
    if value.contains('\'') {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        format!("'{}'", value)
    }
}
