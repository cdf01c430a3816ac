use crate::{bootstrap::OperatorGuidance, cli::Cli, tool_detector::ToolDetector};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

use super::run::resolve_config;

#[derive(Serialize)]
struct GuideOutput {
    config_file: PathBuf,
    key: String,
    suggested: Option<PathBuf>,
}

pub fn handle_guide(cli: &Cli) -> crate::Result<()> {
    let workdir = cli.workdir()?;
    let config = resolve_config(cli, &workdir)?;
    let config_file = workdir
        .join(&config.source.checkout_dir)
        .join(&config.disassembler.config_file);

    let suggested = match config.disassembler.path {
        Some(path) => Some(path),
        None => ToolDetector::new().find_disassembler(),
    };

    if cli.json {
        let out = GuideOutput {
            config_file,
            key: config.disassembler.key,
            suggested,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let found = suggested.is_some();
    print_guidance(&OperatorGuidance {
        config_file,
        key: config.disassembler.key,
        applied: None,
        suggested,
    });
    if !found {
        println!("   addr2line was not found on this host; install binutils first.");
    }
    println!(
        "   Or let the bootstrapper write it: {}",
        "fiber-bootstrap --resume --disassembler /path/to/addr2line".cyan()
    );
    Ok(())
}

/// Final banner about the disassembler setting
pub fn print_guidance(guidance: &OperatorGuidance) {
    println!();
    match &guidance.applied {
        Some(path) => {
            println!(
                "✅ {} set to {} in {}",
                guidance.key.bold(),
                path.display(),
                guidance.config_file.display()
            );
        }
        None => {
            println!(
                "{}",
                "⚠️  One manual step remains before fiber is usable:".yellow().bold()
            );
            println!("   Edit {}", guidance.config_file.display());
            println!("   and set the absolute path of addr2line:");
            println!(
                "       {} = '{}'",
                guidance.key,
                "/absolute/path/to/addr2line".dimmed()
            );
            if let Some(ref path) = guidance.suggested {
                println!(
                    "   Suggested value on this host: {}",
                    path.display().to_string().green()
                );
            }
        }
    }
}
