use crate::{
    bootstrap::{BootstrapPlan, BootstrapReport, Bootstrapper, StageOutcome},
    cli::Cli,
    config::{self, Config},
    tool_detector::ToolDetector,
};
use colored::Colorize;
use log::info;
use std::path::Path;

use super::guide::print_guidance;

pub fn handle_run(cli: &Cli) -> crate::Result<()> {
    let workdir = cli.workdir()?;
    let config = resolve_config(cli, &workdir)?;
    let plan = BootstrapPlan::from_config(&config, &workdir)?;

    let bootstrapper = Bootstrapper::new(plan).quiet(cli.quiet);
    let mut report = BootstrapReport::new(bootstrapper.plan());
    let result = bootstrapper.run(&mut report);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if result.is_ok() && !cli.quiet {
        print_report(&report);
    }

    result
}

/// Load configuration and fill in everything the command line can override.
///
/// A missing disassembler path is looked up on the host when detection is on.
/// Such a path is only a suggestion: if the checkout has nowhere to put it the
/// run still succeeds and ends with the manual guidance.
pub fn resolve_config(cli: &Cli, workdir: &Path) -> crate::Result<Config> {
    let mut config = config::load_config(cli.config.as_deref(), workdir)?;
    cli.apply_overrides(&mut config);

    if config.disassembler.path.is_none() && config.disassembler.detect {
        let mut detector = ToolDetector::new();
        if let Some(found) = detector.find_disassembler() {
            info!("Using detected disassembler {}", found.display());
            config.disassembler.path = Some(found);
            config.disassembler.detected = true;
        }
    }

    Ok(config)
}

fn print_report(report: &BootstrapReport) {
    println!("\n🚀 fiber bootstrap complete");
    println!("{}", "=".repeat(50));
    println!("Checkout: {}", report.checkout.display());
    if let Some(ref revision) = report.revision {
        println!("Pinned revision: {}", revision);
    }
    if let Some(ref head) = report.head {
        println!("HEAD: {}", head);
    }
    println!();

    for record in &report.stages {
        let mark = match record.outcome {
            StageOutcome::Ran => "✅".to_string(),
            StageOutcome::Skipped => "⏭️ ".to_string(),
        };
        print!("  {} {}", mark, record.stage.to_string().bold());
        if let Some(ref note) = record.note {
            print!(" ({})", note.dimmed());
        }
        println!();
    }

    if let Some(ref guidance) = report.guidance {
        print_guidance(guidance);
    }
}
