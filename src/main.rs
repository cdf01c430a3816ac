use clap::Parser;
use colored::Colorize;
use fiber_bootstrap::cli::Cli;
use std::process;

fn main() {
    let cli = Cli::parse();
    cli.init_logging();

    if let Err(e) = fiber_bootstrap::run_command(&cli) {
        eprintln!("{} {}", "Error:".red().bold(), e);
        if e.is_step_failure() {
            eprintln!("  stage failed with {}", e.kind());
        }
        process::exit(e.exit_code());
    }
}
