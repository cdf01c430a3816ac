use crate::config::{Config, RerunPolicy, SyncPolicy};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "fiber-bootstrap")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Fetch fiber at a pinned revision and provision its angr environment")]
#[command(long_about = "Clones the fiber binary-analysis tool, pins it to a fixed revision, runs its environment setup and package installation scripts, and writes the addr2line location into its configuration. Run without arguments to perform the whole procedure.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory the checkout is created in (defaults to the current directory)
    #[arg(short = 'C', long, global = true, value_name = "DIR")]
    pub workdir: Option<PathBuf>,

    /// Revision to pin, overriding the configuration file
    #[arg(long, global = true, env = "FIBER_REVISION", value_name = "REV")]
    pub revision: Option<String>,

    /// How to treat the remote's default branch after cloning
    #[arg(long = "sync", global = true, value_enum, value_name = "POLICY")]
    pub sync_policy: Option<SyncPolicy>,

    /// Continue in an existing checkout, skipping stages a previous run completed
    #[arg(long, global = true)]
    pub resume: bool,

    /// Absolute path of the addr2line binary to configure
    #[arg(long, global = true, env = "FIBER_DISASSEMBLER", value_name = "PATH")]
    pub disassembler: Option<PathBuf>,

    /// Enable verbose logging (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Run the full bootstrap procedure (default)
    Run,

    /// Show the progress recorded in an existing checkout and host tool availability
    Status,

    /// Print the manual disassembler configuration instructions
    Guide,
}

impl Cli {
    /// Initialize logging based on verbosity level
    pub fn init_logging(&self) {
        if self.quiet {
            return;
        }

        let level = match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };

        env_logger::Builder::from_default_env()
            .filter_level(level)
            .init();
    }

    /// Command to execute; no subcommand means `run`
    pub fn command(&self) -> Commands {
        self.command.unwrap_or(Commands::Run)
    }

    /// Working directory the checkout lives in
    pub fn workdir(&self) -> std::io::Result<PathBuf> {
        match &self.workdir {
            Some(dir) => Ok(dir.clone()),
            None => std::env::current_dir(),
        }
    }

    /// Layer command-line and environment overrides onto a loaded config
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(revision) = &self.revision {
            config.source.revision = Some(revision.clone());
        }
        if let Some(policy) = self.sync_policy {
            config.source.sync_policy = policy;
        }
        if self.resume {
            config.source.rerun_policy = RerunPolicy::Resume;
        }
        if let Some(path) = &self.disassembler {
            config.disassembler.path = Some(path.clone());
        }
    }
}
