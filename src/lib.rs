//! # fiber-bootstrap
//!
//! Prepares the fiber binary-analysis tool for use: clones it, pins it to a
//! fixed revision, runs its angr environment setup and package installation
//! scripts, and writes the `addr2line` location into its configuration.
//!
//! ## Example
//!
//! ```rust,no_run
//! use fiber_bootstrap::bootstrap::{BootstrapPlan, BootstrapReport, Bootstrapper};
//! use fiber_bootstrap::config;
//! use std::path::Path;
//!
//! # fn main() -> fiber_bootstrap::Result<()> {
//! let workdir = Path::new(".");
//! let config = config::load_config(None, workdir)?;
//! let plan = BootstrapPlan::from_config(&config, workdir)?;
//!
//! let bootstrapper = Bootstrapper::new(plan);
//! let mut report = BootstrapReport::new(bootstrapper.plan());
//! bootstrapper.run(&mut report)?;
//! println!("finished at {}", report.stage);
//! # Ok(())
//! # }
//! ```

pub mod bootstrap;
pub mod cli;
pub mod common;
pub mod config;
pub mod error;
pub mod handlers;
pub mod tool_detector;

pub use bootstrap::{BootstrapPlan, BootstrapReport, Bootstrapper, Stage};
pub use error::{BootstrapError, ErrorKind, Result};
use cli::{Cli, Commands};

/// The current version of the CLI tool
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn run_command(cli: &Cli) -> Result<()> {
    match cli.command() {
        Commands::Run => handlers::handle_run(cli),
        Commands::Status => handlers::handle_status(cli),
        Commands::Guide => handlers::handle_guide(cli),
    }
}
