//! # Bootstrap Module
//!
//! Acquires the fiber project at a pinned revision, runs its two setup
//! procedures and points it at an `addr2line` binary.
//!
//! The procedure is strictly linear:
//!
//! ```text
//! START → CLONED → PINNED → SYNCED → ENV_READY → PKGS_READY → CONFIGURED → DONE
//! ```
//!
//! Any failing step moves to a terminal `FAILED` stage carrying the step's
//! error kind. Nothing is retried and nothing is rolled back.

pub mod disassembler;
pub mod provisioner;
pub mod source;
pub mod state;

pub use provisioner::{EnvironmentProvisioner, ScriptProvisioner};
pub use source::{CommandFailure, GitCli, SourceControl};
pub use state::BootstrapState;

use crate::config::{Config, RerunPolicy, SyncPolicy};
use crate::error::{BootstrapError, ConfigError, ConfigureError, ErrorKind, Result};
use colored::Colorize;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Position of the procedure in its state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Start,
    Cloned,
    Pinned,
    Synced,
    EnvReady,
    PkgsReady,
    Configured,
    Done,
    Failed(ErrorKind),
}

impl Stage {
    /// Non-terminal stages in execution order
    pub const SEQUENCE: [Stage; 6] = [
        Stage::Cloned,
        Stage::Pinned,
        Stage::Synced,
        Stage::EnvReady,
        Stage::PkgsReady,
        Stage::Configured,
    ];
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Start => f.write_str("START"),
            Stage::Cloned => f.write_str("CLONED"),
            Stage::Pinned => f.write_str("PINNED"),
            Stage::Synced => f.write_str("SYNCED"),
            Stage::EnvReady => f.write_str("ENV_READY"),
            Stage::PkgsReady => f.write_str("PKGS_READY"),
            Stage::Configured => f.write_str("CONFIGURED"),
            Stage::Done => f.write_str("DONE"),
            Stage::Failed(kind) => write!(f, "FAILED({})", kind),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOutcome {
    Ran,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageRecord {
    pub stage: Stage,
    pub outcome: StageOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// What the operator still has to know about the disassembler setting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperatorGuidance {
    pub config_file: PathBuf,
    pub key: String,
    /// Set when the bootstrapper wrote the value itself
    pub applied: Option<PathBuf>,
    /// A host binary that could be used when nothing was applied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested: Option<PathBuf>,
}

/// Everything that happened during one run
#[derive(Debug, Clone, Serialize)]
pub struct BootstrapReport {
    pub checkout: PathBuf,
    pub revision: Option<String>,
    pub sync_policy: SyncPolicy,
    pub stage: Stage,
    pub stages: Vec<StageRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guidance: Option<OperatorGuidance>,
}

impl BootstrapReport {
    pub fn new(plan: &BootstrapPlan) -> Self {
        Self {
            checkout: plan.checkout.clone(),
            revision: plan.revision.clone(),
            sync_policy: plan.sync_policy,
            stage: Stage::Start,
            stages: Vec::new(),
            head: None,
            error: None,
            guidance: None,
        }
    }

    fn record(&mut self, stage: Stage, outcome: StageOutcome, note: Option<String>) {
        debug!("{} -> {} ({:?})", self.stage, stage, outcome);
        self.stage = stage;
        self.stages.push(StageRecord {
            stage,
            outcome,
            note,
        });
    }

    fn fail(&mut self, err: &BootstrapError) {
        self.stage = Stage::Failed(err.kind());
        self.error = Some(err.to_string());
    }

    /// Stages that actually executed, in order
    pub fn executed(&self) -> Vec<Stage> {
        self.stages
            .iter()
            .filter(|r| r.outcome == StageOutcome::Ran)
            .map(|r| r.stage)
            .collect()
    }

    pub fn succeeded(&self) -> bool {
        self.stage == Stage::Done
    }
}

/// Fully resolved inputs for one run
#[derive(Debug, Clone)]
pub struct BootstrapPlan {
    pub repository: String,
    pub revision: Option<String>,
    pub checkout: PathBuf,
    pub sync_policy: SyncPolicy,
    pub rerun_policy: RerunPolicy,
    pub shell: String,
    pub environment_script: String,
    pub packages_script: String,
    pub disassembler: Option<PathBuf>,
    /// The disassembler path came from host detection
    pub disassembler_detected: bool,
    pub disassembler_config: PathBuf,
    pub disassembler_key: String,
}

impl BootstrapPlan {
    /// Resolve a plan against `workdir`.
    ///
    /// A revision is mandatory unless the sync policy ignores it.
    pub fn from_config(config: &Config, workdir: &Path) -> Result<Self> {
        let source = &config.source;
        let revision = source
            .revision
            .as_ref()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());

        if revision.is_none() && source.sync_policy != SyncPolicy::Latest {
            return Err(ConfigError::MissingRevision.into());
        }
        if source.checkout_dir.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "source.checkout_dir".to_string(),
                reason: "must not be empty".to_string(),
            }
            .into());
        }
        if config.disassembler.config_file.is_absolute() {
            return Err(ConfigError::InvalidValue {
                field: "disassembler.config_file".to_string(),
                reason: "must be relative to the checkout".to_string(),
            }
            .into());
        }

        Ok(Self {
            repository: source.repository.clone(),
            revision,
            checkout: workdir.join(&source.checkout_dir),
            sync_policy: source.sync_policy,
            rerun_policy: source.rerun_policy,
            shell: config.provision.shell.clone(),
            environment_script: config.provision.environment_script.clone(),
            packages_script: config.provision.packages_script.clone(),
            disassembler: config.disassembler.path.clone(),
            disassembler_detected: config.disassembler.detected,
            disassembler_config: config.disassembler.config_file.clone(),
            disassembler_key: config.disassembler.key.clone(),
        })
    }

    /// Identifies what a previous run was aiming at, for resume
    pub fn target_label(&self) -> String {
        match (self.sync_policy, &self.revision) {
            (SyncPolicy::Latest, _) | (_, None) => "latest".to_string(),
            (SyncPolicy::PinThenSync, Some(rev)) => format!("{}+sync", rev),
            (SyncPolicy::Pinned, Some(rev)) => rev.clone(),
        }
    }

    pub fn disassembler_config_path(&self) -> PathBuf {
        self.checkout.join(&self.disassembler_config)
    }
}

/// Drives the bootstrap state machine over substitutable collaborators
pub struct Bootstrapper {
    plan: BootstrapPlan,
    source: Box<dyn SourceControl>,
    environment: Box<dyn EnvironmentProvisioner>,
    packages: Box<dyn EnvironmentProvisioner>,
    banners: bool,
}

impl Bootstrapper {
    /// Wire the plan to git and the checkout's own setup scripts
    pub fn new(plan: BootstrapPlan) -> Self {
        let environment = ScriptProvisioner::new(
            plan.shell.clone(),
            plan.environment_script.clone(),
            plan.checkout.clone(),
        );
        let packages = ScriptProvisioner::new(
            plan.shell.clone(),
            plan.packages_script.clone(),
            plan.checkout.clone(),
        );
        Self::with_collaborators(
            plan,
            Box::new(GitCli::new()),
            Box::new(environment),
            Box::new(packages),
        )
    }

    pub fn with_collaborators(
        plan: BootstrapPlan,
        source: Box<dyn SourceControl>,
        environment: Box<dyn EnvironmentProvisioner>,
        packages: Box<dyn EnvironmentProvisioner>,
    ) -> Self {
        Self {
            plan,
            source,
            environment,
            packages,
            banners: true,
        }
    }

    /// Disable the informational banners printed before the setup steps
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.banners = !quiet;
        self
    }

    pub fn plan(&self) -> &BootstrapPlan {
        &self.plan
    }

    /// Run the procedure, recording progress in `report`.
    ///
    /// On failure the report's stage is `Failed` and the error is returned.
    pub fn run(&self, report: &mut BootstrapReport) -> Result<()> {
        let result = self.run_stages(report);
        match &result {
            Ok(()) => {
                report.head = self.source.head_revision(&self.plan.checkout);
                report.record(Stage::Done, StageOutcome::Ran, None);
            }
            Err(e) => report.fail(e),
        }
        result
    }

    fn run_stages(&self, report: &mut BootstrapReport) -> Result<()> {
        let plan = &self.plan;

        self.source
            .ensure_available()
            .map_err(acquisition_error)?;

        let mut state = self.acquire(report)?;
        state.mark(Stage::Cloned);
        state.save(&plan.checkout)?;

        self.pin(report, &mut state)?;
        self.sync(report, &mut state)?;

        if state.is_complete(Stage::EnvReady) {
            report.record(Stage::EnvReady, StageOutcome::Skipped, resumed_note());
        } else {
            self.banner(&format!(
                "Setting up the angr analysis environment ({})",
                self.environment.name()
            ));
            self.environment
                .setup()
                .map_err(BootstrapError::EnvironmentSetup)?;
            report.record(Stage::EnvReady, StageOutcome::Ran, None);
            state.mark(Stage::EnvReady);
            state.save(&plan.checkout)?;
        }

        if state.is_complete(Stage::PkgsReady) {
            report.record(Stage::PkgsReady, StageOutcome::Skipped, resumed_note());
        } else {
            self.banner(&format!(
                "Installing supporting packages ({})",
                self.packages.name()
            ));
            self.packages
                .setup()
                .map_err(BootstrapError::PackageInstall)?;
            report.record(Stage::PkgsReady, StageOutcome::Ran, None);
            state.mark(Stage::PkgsReady);
            state.save(&plan.checkout)?;
        }

        self.configure(report, &mut state)
    }

    fn acquire(&self, report: &mut BootstrapReport) -> Result<BootstrapState> {
        let plan = &self.plan;
        let target = plan.target_label();

        if plan.checkout.exists() {
            if plan.rerun_policy == RerunPolicy::Fail {
                return Err(BootstrapError::Acquisition {
                    message: format!(
                        "{} already exists (pass --resume to continue a previous run)",
                        plan.checkout.display()
                    ),
                    exit_code: None,
                });
            }
            if !self.source.is_work_tree(&plan.checkout) {
                return Err(BootstrapError::Acquisition {
                    message: format!(
                        "{} exists but is not a git work tree",
                        plan.checkout.display()
                    ),
                    exit_code: None,
                });
            }

            info!("Resuming in existing checkout {}", plan.checkout.display());
            report.record(
                Stage::Cloned,
                StageOutcome::Skipped,
                Some("existing checkout".to_string()),
            );
            return Ok(match BootstrapState::load(&plan.checkout) {
                Some(state) if state.target == target => state,
                Some(state) => {
                    info!(
                        "Previous run targeted {}, now {}: re-running all stages",
                        state.target, target
                    );
                    BootstrapState::new(target)
                }
                None => BootstrapState::new(target),
            });
        }

        info!("Cloning {} into {}", plan.repository, plan.checkout.display());
        self.source
            .clone_repo(&plan.repository, &plan.checkout)
            .map_err(acquisition_error)?;
        report.record(Stage::Cloned, StageOutcome::Ran, None);
        Ok(BootstrapState::new(target))
    }

    fn pin(&self, report: &mut BootstrapReport, state: &mut BootstrapState) -> Result<()> {
        let plan = &self.plan;
        let revision = match (&plan.revision, plan.sync_policy) {
            (Some(rev), SyncPolicy::Pinned | SyncPolicy::PinThenSync) => rev,
            _ => {
                report.record(
                    Stage::Pinned,
                    StageOutcome::Skipped,
                    Some("sync policy follows the default branch".to_string()),
                );
                return Ok(());
            }
        };

        if state.is_complete(Stage::Pinned) {
            report.record(Stage::Pinned, StageOutcome::Skipped, resumed_note());
            return Ok(());
        }

        info!("Checking out {}", revision);
        self.source
            .checkout(&plan.checkout, revision)
            .map_err(|f| BootstrapError::Revision {
                revision: revision.clone(),
                message: f.message,
                exit_code: f.exit_code,
            })?;
        report.record(Stage::Pinned, StageOutcome::Ran, None);
        state.mark(Stage::Pinned);
        state.save(&plan.checkout)
    }

    fn sync(&self, report: &mut BootstrapReport, state: &mut BootstrapState) -> Result<()> {
        let plan = &self.plan;
        match plan.sync_policy {
            SyncPolicy::Pinned => {
                report.record(
                    Stage::Synced,
                    StageOutcome::Skipped,
                    Some("pinned revision is kept".to_string()),
                );
                return Ok(());
            }
            SyncPolicy::PinThenSync => {
                warn!("Pulling after checkout may move the working copy past the pinned revision");
            }
            SyncPolicy::Latest => {}
        }

        if state.is_complete(Stage::Synced) {
            report.record(Stage::Synced, StageOutcome::Skipped, resumed_note());
            return Ok(());
        }

        self.source
            .pull(&plan.checkout)
            .map_err(|f| BootstrapError::Sync {
                message: f.message,
                exit_code: f.exit_code,
            })?;
        report.record(Stage::Synced, StageOutcome::Ran, None);
        state.mark(Stage::Synced);
        state.save(&plan.checkout)
    }

    fn configure(&self, report: &mut BootstrapReport, state: &mut BootstrapState) -> Result<()> {
        let plan = &self.plan;
        let config_file = plan.disassembler_config_path();

        let Some(tool) = &plan.disassembler else {
            report.record(
                Stage::Configured,
                StageOutcome::Skipped,
                Some("no disassembler path available".to_string()),
            );
            report.guidance = Some(OperatorGuidance {
                config_file,
                key: plan.disassembler_key.clone(),
                applied: None,
                suggested: None,
            });
            return Ok(());
        };

        match disassembler::apply_disassembler_path(&config_file, &plan.disassembler_key, tool) {
            Ok(_) => {}
            // A detected tool is a guess; only a configured one must land
            Err(
                e @ (ConfigureError::MissingConfigFile(_) | ConfigureError::MissingSetting { .. }),
            ) if plan.disassembler_detected => {
                warn!("Detected {} but left it unapplied: {}", tool.display(), e);
                report.record(
                    Stage::Configured,
                    StageOutcome::Skipped,
                    Some(format!("detected disassembler not applied: {}", e)),
                );
                report.guidance = Some(OperatorGuidance {
                    config_file,
                    key: plan.disassembler_key.clone(),
                    applied: None,
                    suggested: Some(tool.clone()),
                });
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }

        report.record(Stage::Configured, StageOutcome::Ran, None);
        report.guidance = Some(OperatorGuidance {
            config_file,
            key: plan.disassembler_key.clone(),
            applied: Some(tool.clone()),
            suggested: None,
        });
        state.mark(Stage::Configured);
        state.save(&plan.checkout)
    }

    fn banner(&self, message: &str) {
        info!("{}", message);
        if self.banners {
            eprintln!("{} {}", "==>".cyan().bold(), message.bold());
        }
    }
}

fn acquisition_error(f: CommandFailure) -> BootstrapError {
    BootstrapError::Acquisition {
        message: f.message,
        exit_code: f.exit_code,
    }
}

fn resumed_note() -> Option<String> {
    Some("completed by a previous run".to_string())
}
