use crate::{
    bootstrap::{BootstrapState, GitCli, SourceControl, Stage},
    cli::Cli,
    config::{self, SyncPolicy},
    tool_detector::{ToolDetector, ToolStatus},
};
use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub checkout: PathBuf,
    pub exists: bool,
    pub work_tree: bool,
    pub pinned_revision: Option<String>,
    pub sync_policy: SyncPolicy,
    pub head: Option<String>,
    /// `None` when either side is unknown
    pub at_pinned_revision: Option<bool>,
    pub completed: Vec<Stage>,
    pub pending: Vec<Stage>,
    pub tools: BTreeMap<String, ToolStatus>,
}

pub fn handle_status(cli: &Cli) -> crate::Result<()> {
    let workdir = cli.workdir()?;
    let mut config = config::load_config(cli.config.as_deref(), &workdir)?;
    cli.apply_overrides(&mut config);

    let checkout = workdir.join(&config.source.checkout_dir);
    let git = GitCli::new();
    let exists = checkout.exists();
    let work_tree = exists && git.is_work_tree(&checkout);
    let head = if work_tree {
        git.head_revision(&checkout)
    } else {
        None
    };
    let pinned_revision = config.source.revision.clone();
    let at_pinned_revision = pin_matches_head(
        &git,
        &checkout,
        config.source.sync_policy,
        head.as_deref(),
        pinned_revision.as_deref(),
    );

    let completed = BootstrapState::load(&checkout)
        .map(|s| s.completed)
        .unwrap_or_default();
    let pending = Stage::SEQUENCE
        .iter()
        .copied()
        .filter(|s| !completed.contains(s))
        .collect();

    let mut detector = ToolDetector::new();
    let tools = detector
        .detect_required_tools(&config.provision.shell)
        .into_iter()
        .collect();

    let report = StatusReport {
        checkout,
        exists,
        work_tree,
        pinned_revision,
        sync_policy: config.source.sync_policy,
        head,
        at_pinned_revision,
        completed,
        pending,
        tools,
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_status(&report);
    }
    Ok(())
}

/// Compare HEAD with the commit the pin resolves to.
///
/// `None` when the policy ignores the pin or either side cannot be resolved.
fn pin_matches_head(
    source: &dyn SourceControl,
    checkout: &Path,
    policy: SyncPolicy,
    head: Option<&str>,
    pin: Option<&str>,
) -> Option<bool> {
    if policy == SyncPolicy::Latest {
        return None;
    }
    let head = head?;
    let pinned = source.resolve_revision(checkout, pin?)?;
    Some(pinned == head)
}

fn print_status(report: &StatusReport) {
    println!("\n📦 fiber checkout status");
    println!("{}", "=".repeat(50));
    println!("Checkout: {}", report.checkout.display());

    if !report.exists {
        println!("  ❌ not cloned yet");
    } else if !report.work_tree {
        println!("  ❌ exists but is not a git work tree");
    } else {
        match (&report.head, report.at_pinned_revision) {
            (Some(head), Some(true)) => println!("  ✅ HEAD {} (pinned)", head),
            (Some(head), Some(false)) => println!(
                "  ⚠️  HEAD {} differs from pinned {}",
                head,
                report.pinned_revision.as_deref().unwrap_or("-")
            ),
            (Some(head), None) => println!("  HEAD {}", head),
            (None, _) => println!("  ⚠️  HEAD could not be resolved"),
        }
    }
    println!("Sync policy: {:?}", report.sync_policy);

    println!("\nStages:");
    for stage in &report.completed {
        println!("  ✅ {}", stage);
    }
    for stage in &report.pending {
        println!("  ⏳ {}", stage.to_string().dimmed());
    }

    println!("\n🔧 Host tools:");
    for (name, status) in &report.tools {
        let icon = if status.available { "✅" } else { "❌" };
        print!("  {} {}", icon, name);
        if let Some(ref version) = status.version {
            print!(" (v{})", version);
        }
        if let Some(ref path) = status.path {
            print!(" at {}", path.display());
        }
        if !status.available {
            print!(" - missing");
        }
        println!();
    }
    println!();
}
