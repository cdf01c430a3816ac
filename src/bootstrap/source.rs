//! Source-control capability and its git CLI implementation

use crate::common::command_utils::{
    execute_command, execute_streaming, failure_message, is_command_available,
};
use log::{debug, warn};
use std::path::Path;
use thiserror::Error;

/// A failed source-control operation
#[derive(Debug, Error)]
#[error("{message}")]
pub struct CommandFailure {
    pub message: String,
    pub exit_code: Option<i32>,
}

impl CommandFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            exit_code: None,
        }
    }
}

type OpResult<T> = std::result::Result<T, CommandFailure>;

/// Operations the bootstrapper needs from a version-control system
pub trait SourceControl {
    /// Fails when the backing tool cannot be run on this host
    fn ensure_available(&self) -> OpResult<()> {
        Ok(())
    }

    fn clone_repo(&self, url: &str, dest: &Path) -> OpResult<()>;

    /// Check out `revision`; must fail when the revision is not in history
    fn checkout(&self, repo: &Path, revision: &str) -> OpResult<()>;

    /// Fetch and merge the remote's default branch into the working copy
    fn pull(&self, repo: &Path) -> OpResult<()>;

    fn is_work_tree(&self, repo: &Path) -> bool;

    fn head_revision(&self, repo: &Path) -> Option<String>;

    /// Full commit id a revision (hash, tag or branch) names in `repo`
    fn resolve_revision(&self, repo: &Path, revision: &str) -> Option<String>;
}

/// `SourceControl` backed by the `git` executable
pub struct GitCli {
    program: String,
}

impl GitCli {
    pub fn new() -> Self {
        Self::with_program("git")
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn git(&self, repo: &Path, args: &[&str]) -> OpResult<String> {
        let output = execute_command(&self.program, args, Some(repo))
            .map_err(|e| CommandFailure::new(format!("failed to run {}: {}", self.program, e)))?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            Err(CommandFailure {
                message: failure_message(&output),
                exit_code: output.status.code(),
            })
        }
    }

    fn git_streaming(&self, cwd: Option<&Path>, args: &[&str]) -> OpResult<()> {
        let status = execute_streaming(&self.program, args, cwd)
            .map_err(|e| CommandFailure::new(format!("failed to run {}: {}", self.program, e)))?;
        if status.success() {
            Ok(())
        } else {
            Err(CommandFailure {
                message: format!("{} {} exited with {}", self.program, args[0], status),
                exit_code: status.code(),
            })
        }
    }

    /// Name of the branch `origin/HEAD` points at
    fn default_branch(&self, repo: &Path) -> Option<String> {
        let full = self
            .git(repo, &["symbolic-ref", "--short", "refs/remotes/origin/HEAD"])
            .ok()?;
        full.strip_prefix("origin/").map(str::to_string)
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceControl for GitCli {
    fn ensure_available(&self) -> OpResult<()> {
        if is_command_available(&self.program) {
            Ok(())
        } else {
            Err(CommandFailure::new(format!(
                "{} is not installed or not in PATH",
                self.program
            )))
        }
    }

    fn clone_repo(&self, url: &str, dest: &Path) -> OpResult<()> {
        let dest = dest.to_string_lossy();
        self.git_streaming(None, &["clone", url, dest.as_ref()])
    }

    fn checkout(&self, repo: &Path, revision: &str) -> OpResult<()> {
        let commit = format!("{}^{{commit}}", revision);
        self.git(repo, &["rev-parse", "--verify", "--quiet", commit.as_str()])
            .map_err(|e| CommandFailure {
                message: format!("revision not found in cloned history ({})", e.message),
                exit_code: e.exit_code,
            })?;
        self.git(
            repo,
            &["-c", "advice.detachedHead=false", "checkout", "--quiet", revision],
        )?;
        Ok(())
    }

    fn pull(&self, repo: &Path) -> OpResult<()> {
        match self.default_branch(repo) {
            Some(branch) => {
                debug!("Pulling origin/{} into {}", branch, repo.display());
                self.git_streaming(
                    Some(repo),
                    &["pull", "--no-rebase", "--no-edit", "origin", branch.as_str()],
                )
            }
            None => {
                warn!("origin/HEAD is not set, pulling the current branch's upstream");
                self.git_streaming(Some(repo), &["pull", "--no-rebase", "--no-edit"])
            }
        }
    }

    fn is_work_tree(&self, repo: &Path) -> bool {
        repo.join(".git").exists()
            && self
                .git(repo, &["rev-parse", "--is-inside-work-tree"])
                .map(|out| out == "true")
                .unwrap_or(false)
    }

    fn head_revision(&self, repo: &Path) -> Option<String> {
        self.git(repo, &["rev-parse", "HEAD"]).ok()
    }

    fn resolve_revision(&self, repo: &Path, revision: &str) -> Option<String> {
        let commit = format!("{}^{{commit}}", revision);
        self.git(repo, &["rev-parse", "--verify", "--quiet", commit.as_str()])
            .ok()
            .filter(|id| !id.is_empty())
    }
}
