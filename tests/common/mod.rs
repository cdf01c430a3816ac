#![allow(dead_code)]

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use tempfile::TempDir;

pub const ENV_MARKER: &str = "env.marker";
pub const PKGS_MARKER: &str = "pkgs.marker";

/// An isolated HOME, a working directory and a local "fiber" remote
pub struct TestEnv {
    _tmp: TempDir,
    pub home: PathBuf,
    pub workdir: PathBuf,
    pub remote: PathBuf,
    pub tool: PathBuf,
}

pub struct RemoteScripts<'a> {
    pub env: &'a str,
    pub pkgs: &'a str,
}

impl Default for RemoteScripts<'_> {
    fn default() -> Self {
        Self {
            env: "touch env.marker\n",
            pkgs: "touch pkgs.marker\n",
        }
    }
}

pub fn git_available() -> bool {
    process::Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

impl TestEnv {
    pub fn new() -> Self {
        Self::with_scripts(RemoteScripts::default())
    }

    pub fn with_scripts(scripts: RemoteScripts<'_>) -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        let home = tmp.path().join("home");
        let workdir = tmp.path().join("work");
        fs::create_dir_all(&home).expect("create isolated home");
        fs::create_dir_all(&workdir).expect("create workdir");

        let remote = make_fixture_remote(tmp.path(), &scripts);

        let tool = tmp.path().join("bin").join("addr2line");
        fs::create_dir_all(tool.parent().expect("tool dir")).expect("create bin dir");
        fs::write(&tool, "#!/bin/sh\n").expect("write fake addr2line");

        Self {
            _tmp: tmp,
            home,
            workdir,
            remote,
            tool,
        }
    }

    /// Current revision of the fixture remote
    pub fn head(&self) -> String {
        git(&self.remote, &["rev-parse", "HEAD"])
    }

    /// Run git in the fixture remote, returning trimmed stdout
    pub fn remote_git(&self, args: &[&str]) -> String {
        git(&self.remote, args)
    }

    /// Add a commit on the remote's default branch that creates `name`
    pub fn commit_to_remote(&self, name: &str, content: &str) -> String {
        fs::write(self.remote.join(name), content).expect("write remote file");
        git(&self.remote, &["add", name]);
        git(&self.remote, &["commit", "--quiet", "-m", name]);
        self.head()
    }

    pub fn checkout(&self) -> PathBuf {
        self.workdir.join("fiber")
    }

    /// Write `.fiber-bootstrap.toml` into the working directory
    pub fn write_config(&self, revision: Option<&str>, extra: &str) {
        self.write_config_body(revision, false, extra);
    }

    /// Like `write_config`, but addr2line is looked up on the host
    pub fn write_detecting_config(&self, revision: Option<&str>) {
        self.write_config_body(revision, true, "");
    }

    fn write_config_body(&self, revision: Option<&str>, detect: bool, extra: &str) {
        let mut body = format!("[source]\nrepository = {:?}\n", self.remote.display().to_string());
        if let Some(rev) = revision {
            body.push_str(&format!("revision = {:?}\n", rev));
        }
        body.push_str(&format!(
            "\n[provision]\nshell = \"sh\"\n\n[disassembler]\ndetect = {}\n",
            detect
        ));
        body.push_str(extra);
        fs::write(self.workdir.join(".fiber-bootstrap.toml"), body).expect("write config");
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("fiber-bootstrap");
        cmd.env("HOME", &self.home)
            .env_remove("FIBER_REVISION")
            .env_remove("FIBER_DISASSEMBLER")
            .env_remove("RUST_LOG")
            .current_dir(&self.workdir);
        cmd
    }

    /// `cmd` with the fake addr2line first on PATH
    pub fn cmd_with_tool_on_path(&self) -> Command {
        let bin = self.tool.parent().expect("tool dir").to_path_buf();
        let mut paths = vec![bin];
        if let Some(existing) = env::var_os("PATH") {
            paths.extend(env::split_paths(&existing));
        }
        let mut cmd = self.cmd();
        cmd.env("PATH", env::join_paths(paths).expect("join PATH"));
        cmd
    }
}

fn git(dir: &Path, args: &[&str]) -> String {
    let output = process::Command::new("git")
        .args(["-c", "user.name=Fixture", "-c", "user.email=fixture@example.com"])
        .args(["-c", "init.defaultBranch=main", "-c", "commit.gpgsign=false"])
        .args(args)
        .current_dir(dir)
        .output()
        .expect("run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn make_fixture_remote(base: &Path, scripts: &RemoteScripts<'_>) -> PathBuf {
    let remote = base.join("remote");
    fs::create_dir_all(&remote).expect("create remote");

    fs::write(remote.join("setup_angr_env.sh"), scripts.env).expect("write env script");
    fs::write(remote.join("install_pkgs.sh"), scripts.pkgs).expect("write pkgs script");
    fs::write(
        remote.join("sym_tracer.py"),
        "import subprocess\n\nADDR2LINE = '/path/to/addr2line'\n",
    )
    .expect("write tool config");

    if git_available() {
        git(&remote, &["init", "--quiet"]);
        git(&remote, &["add", "."]);
        git(&remote, &["commit", "--quiet", "-m", "fixture"]);
    }

    remote
}
