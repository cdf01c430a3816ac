use log::debug;
use std::io;
use std::path::Path;
use std::process::{Command, ExitStatus, Output, Stdio};

/// Execute a command and capture its output
pub fn execute_command(cmd: &str, args: &[&str], cwd: Option<&Path>) -> io::Result<Output> {
    debug!("Executing: {} {}", cmd, args.join(" "));
    let mut command = Command::new(cmd);
    command.args(args);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }
    command.output()
}

/// Execute a command so the operator sees its output as it runs.
///
/// The child's stdout goes to our stderr, keeping our stdout for the report.
pub fn execute_streaming(cmd: &str, args: &[&str], cwd: Option<&Path>) -> io::Result<ExitStatus> {
    debug!("Executing (streaming): {} {}", cmd, args.join(" "));
    let mut command = Command::new(cmd);
    command
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::from(io::stderr()))
        .stderr(Stdio::inherit());
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }
    command.status()
}

/// Check if a command is available in PATH
pub fn is_command_available(cmd: &str) -> bool {
    Command::new(cmd)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok()
}

/// Trimmed stderr of a finished command, falling back to stdout
pub fn failure_message(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let text = if stderr.trim().is_empty() {
        String::from_utf8_lossy(&output.stdout)
    } else {
        stderr
    };
    let text = text.trim();
    if text.is_empty() {
        format!("exited with {}", output.status)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_execute_command_captures_failure() {
        let output = execute_command("sh", &["-c", "echo boom >&2; exit 3"], None).unwrap();
        assert_eq!(output.status.code(), Some(3));
        assert_eq!(failure_message(&output), "boom");
    }

    #[cfg(unix)]
    #[test]
    fn test_execute_command_honours_cwd() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let output = execute_command("pwd", &[], Some(temp_dir.path())).unwrap();
        let printed = String::from_utf8_lossy(&output.stdout);
        let expected = temp_dir.path().canonicalize().unwrap();
        assert_eq!(Path::new(printed.trim()).canonicalize().unwrap(), expected);
    }

    #[test]
    fn test_missing_command_is_unavailable() {
        assert!(!is_command_available("definitely-not-a-real-binary-9f3c"));
    }
}
