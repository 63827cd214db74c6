//! External collaborator interfaces.
//!
//! Everything the executor touches outside the process lives behind a
//! narrow trait in one of these submodules: the system package manager,
//! the sandboxed-app installer, the desktop-shell configuration store and
//! extension loader, the remote extension metadata service, the boot-loader
//! installer and the firmware update service. The traits carry only the
//! operations the core consumes; tests substitute in-memory fakes.
//!
//! This module itself provides the shared subprocess runner. Every external
//! command gets a bounded timeout supplied by the executor — nothing in a
//! run may block indefinitely, and a timed-out command is an ordinary
//! per-item failure.

pub mod bootloader;
pub mod firmware;
pub mod flatpak;
pub mod gsettings;
pub mod package;
pub mod service;
pub mod shell_ext;

use std::io::Read;
use std::process::{Command, Stdio};
use std::time::Duration;
use wait_timeout::ChildExt;

/// Run a prepared command to completion with a timeout.
///
/// Returns `Ok(stdout)` when the command exits successfully, `Err(message)`
/// on spawn failure, non-zero exit (message carries stderr) or timeout
/// (the child is killed and reaped).
pub fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> Result<String, String> {
    let program = cmd.get_program().to_string_lossy().to_string();
    log::debug!("Running: {:?}", cmd);

    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| format!("failed to spawn {}: {}", program, e))?;

    let status = match child.wait_timeout(timeout) {
        Ok(Some(status)) => status,
        Ok(None) => {
            // Timed out: kill and reap so no zombie survives the run
            let _ = child.kill();
            let _ = child.wait();
            return Err(format!("{} timed out after {:?}", program, timeout));
        }
        Err(e) => return Err(format!("failed to wait for {}: {}", program, e)),
    };

    let mut stdout = String::new();
    let mut stderr = String::new();
    if let Some(mut out) = child.stdout.take() {
        let _ = out.read_to_string(&mut stdout);
    }
    if let Some(mut err) = child.stderr.take() {
        let _ = err.read_to_string(&mut stderr);
    }

    if status.success() {
        Ok(stdout)
    } else {
        let detail = if stderr.trim().is_empty() {
            stdout.trim().to_string()
        } else {
            stderr.trim().to_string()
        };
        Err(format!(
            "{} exited with {}: {}",
            program,
            status.code().map_or("signal".to_string(), |c| c.to_string()),
            detail
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_successful_command_returns_stdout() {
        let mut cmd = Command::new("echo");
        cmd.arg("hello");
        let out = run_with_timeout(&mut cmd, Duration::from_secs(5)).unwrap();
        assert_eq!(out.trim(), "hello");
    }

    #[test]
    fn test_failing_command_reports_stderr() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo boom >&2; exit 3"]);
        let err = run_with_timeout(&mut cmd, Duration::from_secs(5)).unwrap_err();
        assert!(err.contains("boom"), "got: {}", err);
        assert!(err.contains('3'), "got: {}", err);
    }

    #[test]
    fn test_missing_program_is_spawn_failure() {
        let mut cmd = Command::new("deskforge-no-such-binary");
        let err = run_with_timeout(&mut cmd, Duration::from_secs(1)).unwrap_err();
        assert!(err.contains("failed to spawn"), "got: {}", err);
    }

    #[test]
    fn test_timeout_kills_child() {
        let mut cmd = Command::new("sleep");
        cmd.arg("30");
        let err = run_with_timeout(&mut cmd, Duration::from_millis(100)).unwrap_err();
        assert!(err.contains("timed out"), "got: {}", err);
    }
}
