//! Sandboxed-app installer interface.
//!
//! Mirrors the package backend contract for flatpak: ensure the remote,
//! install per app ID with a per-id outcome, and run a best-effort update
//! afterwards.

use super::run_with_timeout;
use std::process::Command;
use std::time::Duration;

/// Narrow contract over the sandboxed-app installer.
pub trait AppInstaller {
    /// Register a remote if it is not already configured. Idempotent.
    fn add_remote(&self, name: &str, url: &str) -> Result<(), String>;

    /// Install one application by ID.
    fn install(&self, app_id: &str) -> Result<(), String>;

    /// Update all installed applications. Best-effort.
    fn update(&self) -> Result<(), String>;
}

/// flatpak-backed implementation using the system installation.
pub struct FlatpakInstaller {
    timeout: Duration,
}

impl FlatpakInstaller {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl AppInstaller for FlatpakInstaller {
    fn add_remote(&self, name: &str, url: &str) -> Result<(), String> {
        log::info!("Ensuring flatpak remote {} ({})", name, url);
        let mut cmd = Command::new("flatpak");
        cmd.args(["remote-add", "--if-not-exists", name, url]);
        run_with_timeout(&mut cmd, self.timeout).map(|_| ())
    }

    fn install(&self, app_id: &str) -> Result<(), String> {
        log::info!("Installing flatpak app: {}", app_id);
        let mut cmd = Command::new("flatpak");
        cmd.args(["install", "-y", "--noninteractive", app_id]);
        run_with_timeout(&mut cmd, self.timeout).map(|_| ())
    }

    fn update(&self) -> Result<(), String> {
        log::info!("Updating flatpak apps");
        let mut cmd = Command::new("flatpak");
        cmd.args(["update", "-y", "--noninteractive"]);
        run_with_timeout(&mut cmd, self.timeout).map(|_| ())
    }
}
