//! System package manager interface.
//!
//! The core consumes only this contract: install by name with a per-name
//! outcome, plus a best-effort autoremove. Specific package names are
//! configuration data from the stack registry, not part of the logic here.

use super::run_with_timeout;
use std::process::Command;
use std::time::Duration;

/// Narrow contract over the system package manager.
pub trait PackageBackend {
    /// Install one package. `Err` carries a human-readable reason.
    fn install(&self, name: &str) -> Result<(), String>;

    /// Remove packages nothing depends on anymore. Best-effort.
    fn remove_unused(&self) -> Result<(), String>;
}

/// apt-backed implementation driving `apt-get` non-interactively.
///
/// Packages are installed one at a time so every name gets a genuine
/// per-name outcome in the run report; a broken candidate never sinks the
/// rest of the batch.
pub struct AptBackend {
    timeout: Duration,
}

impl AptBackend {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn apt_get(&self) -> Command {
        let mut cmd = Command::new("apt-get");
        cmd.env("DEBIAN_FRONTEND", "noninteractive");
        cmd
    }

    /// Refresh the package index once before the install phase.
    pub fn update_index(&self) -> Result<(), String> {
        let mut cmd = self.apt_get();
        cmd.arg("update");
        run_with_timeout(&mut cmd, self.timeout).map(|_| ())
    }
}

impl PackageBackend for AptBackend {
    fn install(&self, name: &str) -> Result<(), String> {
        log::info!("Installing package: {}", name);
        let mut cmd = self.apt_get();
        cmd.args(["install", "-y", name]);
        run_with_timeout(&mut cmd, self.timeout).map(|_| ())
    }

    fn remove_unused(&self) -> Result<(), String> {
        log::info!("Removing unused packages");
        let mut cmd = self.apt_get();
        cmd.args(["autoremove", "-y"]);
        run_with_timeout(&mut cmd, self.timeout).map(|_| ())
    }
}
