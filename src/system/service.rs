//! Service manager interface.
//!
//! One operation: enable (and start) a unit. Each enable is attempted
//! exactly once per run — there is no retry — and a failure is an ordinary
//! per-item outcome.

use super::run_with_timeout;
use std::process::Command;
use std::time::Duration;

/// Narrow contract over the init system.
pub trait ServiceManager {
    /// Enable a unit and start it now.
    fn enable(&self, unit: &str) -> Result<(), String>;
}

/// systemd-backed implementation driving `systemctl`.
pub struct SystemdServiceManager {
    timeout: Duration,
}

impl SystemdServiceManager {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl ServiceManager for SystemdServiceManager {
    fn enable(&self, unit: &str) -> Result<(), String> {
        log::info!("Enabling service: {}", unit);
        let mut cmd = Command::new("systemctl");
        cmd.args(["enable", "--now", unit]);
        run_with_timeout(&mut cmd, self.timeout).map(|_| ())
    }
}
