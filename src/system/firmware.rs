//! Firmware update service interface.
//!
//! Consumed only for a best-effort metadata refresh during a run; a failing
//! or absent fwupd never blocks provisioning.

use super::run_with_timeout;
use std::process::Command;
use std::time::Duration;

/// Narrow contract over the firmware update service.
pub trait FirmwareService {
    /// Refresh the update metadata. Best-effort.
    fn refresh_metadata(&self) -> Result<(), String>;

    /// List device IDs with pending firmware updates.
    fn list_updates(&self) -> Result<Vec<String>, String>;
}

/// fwupd-backed implementation driving `fwupdmgr`.
pub struct FwupdService {
    timeout: Duration,
}

impl FwupdService {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl FirmwareService for FwupdService {
    fn refresh_metadata(&self) -> Result<(), String> {
        log::info!("Refreshing firmware update metadata");
        let mut cmd = Command::new("fwupdmgr");
        cmd.args(["refresh", "--force"]);
        run_with_timeout(&mut cmd, self.timeout).map(|_| ())
    }

    fn list_updates(&self) -> Result<Vec<String>, String> {
        let mut cmd = Command::new("fwupdmgr");
        cmd.args(["get-updates", "--json"]);
        let raw = run_with_timeout(&mut cmd, self.timeout)?;

        // fwupd reports {"Devices": [{"DeviceId": ...}, ...]}
        let parsed: serde_json::Value =
            serde_json::from_str(&raw).map_err(|e| format!("bad fwupd output: {}", e))?;
        let devices = parsed
            .get("Devices")
            .and_then(|d| d.as_array())
            .map(|devices| {
                devices
                    .iter()
                    .filter_map(|d| d.get("DeviceId").and_then(|id| id.as_str()))
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        Ok(devices)
    }
}
