//! Boot-loader installer and configuration writer.
//!
//! The generator in `bootcfg` is pure; this module owns the side effects:
//! installing the boot manager onto the EFI system partition (idempotent —
//! safe to call when already installed) and writing the generated
//! configuration with a timestamped backup of any prior file.

use super::run_with_timeout;
use chrono::Local;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

/// Narrow contract over the boot-manager installer.
pub trait BootloaderInstaller {
    /// Install the boot manager to the given ESP. Idempotent.
    fn install_to_esp(&self, esp: &Path) -> Result<(), String>;
}

/// rEFInd-backed installer using the distro's `refind-install`.
pub struct RefindInstaller {
    timeout: Duration,
}

impl RefindInstaller {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl BootloaderInstaller for RefindInstaller {
    fn install_to_esp(&self, esp: &Path) -> Result<(), String> {
        log::info!("Installing boot manager to {}", esp.display());
        let mut cmd = Command::new("refind-install");
        cmd.arg("--yes");
        run_with_timeout(&mut cmd, self.timeout).map(|_| ())
    }
}

/// Write `text` to `dest`, backing up any existing file first.
///
/// The backup sits next to the original with a `.bak-YYYYMMDD-HHMMSS`
/// suffix so a run never destroys the user's previous configuration.
/// Returns the backup path when one was made.
pub fn write_with_backup(dest: &Path, text: &str) -> std::io::Result<Option<PathBuf>> {
    let backup = if dest.exists() {
        let stamp = Local::now().format("%Y%m%d-%H%M%S");
        let backup = dest.with_file_name(format!(
            "{}.bak-{}",
            dest.file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "config".to_string()),
            stamp
        ));
        std::fs::copy(dest, &backup)?;
        log::info!("Backed up {} to {}", dest.display(), backup.display());
        Some(backup)
    } else {
        None
    };

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(dest, text)?;
    log::info!("Wrote {} ({} bytes)", dest.display(), text.len());
    Ok(backup)
}
