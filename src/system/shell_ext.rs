//! Desktop-shell extension loader and remote metadata service.
//!
//! Two collaborators live here:
//!
//! - `ExtensionLoader`: the live-session side of extension management
//!   (list, install from a downloaded package, enable, disable). The
//!   persisted counterpart is the configuration store; the executor keeps
//!   the two consistent.
//! - `MetadataService`: resolves an extension's registry identifier plus a
//!   shell-version hint to a concrete `{uuid, download_url}`. Any failure
//!   means "this one extension is unavailable this run" — never a fatal
//!   error.

use super::run_with_timeout;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

/// Resolved extension metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtensionInfo {
    pub uuid: String,
    pub download_url: String,
}

/// Remote metadata and payload service.
pub trait MetadataService {
    /// Resolve a registry identifier for the given shell version.
    fn lookup(&self, registry_id: &str, shell_version: &str) -> Result<ExtensionInfo, String>;

    /// Fetch the extension package bytes.
    fn download(&self, url: &str) -> Result<Vec<u8>, String>;
}

/// Live-session extension loader.
pub trait ExtensionLoader {
    /// UUIDs of extensions currently installed in the session.
    fn list_installed(&self) -> Result<BTreeSet<String>, String>;

    /// Install an extension from package bytes, returning its UUID.
    fn install_from_package(&self, bytes: &[u8]) -> Result<String, String>;

    fn enable(&self, uuid: &str) -> Result<(), String>;

    fn disable(&self, uuid: &str) -> Result<(), String>;
}

// ============================================================================
// extensions.gnome.org client
// ============================================================================

const EGO_BASE: &str = "https://extensions.gnome.org";

/// Metadata client for the extension registry.
pub struct EgoClient {
    http: reqwest::blocking::Client,
    base: String,
}

impl EgoClient {
    pub fn new(timeout: Duration) -> Result<Self, String> {
        Self::with_base(EGO_BASE, timeout)
    }

    /// Point the client at an alternate registry (tests use a local server).
    pub fn with_base(base: &str, timeout: Duration) -> Result<Self, String> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| format!("failed to build HTTP client: {}", e))?;
        Ok(Self { http, base: base.trim_end_matches('/').to_string() })
    }
}

impl MetadataService for EgoClient {
    fn lookup(&self, registry_id: &str, shell_version: &str) -> Result<ExtensionInfo, String> {
        let url = format!(
            "{}/extension-info/?uuid={}&shell_version={}",
            self.base, registry_id, shell_version
        );
        log::debug!("Looking up extension metadata: {}", url);

        let response = self
            .http
            .get(&url)
            .send()
            .map_err(|e| format!("metadata fetch failed for {}: {}", registry_id, e))?;
        if !response.status().is_success() {
            return Err(format!(
                "metadata fetch for {} returned {}",
                registry_id,
                response.status()
            ));
        }

        let mut info: ExtensionInfo = response
            .json()
            .map_err(|e| format!("bad metadata for {}: {}", registry_id, e))?;
        // The registry returns a site-relative download path
        if info.download_url.starts_with('/') {
            info.download_url = format!("{}{}", self.base, info.download_url);
        }
        Ok(info)
    }

    fn download(&self, url: &str) -> Result<Vec<u8>, String> {
        log::debug!("Downloading extension package: {}", url);
        let response = self
            .http
            .get(url)
            .send()
            .map_err(|e| format!("download failed for {}: {}", url, e))?;
        if !response.status().is_success() {
            return Err(format!("download of {} returned {}", url, response.status()));
        }
        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| format!("download of {} truncated: {}", url, e))
    }
}

// ============================================================================
// gnome-extensions CLI loader
// ============================================================================

/// Loader driving the `gnome-extensions` CLI.
pub struct GnomeExtensionLoader {
    timeout: Duration,
}

impl GnomeExtensionLoader {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Stage downloaded bytes as a package file the CLI can install.
    fn stage_package(&self, bytes: &[u8]) -> Result<PathBuf, String> {
        let path = std::env::temp_dir().join(format!(
            "deskforge-ext-{}-{}.shell-extension.zip",
            std::process::id(),
            bytes.len()
        ));
        std::fs::write(&path, bytes)
            .map_err(|e| format!("failed to stage extension package: {}", e))?;
        Ok(path)
    }
}

impl ExtensionLoader for GnomeExtensionLoader {
    fn list_installed(&self) -> Result<BTreeSet<String>, String> {
        let mut cmd = Command::new("gnome-extensions");
        cmd.arg("list");
        let out = run_with_timeout(&mut cmd, self.timeout)?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }

    fn install_from_package(&self, bytes: &[u8]) -> Result<String, String> {
        let before = self.list_installed()?;
        let staged = self.stage_package(bytes)?;

        let mut cmd = Command::new("gnome-extensions");
        cmd.arg("install").arg("--force").arg(&staged);
        let result = run_with_timeout(&mut cmd, self.timeout);
        let _ = std::fs::remove_file(&staged);
        result?;

        let after = self.list_installed()?;
        after
            .difference(&before)
            .next()
            .cloned()
            .ok_or_else(|| "installed package did not register a new extension".to_string())
    }

    fn enable(&self, uuid: &str) -> Result<(), String> {
        log::info!("Enabling extension: {}", uuid);
        let mut cmd = Command::new("gnome-extensions");
        cmd.args(["enable", uuid]);
        run_with_timeout(&mut cmd, self.timeout).map(|_| ())
    }

    fn disable(&self, uuid: &str) -> Result<(), String> {
        log::info!("Disabling extension: {}", uuid);
        let mut cmd = Command::new("gnome-extensions");
        cmd.args(["disable", uuid]);
        run_with_timeout(&mut cmd, self.timeout).map(|_| ())
    }
}
