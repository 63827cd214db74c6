//! Run orchestration.
//!
//! Applies a compiled plan through the external collaborators in a fixed
//! phase order:
//!
//! 1. package installation (per-name outcomes)
//! 2. sandboxed-app installation (remote ensure, per-id outcomes)
//! 3. extension install + force-disable, committed to the store immediately
//! 4. config template application (while extensions are still disabled),
//!    then service enablement — one attempt per unit
//! 5. boot configuration: probe, generate, backup-write, installer, plus a
//!    best-effort firmware metadata refresh
//! 6. extension final-enable through the reconciler, store written promptly
//!
//! # Failure Policy
//!
//! The executor never raises a fatal error for an individual item — every
//! action lands in the `RunReport` as Succeeded, Failed or Skipped and the
//! run continues. Only precondition failures (not running as root) abort
//! before phase 1 begins.
//!
//! The install-disabled-then-enable-last sequencing for extensions is
//! deliberate: a half-configured extension must never activate mid-run.
//! Templates are applied while everything newly installed is disabled, and
//! only the extensions whose whole pipeline (lookup, download, install,
//! disable) succeeded are enabled at the end. A failed extension keeps its
//! prior state and never blocks the others.

use crate::bootcfg::{self, BootLoaderPresence};
use crate::environment::EnvironmentFacts;
use crate::error::{DeskforgeError, Result};
use crate::plan::Plan;
use crate::reconciler::{ExtensionDirectives, reconcile};
use crate::stacks;
use crate::system::bootloader::{BootloaderInstaller, write_with_backup};
use crate::system::firmware::FirmwareService;
use crate::system::flatpak::AppInstaller;
use crate::system::gsettings::{DISABLED_KEY, ENABLED_KEY, ShellConfigStore};
use crate::system::package::PackageBackend;
use crate::system::service::ServiceManager;
use crate::system::shell_ext::{ExtensionLoader, MetadataService};
use crate::types::BootMode;
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

/// Per-item result recorded in the run report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    Failed(String),
    Skipped(String),
}

impl Outcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }

    fn from_result(result: std::result::Result<(), String>) -> Self {
        match result {
            Ok(()) => Outcome::Succeeded,
            Err(reason) => Outcome::Failed(reason),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Succeeded => write!(f, "ok"),
            Outcome::Failed(reason) => write!(f, "FAILED: {}", reason),
            Outcome::Skipped(reason) => write!(f, "skipped: {}", reason),
        }
    }
}

/// One attempted action and its outcome.
#[derive(Debug, Clone)]
pub struct ReportItem {
    pub label: String,
    pub outcome: Outcome,
}

/// Final report enumerating every attempted action.
///
/// A degraded boot mode is surfaced here as `effective_boot_mode` — it is a
/// successful outcome the user must still be told about.
#[derive(Debug, Default, Clone)]
pub struct RunReport {
    pub items: Vec<ReportItem>,
    pub effective_boot_mode: Option<BootMode>,
}

impl RunReport {
    fn record(&mut self, label: impl Into<String>, outcome: Outcome) {
        let label = label.into();
        match &outcome {
            Outcome::Succeeded => log::info!("{}: ok", label),
            Outcome::Failed(reason) => log::warn!("{}: failed: {}", label, reason),
            Outcome::Skipped(reason) => log::info!("{}: skipped: {}", label, reason),
        }
        self.items.push(ReportItem { label, outcome });
    }

    pub fn failed_count(&self) -> usize {
        self.items.iter().filter(|i| i.outcome.is_failed()).count()
    }

    pub fn succeeded_count(&self) -> usize {
        self.items
            .iter()
            .filter(|i| i.outcome == Outcome::Succeeded)
            .count()
    }

    /// Find an item's outcome by exact label.
    pub fn outcome_of(&self, label: &str) -> Option<&Outcome> {
        self.items.iter().find(|i| i.label == label).map(|i| &i.outcome)
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for item in &self.items {
            writeln!(f, "  {:<60} {}", item.label, item.outcome)?;
        }
        writeln!(
            f,
            "{} succeeded, {} failed, {} total",
            self.succeeded_count(),
            self.failed_count(),
            self.items.len()
        )?;
        if let Some(mode) = self.effective_boot_mode {
            writeln!(f, "effective boot mode: {}", mode)?;
        }
        Ok(())
    }
}

/// Boot configuration request passed to the executor.
#[derive(Debug, Clone)]
pub struct BootRequest {
    pub mode: BootMode,
    /// Mount point of the EFI system partition.
    pub esp: PathBuf,
}

impl BootRequest {
    /// Destination of the generated configuration on the ESP.
    pub fn config_dest(&self) -> PathBuf {
        self.esp.join("EFI/refind/refind.conf")
    }
}

/// External collaborators the executor drives.
///
/// Borrowed trait objects so tests can hand in shared in-memory fakes.
pub struct Collaborators<'a> {
    pub packages: &'a dyn PackageBackend,
    pub apps: &'a dyn AppInstaller,
    pub services: &'a dyn ServiceManager,
    pub store: &'a dyn ShellConfigStore,
    pub loader: &'a dyn ExtensionLoader,
    pub metadata: &'a dyn MetadataService,
    pub bootloader: &'a dyn BootloaderInstaller,
    pub firmware: &'a dyn FirmwareService,
}

/// Applies a compiled plan in fixed phase order.
pub struct Executor<'a> {
    collab: Collaborators<'a>,
    facts: &'a EnvironmentFacts,
    /// Shell major version hint passed to the metadata service.
    shell_version: String,
    dry_run: bool,
    require_root: bool,
    /// Overrides the live `geteuid` probe when set.
    euid_override: Option<u32>,
}

impl<'a> Executor<'a> {
    pub fn new(
        collab: Collaborators<'a>,
        facts: &'a EnvironmentFacts,
        shell_version: impl Into<String>,
    ) -> Self {
        Self {
            collab,
            facts,
            shell_version: shell_version.into(),
            dry_run: false,
            require_root: true,
            euid_override: None,
        }
    }

    /// In dry-run mode every mutating item is recorded as Skipped and no
    /// collaborator write happens; read-only probes still run.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Disable the effective-uid precondition.
    ///
    /// For embedders (and tests) whose collaborators do not touch the real
    /// system; the default CLI path always keeps the check on.
    pub fn require_root(mut self, require_root: bool) -> Self {
        self.require_root = require_root;
        self
    }

    /// Use this effective uid for the precondition check instead of probing
    /// the live process. Lets the abort path run under any real uid.
    pub fn effective_uid(mut self, euid: u32) -> Self {
        self.euid_override = Some(euid);
        self
    }

    /// Abort-worthy checks, evaluated before any mutation.
    ///
    /// Dry runs are exempt: previewing a plan must not require root.
    fn check_preconditions(&self) -> Result<()> {
        if self.dry_run || !self.require_root {
            return Ok(());
        }
        let euid = self
            .euid_override
            .unwrap_or_else(|| nix::unistd::geteuid().as_raw());
        if euid != 0 {
            return Err(DeskforgeError::precondition(
                "provisioning must run as root (try sudo)",
            ));
        }
        Ok(())
    }

    /// Run all phases. Only a precondition failure returns `Err`.
    ///
    /// `apps` are the resolved flatpak application IDs and `directives`
    /// carries the desired extension changes (UUIDs); both come from the
    /// compiler. `boot` is present only when the user asked for boot
    /// configuration.
    pub fn run(
        &self,
        plan: &Plan,
        apps: &[String],
        directives: &ExtensionDirectives,
        boot: Option<&BootRequest>,
    ) -> Result<RunReport> {
        self.check_preconditions()?;

        let mut report = RunReport::default();

        self.phase_packages(plan, &mut report);
        self.phase_apps(apps, &mut report);
        let pending_enable = self.phase_extensions_install(directives, &mut report);
        self.phase_configs_and_services(plan, &mut report);
        self.phase_boot(boot, &mut report);
        self.phase_extensions_enable(&pending_enable, directives, &mut report);

        log::info!(
            "Run complete: {} succeeded, {} failed",
            report.succeeded_count(),
            report.failed_count()
        );
        Ok(report)
    }

    // ------------------------------------------------------------------
    // Phase 1: packages
    // ------------------------------------------------------------------

    fn phase_packages(&self, plan: &Plan, report: &mut RunReport) {
        for pkg in plan.packages() {
            let label = format!("install package {}", pkg);
            if self.dry_run {
                report.record(label, Outcome::Skipped("dry-run".into()));
                continue;
            }
            report.record(label, Outcome::from_result(self.collab.packages.install(pkg)));
        }

        if !self.dry_run && !plan.packages().is_empty() {
            report.record(
                "remove unused packages",
                Outcome::from_result(self.collab.packages.remove_unused()),
            );
        }
    }

    // ------------------------------------------------------------------
    // Phase 2: sandboxed apps
    // ------------------------------------------------------------------

    fn phase_apps(&self, apps: &[String], report: &mut RunReport) {
        if apps.is_empty() {
            return;
        }

        let remote_label = format!("ensure flatpak remote {}", stacks::FLATPAK_REMOTE_NAME);
        if self.dry_run {
            report.record(remote_label, Outcome::Skipped("dry-run".into()));
            for app in apps {
                report.record(format!("install app {}", app), Outcome::Skipped("dry-run".into()));
            }
            return;
        }

        let remote = self
            .collab
            .apps
            .add_remote(stacks::FLATPAK_REMOTE_NAME, stacks::FLATPAK_REMOTE_URL);
        let remote_ok = remote.is_ok();
        report.record(remote_label, Outcome::from_result(remote));

        for app in apps {
            let label = format!("install app {}", app);
            if !remote_ok {
                report.record(label, Outcome::Skipped("flatpak remote unavailable".into()));
                continue;
            }
            report.record(label, Outcome::from_result(self.collab.apps.install(app)));
        }

        if remote_ok {
            if let Err(e) = self.collab.apps.update() {
                log::warn!("flatpak update failed (non-fatal): {}", e);
            }
        }
    }

    // ------------------------------------------------------------------
    // Phase 3: extension install + force-disable
    // ------------------------------------------------------------------

    /// Install every requested extension and leave it disabled, committing
    /// the disabled state to the store before anything else happens.
    ///
    /// Returns the UUIDs whose pipeline fully succeeded; only those are
    /// enabled in phase 6.
    fn phase_extensions_install(
        &self,
        directives: &ExtensionDirectives,
        report: &mut RunReport,
    ) -> BTreeSet<String> {
        let mut pending = BTreeSet::new();
        if directives.to_enable.is_empty() {
            return pending;
        }

        if self.dry_run {
            for uuid in &directives.to_enable {
                report.record(
                    format!("install extension {}", uuid),
                    Outcome::Skipped("dry-run".into()),
                );
            }
            return pending;
        }

        let installed = match self.collab.loader.list_installed() {
            Ok(installed) => installed,
            Err(e) => {
                // Without the session list nothing can be safely installed
                for uuid in &directives.to_enable {
                    report.record(
                        format!("install extension {}", uuid),
                        Outcome::Failed(format!("extension loader unavailable: {}", e)),
                    );
                }
                return pending;
            }
        };

        for uuid in &directives.to_enable {
            let label = format!("install extension {}", uuid);

            if installed.contains(uuid) {
                // Already present: just make sure it stays off until phase 6
                if let Err(e) = self.collab.loader.disable(uuid) {
                    report.record(label, Outcome::Failed(format!("disable failed: {}", e)));
                    continue;
                }
                report.record(label, Outcome::Skipped("already installed".into()));
                pending.insert(uuid.clone());
                continue;
            }

            let info = match self.collab.metadata.lookup(uuid, &self.shell_version) {
                Ok(info) => info,
                Err(e) => {
                    report.record(label, Outcome::Failed(e));
                    continue;
                }
            };

            let bytes = match self.collab.metadata.download(&info.download_url) {
                Ok(bytes) => bytes,
                Err(e) => {
                    report.record(label, Outcome::Failed(e));
                    continue;
                }
            };

            let installed_uuid = match self.collab.loader.install_from_package(&bytes) {
                Ok(installed_uuid) => installed_uuid,
                Err(e) => {
                    report.record(label, Outcome::Failed(e));
                    continue;
                }
            };

            if let Err(e) = self.collab.loader.disable(&installed_uuid) {
                report.record(label, Outcome::Failed(format!("disable failed: {}", e)));
                continue;
            }

            report.record(label, Outcome::Succeeded);
            pending.insert(installed_uuid);
        }

        // Commit the force-disabled state so a crash mid-run leaves the new
        // extensions off, not half-configured and active.
        if !pending.is_empty() {
            self.commit_state(&BTreeSet::new(), &pending, report, "persist force-disabled state");
        }

        pending
    }

    // ------------------------------------------------------------------
    // Phase 4: config templates, then services
    // ------------------------------------------------------------------

    fn phase_configs_and_services(&self, plan: &Plan, report: &mut RunReport) {
        for (template, dest) in plan.templates() {
            let label = format!("apply {} -> {}", template, dest.display());
            if self.dry_run {
                report.record(label, Outcome::Skipped("dry-run".into()));
                continue;
            }
            let outcome = match stacks::template_body(template) {
                None => Outcome::Failed(format!("unknown template {}", template)),
                Some(body) => match write_with_backup(dest, body) {
                    Ok(_) => Outcome::Succeeded,
                    Err(e) => Outcome::Failed(e.to_string()),
                },
            };
            report.record(label, outcome);
        }

        for svc in plan.services() {
            let label = format!("enable service {}", svc);
            if self.dry_run {
                report.record(label, Outcome::Skipped("dry-run".into()));
                continue;
            }
            report.record(label, Outcome::from_result(self.collab.services.enable(svc)));
        }
    }

    // ------------------------------------------------------------------
    // Phase 5: boot configuration
    // ------------------------------------------------------------------

    fn phase_boot(&self, boot: Option<&BootRequest>, report: &mut RunReport) {
        let Some(request) = boot else { return };

        if self.facts.firmware.is_bios() {
            report.record(
                "boot configuration",
                Outcome::Skipped("legacy BIOS firmware has no ESP".into()),
            );
            return;
        }

        // Presence is re-read every run; it can change between invocations
        let presence = BootLoaderPresence::probe(&request.esp);
        let generated = bootcfg::generate(request.mode, presence);
        report.effective_boot_mode = Some(generated.effective);

        let label = if generated.degraded_from(request.mode) {
            format!(
                "boot configuration (degraded {} -> {})",
                request.mode, generated.effective
            )
        } else {
            format!("boot configuration ({})", generated.effective)
        };

        if self.dry_run {
            report.record(label, Outcome::Skipped("dry-run".into()));
            return;
        }

        let dest = request.config_dest();
        match write_with_backup(&dest, &generated.config_text) {
            Ok(_) => report.record(label, Outcome::Succeeded),
            Err(e) => {
                report.record(label, Outcome::Failed(e.to_string()));
                return;
            }
        }

        report.record(
            "install boot manager",
            Outcome::from_result(self.collab.bootloader.install_to_esp(&request.esp)),
        );

        // Best-effort firmware metadata refresh rides along; never blocks
        match self.collab.firmware.refresh_metadata() {
            Ok(()) => match self.collab.firmware.list_updates() {
                Ok(updates) if !updates.is_empty() => {
                    log::info!("{} firmware update(s) available", updates.len());
                }
                Ok(_) => {}
                Err(e) => log::debug!("firmware update listing failed: {}", e),
            },
            Err(e) => log::debug!("firmware metadata refresh failed (non-fatal): {}", e),
        }
    }

    // ------------------------------------------------------------------
    // Phase 6: final enable
    // ------------------------------------------------------------------

    fn phase_extensions_enable(
        &self,
        pending: &BTreeSet<String>,
        directives: &ExtensionDirectives,
        report: &mut RunReport,
    ) {
        if self.dry_run {
            for uuid in &directives.to_enable {
                report.record(
                    format!("enable extension {}", uuid),
                    Outcome::Skipped("dry-run".into()),
                );
            }
            return;
        }
        if pending.is_empty() && directives.to_disable.is_empty() {
            return;
        }

        self.commit_state(pending, &directives.to_disable, report, "persist extension state");

        for uuid in pending {
            report.record(
                format!("enable extension {}", uuid),
                Outcome::from_result(self.collab.loader.enable(uuid)),
            );
        }
        for uuid in &directives.to_disable {
            if let Err(e) = self.collab.loader.disable(uuid) {
                log::warn!("live disable of {} failed: {}", uuid, e);
            }
        }
    }

    /// Read the persisted sets, reconcile, and write both back promptly.
    ///
    /// The store is shared with the shell and read-modify-write is not
    /// atomic across processes, so the window between read and write is
    /// kept as small as possible.
    fn commit_state(
        &self,
        to_enable: &BTreeSet<String>,
        to_disable: &BTreeSet<String>,
        report: &mut RunReport,
        label: &str,
    ) {
        let current_enabled = match self.collab.store.get_array(ENABLED_KEY) {
            Ok(set) => set,
            Err(e) => {
                report.record(label, Outcome::Failed(format!("read {}: {}", ENABLED_KEY, e)));
                return;
            }
        };
        let current_disabled = match self.collab.store.get_array(DISABLED_KEY) {
            Ok(set) => set,
            Err(e) => {
                report.record(label, Outcome::Failed(format!("read {}: {}", DISABLED_KEY, e)));
                return;
            }
        };

        let (new_enabled, new_disabled) =
            reconcile(&current_enabled, &current_disabled, to_enable, to_disable);

        if let Err(e) = self.collab.store.set_array(ENABLED_KEY, &new_enabled) {
            report.record(label, Outcome::Failed(format!("write {}: {}", ENABLED_KEY, e)));
            return;
        }
        if let Err(e) = self.collab.store.set_array(DISABLED_KEY, &new_disabled) {
            report.record(label, Outcome::Failed(format!("write {}: {}", DISABLED_KEY, e)));
            return;
        }
        report.record(label, Outcome::Succeeded);
    }
}

// ============================================================================
// Tests
// ============================================================================
