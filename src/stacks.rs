//! Stack registry.
//!
//! A stack is a named bundle of provisioning actions the user opts into as a
//! unit. This module is pure data plus lookup: each `StackId` maps to static
//! tables of packages, services, config templates, flatpak apps and shell
//! extensions. No side effects live here — the desired-state compiler turns
//! these tables into a plan.
//!
//! # Package List Philosophy
//!
//! The tables are kept in Rust (not shell arrays) because:
//! 1. **Compile-time checks**: a typo in a stack name cannot exist
//! 2. **Easy updates**: add/remove entries in one place
//! 3. **Testability**: tables are verified without touching apt
//! 4. **Determinism**: iteration order is the declaration order, so plans
//!    are reproducible across runs

use strum::{Display, EnumIter, EnumString};

/// A config-template directive: which named template lands at which path.
pub type TemplateRef = (&'static str, &'static str);

/// Feature stack selectable from the provisioning menu.
///
/// The set of valid stacks is closed and known at build time; selection is
/// a set-membership test, never a substring match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
pub enum StackId {
    /// Office and productivity suite.
    Office,
    /// Gaming runtime: launchers, compatibility layers, performance daemons.
    Gaming,
    /// System monitoring tools and the shell's monitor extension.
    Monitoring,
    /// Scheduled snapshot and file backup tooling.
    Backups,
    /// Remote management: SSH access and remote desktop clients.
    Remote,
}

impl StackId {
    /// Packages this stack installs through the system package manager.
    pub fn packages(&self) -> &'static [&'static str] {
        match self {
            StackId::Office => &[
                "libreoffice",
                "libreoffice-gnome",
                "thunderbird",
                "hunspell-en-us",
            ],
            StackId::Gaming => &[
                "steam-installer",
                "lutris",
                "gamemode",
                "mangohud",
                "gamescope",
            ],
            StackId::Monitoring => &[
                "htop",
                "btop",
                "lm-sensors",
                "smartmontools",
                "powertop",
            ],
            StackId::Backups => &[
                "timeshift",
                "deja-dup",
                "borgbackup",
            ],
            StackId::Remote => &[
                "openssh-server",
                "wireguard-tools",
                "remmina",
            ],
        }
    }

    /// Systemd services this stack enables.
    pub fn services(&self) -> &'static [&'static str] {
        match self {
            StackId::Office => &[],
            StackId::Gaming => &[],
            StackId::Monitoring => &["smartd"],
            StackId::Backups => &["cron"],
            StackId::Remote => &["ssh"],
        }
    }

    /// Config templates this stack applies, as (template name, destination).
    pub fn templates(&self) -> &'static [TemplateRef] {
        match self {
            StackId::Office => &[],
            StackId::Gaming => &[
                ("gamemode.ini", "/etc/gamemode.ini"),
            ],
            StackId::Monitoring => &[
                ("smartd.conf", "/etc/smartd.conf"),
            ],
            StackId::Backups => &[
                ("timeshift.json", "/etc/timeshift/timeshift.json"),
            ],
            StackId::Remote => &[
                ("sshd-hardening.conf", "/etc/ssh/sshd_config.d/60-deskforge.conf"),
            ],
        }
    }

    /// Flatpak application IDs this stack installs from the remote.
    pub fn flatpak_apps(&self) -> &'static [&'static str] {
        match self {
            StackId::Office => &["org.onlyoffice.desktopeditors"],
            StackId::Gaming => &[
                "com.heroicgameslauncher.hgl",
                "net.davidotek.pupgui2",
            ],
            StackId::Monitoring => &["net.nokyan.Resources"],
            StackId::Backups => &[],
            StackId::Remote => &[],
        }
    }

    /// Desktop-shell extensions this stack enables, by registry identifier.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            StackId::Office => &[],
            StackId::Gaming => &["gamemodeindicator@trsnaqe.com"],
            StackId::Monitoring => &[
                "Vitals@CoreCoding.com",
                "system-monitor@gnome-shell-extensions.gcampax.github.com",
            ],
            StackId::Backups => &[],
            StackId::Remote => &[],
        }
    }

    /// Human-readable description for the stack listing.
    pub fn description(&self) -> &'static str {
        match self {
            StackId::Office => "Office suite, mail client and spellchecking",
            StackId::Gaming => "Game launchers, GameMode and performance overlays",
            StackId::Monitoring => "Sensors, SMART monitoring and shell monitor widgets",
            StackId::Backups => "Timeshift snapshots and file backups",
            StackId::Remote => "SSH server, WireGuard and remote desktop",
        }
    }
}

// ============================================================================
// Unconditional and fact-gated tables (used by the compiler)
// ============================================================================

/// Core packages installed on every run regardless of selection.
pub const CORE_PACKAGES: &[&str] = &[
    "curl",
    "git",
    "gnome-shell-extension-manager",
    "flatpak",
    "gnome-software-plugin-flatpak",
];

/// Core services enabled on every run.
pub const CORE_SERVICES: &[&str] = &["fstrim.timer"];

/// GPU driver packages indexed by detected vendor.
pub mod gpu_packages {
    /// AMD: Mesa-based stack, nothing proprietary.
    pub const AMD: &[&str] = &["mesa-vulkan-drivers", "libvulkan1", "radeontop"];

    /// NVIDIA proprietary driver metapackage.
    pub const NVIDIA: &[&str] = &["nvidia-driver-550", "nvidia-settings"];

    /// Intel integrated graphics media stack.
    pub const INTEL: &[&str] = &["intel-media-va-driver", "intel-gpu-tools"];
}

/// Guest utility packages indexed by detected hypervisor.
pub mod guest_packages {
    pub const KVM: &[&str] = &["qemu-guest-agent", "spice-vdagent"];
    pub const VMWARE: &[&str] = &["open-vm-tools", "open-vm-tools-desktop"];
    pub const VIRTUALBOX: &[&str] = &["virtualbox-guest-utils", "virtualbox-guest-x11"];
    pub const HYPERV: &[&str] = &["linux-tools-virtual", "linux-cloud-tools-virtual"];
}

/// Flatpak remote every run ensures before installing apps.
pub const FLATPAK_REMOTE_NAME: &str = "flathub";
pub const FLATPAK_REMOTE_URL: &str = "https://dl.flathub.org/repo/flathub.flatpakrepo";

// ============================================================================
// Config template bodies
// ============================================================================

/// Resolve a template name to its contents.
///
/// Returns `None` for unknown names; the executor records that as a failed
/// item rather than aborting.
pub fn template_body(name: &str) -> Option<&'static str> {
    match name {
        "gamemode.ini" => Some(
            "[general]\n\
             renice=10\n\
             softrealtime=auto\n\
             inhibit_screensaver=1\n",
        ),
        "smartd.conf" => Some(
            "# Monitor all detected devices, mail root on failure\n\
             DEVICESCAN -a -o on -S on -m root\n",
        ),
        "timeshift.json" => Some(
            "{\n  \"schedule_daily\": \"true\",\n  \"count_daily\": \"5\",\n  \"schedule_weekly\": \"true\",\n  \"count_weekly\": \"3\"\n}\n",
        ),
        "sshd-hardening.conf" => Some(
            "PasswordAuthentication no\n\
             PermitRootLogin prohibit-password\n\
             X11Forwarding no\n",
        ),
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_every_stack_has_packages() {
        for stack in StackId::iter() {
            assert!(
                !stack.packages().is_empty(),
                "{} should install at least one package",
                stack
            );
        }
    }

    #[test]
    fn test_stack_parsing() {
        assert_eq!("gaming".parse::<StackId>().unwrap(), StackId::Gaming);
        assert_eq!("office".parse::<StackId>().unwrap(), StackId::Office);
        assert!("nonsense".parse::<StackId>().is_err());
    }

    #[test]
    fn test_every_template_ref_resolves() {
        for stack in StackId::iter() {
            for (name, dest) in stack.templates() {
                assert!(
                    template_body(name).is_some(),
                    "{} references unknown template {}",
                    stack,
                    name
                );
                assert!(dest.starts_with('/'), "template dest {} must be absolute", dest);
            }
        }
    }

    #[test]
    fn test_unknown_template_is_none() {
        assert!(template_body("does-not-exist.conf").is_none());
    }

    #[test]
    fn test_monitoring_carries_extensions() {
        assert!(!StackId::Monitoring.extensions().is_empty());
    }

    #[test]
    fn test_core_packages_include_flatpak() {
        assert!(CORE_PACKAGES.contains(&"flatpak"));
    }

    #[test]
    fn test_no_duplicate_entries_within_a_table() {
        for stack in StackId::iter() {
            let mut pkgs: Vec<_> = stack.packages().to_vec();
            pkgs.sort_unstable();
            let before = pkgs.len();
            pkgs.dedup();
            assert_eq!(before, pkgs.len(), "{} has duplicate packages", stack);
        }
    }
}
