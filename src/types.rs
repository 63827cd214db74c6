//! Type-safe provisioning vocabulary for deskforge
//!
//! This module replaces stringly-typed environment facts and mode selections
//! with proper Rust enums that provide compile-time validation and exhaustive
//! matching.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Physical GPU vendor detected on the PCI bus.
///
/// A machine can carry more than one adapter (e.g. Intel iGPU plus a
/// discrete NVIDIA card), so the classifier reports a *set* of vendors,
/// never a single value. Virtual display adapters are filtered out before
/// this enum is ever produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
pub enum GpuVendor {
    #[strum(serialize = "AMD")]
    Amd,
    #[strum(serialize = "NVIDIA")]
    Nvidia,
    #[strum(serialize = "Intel")]
    Intel,
}

/// Hypervisor the desktop is running under, if any.
///
/// Determined from a single DMI probe. Unrecognized vendor strings map to
/// `None` — an exotic hypervisor is treated the same as bare metal rather
/// than failing classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Virtualization {
    #[default]
    #[strum(serialize = "none")]
    None,
    #[strum(serialize = "kvm")]
    Kvm,
    #[strum(serialize = "vmware")]
    Vmware,
    #[strum(serialize = "virtualbox")]
    VirtualBox,
    #[strum(serialize = "hyperv")]
    HyperV,
}

impl Virtualization {
    /// Returns true when running under any hypervisor.
    pub fn is_virtual(self) -> bool {
        self != Self::None
    }
}

/// Detected firmware mode of the system.
///
/// Determined by checking for the existence of `/sys/firmware/efi`.
/// If the directory exists, the system booted in UEFI mode; if it does not,
/// the system booted in legacy BIOS mode and every UEFI-only action
/// (boot-manager install, boot mode selection) is skipped upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
pub enum FirmwareMode {
    /// UEFI firmware — ESP present, boot-manager theming possible
    #[strum(serialize = "UEFI")]
    Uefi,
    /// Legacy BIOS firmware — no ESP, boot configuration is skipped
    #[strum(serialize = "BIOS")]
    Bios,
}

impl FirmwareMode {
    /// Returns true if the system booted in UEFI mode.
    pub fn is_uefi(self) -> bool {
        matches!(self, Self::Uefi)
    }

    /// Returns true if the system booted in legacy BIOS mode.
    pub fn is_bios(self) -> bool {
        matches!(self, Self::Bios)
    }
}

/// Boot-presentation mode requested by the user.
///
/// The effective mode after degradation is always a member of this same
/// enum; degradation only re-selects among the three values (see
/// `bootcfg::generate`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
pub enum BootMode {
    /// Boot straight into the primary OS, menu hidden.
    #[strum(serialize = "single")]
    Single,
    /// Two-entry menu: primary OS and the secondary (Windows) loader.
    #[strum(serialize = "dual")]
    Dual,
    /// Show every loader the boot manager can find.
    #[default]
    #[strum(serialize = "show-all")]
    ShowAll,
}
