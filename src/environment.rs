//! Environment classification
//!
//! Detects the hardware and platform facts that gate optional provisioning
//! actions: physical GPU vendors, virtualization, firmware mode (UEFI vs
//! BIOS) and Secure Boot state. All detection uses pure Rust sysfs reads.
//!
//! # Design
//!
//! - **Never fails**: every unreadable or missing probe defaults the
//!   corresponding fact to its "none/false" value instead of erroring
//! - **Pure Rust**: no shelling out — PCI and DMI facts come straight
//!   from sysfs
//! - **Read-only**: classification performs no writes and is computed once
//!   per run, then treated as immutable
//!
//! # Integration
//!
//! Call `EnvironmentFacts::classify()` before compiling a plan. The result
//! informs which actions are valid (e.g. NVIDIA driver packages only when an
//! NVIDIA adapter was detected, boot configuration only under UEFI).

use crate::types::{FirmwareMode, GpuVendor, Virtualization};
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::Path;

/// GUID suffix of the global EFI variable namespace.
const EFI_GLOBAL_GUID: &str = "8be4df61-93ca-11d2-aa0d-00e098032b8c";

/// PCI vendor IDs of virtual display adapters exposed by hypervisors.
///
/// These must never be mapped to a physical vendor: a VMware SVGA adapter
/// inside a guest would otherwise trigger physical-GPU driver installation.
const VIRTUAL_DISPLAY_VENDORS: &[&str] = &[
    "0x1234", // Bochs/QEMU stdvga
    "0x15ad", // VMware SVGA
    "0x1b36", // Red Hat QXL
    "0x80ee", // VirtualBox
    "0x1af4", // virtio-gpu
];

/// Aggregated environment facts.
///
/// Created via `EnvironmentFacts::classify()` at startup and read-only
/// afterwards. Owned exclusively by a single run; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentFacts {
    /// Physical GPU vendors found on the PCI bus (may be empty or multiple).
    pub gpus: BTreeSet<GpuVendor>,
    /// Hypervisor signature, `None` on bare metal or unknown hypervisors.
    pub virt: Virtualization,
    /// Firmware mode (UEFI or legacy BIOS).
    pub firmware: FirmwareMode,
    /// Whether Secure Boot is enabled. Unreadable state reads as `false`.
    pub secure_boot: bool,
}

impl EnvironmentFacts {
    /// Classify the running system.
    ///
    /// Never panics and never fails — each probe that cannot be read leaves
    /// its fact at the safe default (no GPUs, no virtualization, BIOS,
    /// Secure Boot disabled).
    pub fn classify() -> Self {
        Self::classify_at(Path::new("/"))
    }

    /// Classify relative to an alternate root.
    ///
    /// Production code passes `/`; tests pass a temp directory holding a
    /// fake sysfs tree.
    pub fn classify_at(root: &Path) -> Self {
        let gpus = detect_gpu_vendors(root);
        let virt = detect_virtualization(root);
        let firmware = detect_firmware_mode(root);
        let secure_boot = detect_secure_boot(root);

        let facts = Self { gpus, virt, firmware, secure_boot };
        log::info!("Environment classified: {}", facts);
        facts
    }

    /// Returns true if a specific GPU vendor was detected.
    pub fn has_gpu(&self, vendor: GpuVendor) -> bool {
        self.gpus.contains(&vendor)
    }
}

impl fmt::Display for EnvironmentFacts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let gpus: Vec<String> = self.gpus.iter().map(|g| g.to_string()).collect();
        write!(
            f,
            "gpus=[{}], virt={}, firmware={}, secure_boot={}",
            gpus.join(","),
            self.virt,
            self.firmware,
            self.secure_boot
        )
    }
}

// ============================================================================
// Detection Functions
// ============================================================================

/// Enumerate display-class PCI devices and map their vendors.
///
/// A device is display-class when its `class` file starts with `0x03`
/// (VGA, XGA, 3D controllers). Vendors outside the fixed physical table are
/// ignored, as are the known virtual adapter vendors.
fn detect_gpu_vendors(root: &Path) -> BTreeSet<GpuVendor> {
    let mut vendors = BTreeSet::new();
    let pci_dir = root.join("sys/bus/pci/devices");

    let entries = match fs::read_dir(&pci_dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("PCI enumeration unavailable ({}): {}", pci_dir.display(), e);
            return vendors;
        }
    };

    for entry in entries.flatten() {
        let device = entry.path();
        let class = read_trimmed(&device.join("class"));
        if !class.as_deref().is_some_and(|c| c.starts_with("0x03")) {
            continue;
        }

        let Some(vendor_id) = read_trimmed(&device.join("vendor")) else {
            continue;
        };

        if VIRTUAL_DISPLAY_VENDORS.contains(&vendor_id.as_str()) {
            log::debug!("Ignoring virtual display adapter vendor {}", vendor_id);
            continue;
        }

        let vendor = match vendor_id.as_str() {
            "0x1002" => Some(GpuVendor::Amd),
            "0x10de" => Some(GpuVendor::Nvidia),
            "0x8086" => Some(GpuVendor::Intel),
            other => {
                log::debug!("Unrecognized display vendor {} — ignored", other);
                None
            }
        };

        if let Some(v) = vendor {
            log::info!("Detected {} display adapter at {}", v, device.display());
            vendors.insert(v);
        }
    }

    vendors
}

/// Map the DMI system vendor string to a hypervisor signature.
///
/// One platform probe (`/sys/class/dmi/id/sys_vendor`), with the product
/// name consulted only to disambiguate Hyper-V, whose vendor string is just
/// "Microsoft Corporation". Unrecognized tokens map to `None`.
fn detect_virtualization(root: &Path) -> Virtualization {
    let dmi = root.join("sys/class/dmi/id");
    let Some(sys_vendor) = read_trimmed(&dmi.join("sys_vendor")) else {
        return Virtualization::None;
    };

    let virt = if sys_vendor.contains("QEMU") || sys_vendor.contains("KVM") {
        Virtualization::Kvm
    } else if sys_vendor.contains("VMware") {
        Virtualization::Vmware
    } else if sys_vendor.contains("innotek") || sys_vendor.contains("VirtualBox") {
        Virtualization::VirtualBox
    } else if sys_vendor.contains("Microsoft") {
        let product = read_trimmed(&dmi.join("product_name")).unwrap_or_default();
        if product.contains("Virtual Machine") {
            Virtualization::HyperV
        } else {
            Virtualization::None
        }
    } else {
        Virtualization::None
    };

    if virt.is_virtual() {
        log::info!("Virtualization detected: {} (sys_vendor={:?})", virt, sys_vendor);
    }
    virt
}

/// Detect firmware mode by checking for the EFI sysfs directory.
///
/// The Linux kernel exposes `sys/firmware/efi` only when booted in UEFI
/// mode. This is the canonical detection method used by systemd and the
/// various bootloader installers.
fn detect_firmware_mode(root: &Path) -> FirmwareMode {
    if root.join("sys/firmware/efi").exists() {
        log::info!("UEFI firmware detected (/sys/firmware/efi exists)");
        FirmwareMode::Uefi
    } else {
        log::info!("BIOS firmware detected (/sys/firmware/efi not found)");
        FirmwareMode::Bios
    }
}

/// Read the Secure Boot state from the firmware variable store.
///
/// The efivar payload is four attribute bytes followed by one data byte;
/// the data byte is 1 when Secure Boot is enforcing. Any read failure —
/// missing efivarfs, permission denied, short read — is treated as
/// "disabled", not as an error. On systems where the variable is enabled
/// but unreadable this under-reports.
fn detect_secure_boot(root: &Path) -> bool {
    let var = root
        .join("sys/firmware/efi/efivars")
        .join(format!("SecureBoot-{}", EFI_GLOBAL_GUID));

    match fs::read(&var) {
        Ok(bytes) if bytes.len() >= 5 => {
            let enabled = bytes[4] == 1;
            log::info!("Secure Boot state: {}", if enabled { "enabled" } else { "disabled" });
            enabled
        }
        Ok(bytes) => {
            log::warn!(
                "SecureBoot variable too short ({} bytes) — treating as disabled",
                bytes.len()
            );
            false
        }
        Err(e) => {
            log::debug!("SecureBoot variable unreadable ({}) — treating as disabled", e);
            false
        }
    }
}

/// Read a sysfs attribute as a trimmed string, `None` on any failure.
fn read_trimmed(path: &Path) -> Option<String> {
    fs::read_to_string(path).ok().map(|s| s.trim().to_string())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// Build a fake sysfs PCI device under `root`.
    fn add_pci_device(root: &Path, name: &str, class: &str, vendor: &str) {
        let dev = root.join("sys/bus/pci/devices").join(name);
        fs::create_dir_all(&dev).unwrap();
        fs::write(dev.join("class"), format!("{}\n", class)).unwrap();
        fs::write(dev.join("vendor"), format!("{}\n", vendor)).unwrap();
    }

    fn set_dmi(root: &Path, sys_vendor: &str, product_name: &str) {
        let dmi = root.join("sys/class/dmi/id");
        fs::create_dir_all(&dmi).unwrap();
        fs::write(dmi.join("sys_vendor"), format!("{}\n", sys_vendor)).unwrap();
        fs::write(dmi.join("product_name"), format!("{}\n", product_name)).unwrap();
    }

    fn set_secure_boot(root: &Path, data_byte: u8) {
        let efivars = root.join("sys/firmware/efi/efivars");
        fs::create_dir_all(&efivars).unwrap();
        let payload = [6u8, 0, 0, 0, data_byte];
        fs::write(efivars.join(format!("SecureBoot-{}", EFI_GLOBAL_GUID)), payload).unwrap();
    }

    #[test]
    fn test_empty_root_yields_safe_defaults() {
        let tmp = TempDir::new().unwrap();
        let facts = EnvironmentFacts::classify_at(tmp.path());

        assert!(facts.gpus.is_empty());
        assert_eq!(facts.virt, Virtualization::None);
        assert_eq!(facts.firmware, FirmwareMode::Bios);
        assert!(!facts.secure_boot);
    }

    #[test]
    fn test_detects_amd_and_nvidia_adapters() {
        let tmp = TempDir::new().unwrap();
        add_pci_device(tmp.path(), "0000:01:00.0", "0x030000", "0x1002");
        add_pci_device(tmp.path(), "0000:02:00.0", "0x030200", "0x10de");

        let facts = EnvironmentFacts::classify_at(tmp.path());
        assert!(facts.has_gpu(GpuVendor::Amd));
        assert!(facts.has_gpu(GpuVendor::Nvidia));
        assert!(!facts.has_gpu(GpuVendor::Intel));
    }

    #[test]
    fn test_non_display_devices_ignored() {
        let tmp = TempDir::new().unwrap();
        // Network controller with an Intel vendor ID must not register a GPU
        add_pci_device(tmp.path(), "0000:03:00.0", "0x020000", "0x8086");

        let facts = EnvironmentFacts::classify_at(tmp.path());
        assert!(facts.gpus.is_empty());
    }

    #[test]
    fn test_virtual_display_adapters_ignored() {
        let tmp = TempDir::new().unwrap();
        add_pci_device(tmp.path(), "0000:00:02.0", "0x030000", "0x15ad");
        add_pci_device(tmp.path(), "0000:00:03.0", "0x030000", "0x1234");

        let facts = EnvironmentFacts::classify_at(tmp.path());
        assert!(facts.gpus.is_empty(), "virtual adapters must not map to physical vendors");
    }

    #[test]
    fn test_duplicate_vendor_collapses() {
        let tmp = TempDir::new().unwrap();
        add_pci_device(tmp.path(), "0000:01:00.0", "0x030000", "0x10de");
        add_pci_device(tmp.path(), "0000:02:00.0", "0x030000", "0x10de");

        let facts = EnvironmentFacts::classify_at(tmp.path());
        assert_eq!(facts.gpus.len(), 1);
    }

    #[test]
    fn test_virtualization_kvm() {
        let tmp = TempDir::new().unwrap();
        set_dmi(tmp.path(), "QEMU", "Standard PC (Q35 + ICH9, 2009)");
        let facts = EnvironmentFacts::classify_at(tmp.path());
        assert_eq!(facts.virt, Virtualization::Kvm);
    }

    #[test]
    fn test_virtualization_vmware() {
        let tmp = TempDir::new().unwrap();
        set_dmi(tmp.path(), "VMware, Inc.", "VMware Virtual Platform");
        let facts = EnvironmentFacts::classify_at(tmp.path());
        assert_eq!(facts.virt, Virtualization::Vmware);
    }

    #[test]
    fn test_virtualization_virtualbox() {
        let tmp = TempDir::new().unwrap();
        set_dmi(tmp.path(), "innotek GmbH", "VirtualBox");
        let facts = EnvironmentFacts::classify_at(tmp.path());
        assert_eq!(facts.virt, Virtualization::VirtualBox);
    }

    #[test]
    fn test_virtualization_hyperv_requires_product_match() {
        let tmp = TempDir::new().unwrap();
        set_dmi(tmp.path(), "Microsoft Corporation", "Virtual Machine");
        assert_eq!(EnvironmentFacts::classify_at(tmp.path()).virt, Virtualization::HyperV);

        // A physical Surface device is Microsoft-branded but not a VM
        set_dmi(tmp.path(), "Microsoft Corporation", "Surface Pro 9");
        assert_eq!(EnvironmentFacts::classify_at(tmp.path()).virt, Virtualization::None);
    }

    #[test]
    fn test_unknown_hypervisor_maps_to_none() {
        let tmp = TempDir::new().unwrap();
        set_dmi(tmp.path(), "Parallels Software International Inc.", "Parallels VM");
        assert_eq!(EnvironmentFacts::classify_at(tmp.path()).virt, Virtualization::None);
    }

    #[test]
    fn test_uefi_detection() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("sys/firmware/efi")).unwrap();
        let facts = EnvironmentFacts::classify_at(tmp.path());
        assert_eq!(facts.firmware, FirmwareMode::Uefi);
    }

    #[test]
    fn test_secure_boot_enabled() {
        let tmp = TempDir::new().unwrap();
        set_secure_boot(tmp.path(), 1);
        assert!(EnvironmentFacts::classify_at(tmp.path()).secure_boot);
    }

    #[test]
    fn test_secure_boot_disabled() {
        let tmp = TempDir::new().unwrap();
        set_secure_boot(tmp.path(), 0);
        assert!(!EnvironmentFacts::classify_at(tmp.path()).secure_boot);
    }

    #[test]
    fn test_secure_boot_short_read_is_disabled() {
        let tmp = TempDir::new().unwrap();
        let efivars = tmp.path().join("sys/firmware/efi/efivars");
        fs::create_dir_all(&efivars).unwrap();
        fs::write(efivars.join(format!("SecureBoot-{}", EFI_GLOBAL_GUID)), [6u8, 0]).unwrap();

        assert!(!EnvironmentFacts::classify_at(tmp.path()).secure_boot);
    }

    #[test]
    fn test_facts_display() {
        let facts = EnvironmentFacts {
            gpus: BTreeSet::from([GpuVendor::Amd]),
            virt: Virtualization::None,
            firmware: FirmwareMode::Uefi,
            secure_boot: true,
        };
        assert_eq!(
            facts.to_string(),
            "gpus=[AMD], virt=none, firmware=UEFI, secure_boot=true"
        );
    }
}
