//! Desired-state compiler.
//!
//! Translates the user's stack selection plus the classified environment
//! facts into one flattened, deduplicated action plan.
//!
//! # Design
//!
//! - **No hardcoded strings**: all tables come from `stacks.rs` constants
//! - **Deterministic**: identical `(selected, facts)` input yields a
//!   byte-identical plan ordering — stacks contribute in enum order and
//!   dedup keeps the first occurrence
//! - **Monotonic**: compilation only ever unions actions in; it never
//!   computes a negative diff against a previous run (uninstallation is out
//!   of scope)
//! - **Pure logic**: no I/O, no side effects — only resolves names
//!
//! # Resolution Rules
//!
//! | Input                | Resolved To |
//! |----------------------|-------------|
//! | always               | core packages and services |
//! | each selected stack  | its package/service/template tables |
//! | detected GPU vendors | vendor driver packages |
//! | detected hypervisor  | guest utility packages |

use crate::environment::EnvironmentFacts;
use crate::plan::{Action, Plan};
use crate::stacks::{self, StackId, gpu_packages, guest_packages};
use crate::types::{GpuVendor, Virtualization};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Compile the selected stacks and environment facts into a plan.
///
/// Cannot fail: an empty selection still yields the core-only plan.
/// Fact-gated actions are added independently of stack selection — a
/// detected NVIDIA adapter pulls the driver package in even when no stack
/// was chosen at all.
pub fn compile(selected: &BTreeSet<StackId>, facts: &EnvironmentFacts) -> Plan {
    let mut plan = Plan::new();

    // 1. Core actions — always present
    for pkg in stacks::CORE_PACKAGES {
        plan.push(Action::InstallPackage((*pkg).to_string()));
    }
    for svc in stacks::CORE_SERVICES {
        plan.push(Action::EnableService((*svc).to_string()));
    }

    // 2. Selected stacks, in stable enum order (BTreeSet iteration)
    for stack in selected {
        for pkg in stack.packages() {
            plan.push(Action::InstallPackage((*pkg).to_string()));
        }
        for svc in stack.services() {
            plan.push(Action::EnableService((*svc).to_string()));
        }
        for (template, dest) in stack.templates() {
            plan.push(Action::ApplyConfigTemplate {
                template: (*template).to_string(),
                dest: PathBuf::from(dest),
            });
        }
    }

    // 3. GPU drivers, gated purely on detected vendors
    for vendor in &facts.gpus {
        let pkgs = match vendor {
            GpuVendor::Amd => gpu_packages::AMD,
            GpuVendor::Nvidia => gpu_packages::NVIDIA,
            GpuVendor::Intel => gpu_packages::INTEL,
        };
        for pkg in pkgs {
            plan.push(Action::InstallPackage((*pkg).to_string()));
        }
    }

    // 4. Hypervisor guest utilities
    let guest_pkgs = match facts.virt {
        Virtualization::None => &[][..],
        Virtualization::Kvm => guest_packages::KVM,
        Virtualization::Vmware => guest_packages::VMWARE,
        Virtualization::VirtualBox => guest_packages::VIRTUALBOX,
        Virtualization::HyperV => guest_packages::HYPERV,
    };
    for pkg in guest_pkgs {
        plan.push(Action::InstallPackage((*pkg).to_string()));
    }

    log::info!(
        "Compiled plan: {} action(s) from {} stack(s)",
        plan.len(),
        selected.len()
    );

    plan
}

/// Resolve the flatpak application IDs for the selected stacks.
///
/// Same discipline as `compile`: stable order, deduplicated, first seen
/// wins.
pub fn compile_apps(selected: &BTreeSet<StackId>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut apps = Vec::new();
    for stack in selected {
        for app in stack.flatpak_apps() {
            if seen.insert(*app) {
                apps.push((*app).to_string());
            }
        }
    }
    apps
}

/// Resolve the shell-extension registry IDs the selected stacks enable.
pub fn compile_extensions(selected: &BTreeSet<StackId>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut exts = Vec::new();
    for stack in selected {
        for ext in stack.extensions() {
            if seen.insert(*ext) {
                exts.push((*ext).to_string());
            }
        }
    }
    exts
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::ActionKind;
    use crate::types::FirmwareMode;

    fn bare_metal_facts() -> EnvironmentFacts {
        EnvironmentFacts {
            gpus: BTreeSet::new(),
            virt: Virtualization::None,
            firmware: FirmwareMode::Uefi,
            secure_boot: false,
        }
    }

    fn select(stacks: &[StackId]) -> BTreeSet<StackId> {
        stacks.iter().copied().collect()
    }

    #[test]
    fn test_empty_selection_yields_core_only_plan() {
        let plan = compile(&BTreeSet::new(), &bare_metal_facts());
        assert!(!plan.is_empty());
        for pkg in stacks::CORE_PACKAGES {
            assert!(plan.contains(ActionKind::InstallPackage, pkg));
        }
        assert_eq!(
            plan.packages().len(),
            stacks::CORE_PACKAGES.len(),
            "no stack packages without a selection"
        );
    }

    #[test]
    fn test_gaming_with_amd_gpu() {
        let mut facts = bare_metal_facts();
        facts.gpus.insert(GpuVendor::Amd);
        let plan = compile(&select(&[StackId::Gaming]), &facts);

        // Generic gaming packages and the AMD-specific ones, each exactly once
        assert!(plan.contains(ActionKind::InstallPackage, "steam-installer"));
        assert!(plan.contains(ActionKind::InstallPackage, "mesa-vulkan-drivers"));
        let count = plan
            .packages()
            .iter()
            .filter(|p| **p == "mesa-vulkan-drivers")
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_gpu_packages_added_without_any_stack() {
        let mut facts = bare_metal_facts();
        facts.gpus.insert(GpuVendor::Nvidia);
        let plan = compile(&BTreeSet::new(), &facts);
        assert!(plan.contains(ActionKind::InstallPackage, "nvidia-driver-550"));
    }

    #[test]
    fn test_multiple_gpu_vendors() {
        let mut facts = bare_metal_facts();
        facts.gpus.insert(GpuVendor::Intel);
        facts.gpus.insert(GpuVendor::Nvidia);
        let plan = compile(&BTreeSet::new(), &facts);
        assert!(plan.contains(ActionKind::InstallPackage, "intel-media-va-driver"));
        assert!(plan.contains(ActionKind::InstallPackage, "nvidia-driver-550"));
    }

    #[test]
    fn test_guest_tools_for_vmware() {
        let mut facts = bare_metal_facts();
        facts.virt = Virtualization::Vmware;
        let plan = compile(&BTreeSet::new(), &facts);
        assert!(plan.contains(ActionKind::InstallPackage, "open-vm-tools"));
    }

    #[test]
    fn test_no_guest_tools_on_bare_metal() {
        let plan = compile(&BTreeSet::new(), &bare_metal_facts());
        assert!(!plan.contains(ActionKind::InstallPackage, "open-vm-tools"));
        assert!(!plan.contains(ActionKind::InstallPackage, "qemu-guest-agent"));
    }

    #[test]
    fn test_remote_stack_enables_ssh_service() {
        let plan = compile(&select(&[StackId::Remote]), &bare_metal_facts());
        assert!(plan.contains(ActionKind::InstallPackage, "openssh-server"));
        assert!(plan.contains(ActionKind::EnableService, "ssh"));
        assert!(plan.contains(
            ActionKind::ApplyConfigTemplate,
            "/etc/ssh/sshd_config.d/60-deskforge.conf"
        ));
    }

    #[test]
    fn test_compile_is_deterministic() {
        let selected = select(&[StackId::Gaming, StackId::Monitoring, StackId::Backups]);
        let mut facts = bare_metal_facts();
        facts.gpus.insert(GpuVendor::Amd);
        facts.virt = Virtualization::Kvm;

        let a = compile(&selected, &facts);
        let b = compile(&selected, &facts);
        let render_a: Vec<String> = a.iter().map(|x| x.to_string()).collect();
        let render_b: Vec<String> = b.iter().map(|x| x.to_string()).collect();
        assert_eq!(render_a, render_b);
    }

    #[test]
    fn test_no_duplicate_kind_target_pairs() {
        use strum::IntoEnumIterator;
        let selected: BTreeSet<StackId> = StackId::iter().collect();
        let mut facts = bare_metal_facts();
        facts.gpus.insert(GpuVendor::Amd);
        facts.gpus.insert(GpuVendor::Intel);
        facts.virt = Virtualization::Kvm;

        let plan = compile(&selected, &facts);
        let mut keys: Vec<(String, String)> = plan
            .iter()
            .map(|a| (format!("{:?}", a.kind()), a.target()))
            .collect();
        let before = keys.len();
        keys.sort();
        keys.dedup();
        assert_eq!(before, keys.len(), "plan contains duplicate (kind, target) pairs");
    }

    #[test]
    fn test_compile_apps_dedup_and_order() {
        let apps = compile_apps(&select(&[StackId::Office, StackId::Gaming]));
        assert!(apps.contains(&"org.onlyoffice.desktopeditors".to_string()));
        assert!(apps.contains(&"com.heroicgameslauncher.hgl".to_string()));
        let mut sorted = apps.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(apps.len(), sorted.len());
    }

    #[test]
    fn test_compile_extensions_for_monitoring() {
        let exts = compile_extensions(&select(&[StackId::Monitoring]));
        assert_eq!(exts.len(), 2);
        assert!(exts.contains(&"Vitals@CoreCoding.com".to_string()));
    }

    #[test]
    fn test_compile_extensions_empty_selection() {
        assert!(compile_extensions(&BTreeSet::new()).is_empty());
    }
}
