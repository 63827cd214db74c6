//! Boot configuration generation.
//!
//! Takes the requested boot-presentation mode and the loaders actually
//! present on the EFI system partition, degrades the mode through a fixed
//! fallback chain, and emits the matching boot-manager configuration text.
//!
//! # Degradation chain
//!
//! The chain is deterministic, total and one-directional:
//!
//! - `Dual` without a secondary (Windows) loader degrades to `Single`
//! - `Single` without the primary (distro) loader degrades to `ShowAll`
//! - `ShowAll` never degrades, and no mode is ever upgraded back up
//!
//! A degraded mode is not an error — the executor surfaces it in the run
//! report so the user learns which mode actually took effect.
//!
//! # Purity
//!
//! `generate` returns text; it writes nothing. The executor owns the write
//! (with a timestamped backup of any prior file), which keeps this module
//! side-effect-free and independently testable. Loader presence is re-read
//! on every probe since it can change between runs (Windows installed
//! later, for instance).

use crate::types::BootMode;
use std::path::Path;

/// Loaders observed on the EFI system partition at generation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootLoaderPresence {
    /// The distro's own loader (shim or GRUB under `EFI/ubuntu/`).
    pub has_primary_os_loader: bool,
    /// The Windows boot manager (`EFI/Microsoft/Boot/bootmgfw.efi`).
    pub has_secondary_os_loader: bool,
}

impl BootLoaderPresence {
    /// Probe an ESP root for known loaders. Never cached.
    pub fn probe(esp: &Path) -> Self {
        let primary = ["EFI/ubuntu/shimx64.efi", "EFI/ubuntu/grubx64.efi"]
            .iter()
            .any(|rel| esp.join(rel).is_file());
        let secondary = esp.join("EFI/Microsoft/Boot/bootmgfw.efi").is_file();

        log::info!(
            "ESP probe at {}: primary={}, secondary={}",
            esp.display(),
            primary,
            secondary
        );

        Self {
            has_primary_os_loader: primary,
            has_secondary_os_loader: secondary,
        }
    }
}

/// Result of boot configuration generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedBootConfig {
    /// The mode that actually took effect after degradation.
    pub effective: BootMode,
    /// Full configuration file text for the effective mode.
    pub config_text: String,
}

impl GeneratedBootConfig {
    /// True when the effective mode differs from what was requested.
    pub fn degraded_from(&self, requested: BootMode) -> bool {
        self.effective != requested
    }
}

/// Generate the boot-manager configuration for a requested mode.
///
/// Every input maps to exactly one effective mode; the templates are fixed
/// and substitute nothing per-host beyond menu-entry visibility.
pub fn generate(requested: BootMode, presence: BootLoaderPresence) -> GeneratedBootConfig {
    let mut effective = requested;

    if effective == BootMode::Dual && !presence.has_secondary_os_loader {
        log::warn!("Dual mode requested but no secondary OS loader found — degrading to single");
        effective = BootMode::Single;
    }
    if effective == BootMode::Single && !presence.has_primary_os_loader {
        log::warn!("No primary OS loader found — degrading to show-all");
        effective = BootMode::ShowAll;
    }

    let config_text = template_for(effective).to_string();

    if effective != requested {
        log::info!("Boot mode degraded: requested {}, effective {}", requested, effective);
    }

    GeneratedBootConfig { effective, config_text }
}

/// Fixed configuration template per effective mode.
fn template_for(mode: BootMode) -> &'static str {
    match mode {
        BootMode::Single => {
            "# deskforge boot configuration (single)\n\
             timeout 0\n\
             scanfor manual\n\
             \n\
             menuentry \"Ubuntu\" {\n\
             \tloader /EFI/ubuntu/shimx64.efi\n\
             }\n"
        }
        BootMode::Dual => {
            "# deskforge boot configuration (dual)\n\
             timeout 10\n\
             scanfor manual\n\
             default_selection Ubuntu\n\
             \n\
             menuentry \"Ubuntu\" {\n\
             \tloader /EFI/ubuntu/shimx64.efi\n\
             }\n\
             \n\
             menuentry \"Windows\" {\n\
             \tloader /EFI/Microsoft/Boot/bootmgfw.efi\n\
             }\n"
        }
        BootMode::ShowAll => {
            "# deskforge boot configuration (show-all)\n\
             timeout 20\n\
             scanfor internal,external,optical,manual\n"
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn presence(primary: bool, secondary: bool) -> BootLoaderPresence {
        BootLoaderPresence {
            has_primary_os_loader: primary,
            has_secondary_os_loader: secondary,
        }
    }

    #[test]
    fn test_dual_without_secondary_degrades_to_single() {
        let generated = generate(BootMode::Dual, presence(true, false));
        assert_eq!(generated.effective, BootMode::Single);
        assert!(generated.degraded_from(BootMode::Dual));
    }

    #[test]
    fn test_dual_without_any_loader_degrades_to_show_all() {
        let generated = generate(BootMode::Dual, presence(false, false));
        assert_eq!(generated.effective, BootMode::ShowAll);
    }

    #[test]
    fn test_single_without_primary_degrades_to_show_all() {
        let generated = generate(BootMode::Single, presence(false, true));
        assert_eq!(generated.effective, BootMode::ShowAll);
    }

    #[test]
    fn test_show_all_never_degrades() {
        for (p, s) in [(false, false), (true, false), (false, true), (true, true)] {
            let generated = generate(BootMode::ShowAll, presence(p, s));
            assert_eq!(generated.effective, BootMode::ShowAll);
        }
    }

    #[test]
    fn test_dual_with_both_loaders_stays_dual() {
        let generated = generate(BootMode::Dual, presence(true, true));
        assert_eq!(generated.effective, BootMode::Dual);
        assert!(!generated.degraded_from(BootMode::Dual));
    }

    #[test]
    fn test_no_upgrade_from_single() {
        // Both loaders present must not escalate single back to dual
        let generated = generate(BootMode::Single, presence(true, true));
        assert_eq!(generated.effective, BootMode::Single);
    }

    #[test]
    fn test_templates_match_mode() {
        assert!(generate(BootMode::Single, presence(true, true))
            .config_text
            .contains("(single)"));
        assert!(generate(BootMode::Dual, presence(true, true))
            .config_text
            .contains("bootmgfw.efi"));
        assert!(generate(BootMode::ShowAll, presence(true, true))
            .config_text
            .contains("scanfor internal"));
    }

    #[test]
    fn test_generation_is_deterministic() {
        let a = generate(BootMode::Dual, presence(true, true));
        let b = generate(BootMode::Dual, presence(true, true));
        assert_eq!(a, b);
    }

    #[test]
    fn test_probe_empty_esp() {
        let tmp = TempDir::new().unwrap();
        let p = BootLoaderPresence::probe(tmp.path());
        assert!(!p.has_primary_os_loader);
        assert!(!p.has_secondary_os_loader);
    }

    #[test]
    fn test_probe_finds_loaders() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("EFI/ubuntu")).unwrap();
        fs::write(tmp.path().join("EFI/ubuntu/shimx64.efi"), b"efi").unwrap();
        fs::create_dir_all(tmp.path().join("EFI/Microsoft/Boot")).unwrap();
        fs::write(tmp.path().join("EFI/Microsoft/Boot/bootmgfw.efi"), b"efi").unwrap();

        let p = BootLoaderPresence::probe(tmp.path());
        assert!(p.has_primary_os_loader);
        assert!(p.has_secondary_os_loader);
    }

    #[test]
    fn test_probe_grub_counts_as_primary() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("EFI/ubuntu")).unwrap();
        fs::write(tmp.path().join("EFI/ubuntu/grubx64.efi"), b"efi").unwrap();

        let p = BootLoaderPresence::probe(tmp.path());
        assert!(p.has_primary_os_loader);
        assert!(!p.has_secondary_os_loader);
    }
}
