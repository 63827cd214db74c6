//! Command-line surface.
//!
//! Thin by design: the provisioning core is driven entirely through
//! `apply`, with `plan`, `detect` and `list-stacks` as read-only helpers.
//! Exit code is 0 whenever the executor phases complete, regardless of
//! per-item outcomes; only an aborting precondition failure is non-zero.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::stacks::StackId;
use crate::types::BootMode;

/// deskforge - declarative stack provisioning for Ubuntu desktops
#[derive(Parser)]
#[command(name = "deskforge")]
#[command(about = "Provision an Ubuntu desktop from declarative feature stacks")]
#[command(version)]
pub struct Cli {
    /// Dry-run mode: show what would be applied without making changes.
    ///
    /// Read-only probes (environment classification, ESP inspection) still
    /// execute so the preview is realistic; every mutating item is
    /// reported as skipped.
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Apply the selected stacks to this machine
    Apply {
        /// Comma-separated stack names (see list-stacks)
        #[arg(short, long, value_delimiter = ',', required = true)]
        stacks: Vec<StackId>,

        /// Configure the boot manager with this presentation mode
        #[arg(long)]
        boot_mode: Option<BootMode>,

        /// Mount point of the EFI system partition
        #[arg(long, default_value = "/boot/efi")]
        esp: PathBuf,

        /// Per-command timeout in seconds for external tools
        #[arg(long, default_value_t = 600)]
        timeout: u64,

        /// Shell major version hint for extension metadata lookups
        #[arg(long, default_value = "46")]
        shell_version: String,
    },
    /// Compile and print the plan without applying anything
    Plan {
        /// Comma-separated stack names (see list-stacks)
        #[arg(short, long, value_delimiter = ',', required = true)]
        stacks: Vec<StackId>,
    },
    /// Print the classified environment facts
    Detect,
    /// List the available stacks
    ListStacks,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_parses_stack_list() {
        let cli = Cli::parse_from(["deskforge", "apply", "--stacks", "gaming,office"]);
        match cli.command {
            Commands::Apply { stacks, boot_mode, .. } => {
                assert_eq!(stacks, vec![StackId::Gaming, StackId::Office]);
                assert!(boot_mode.is_none());
            }
            _ => panic!("expected apply"),
        }
    }

    #[test]
    fn test_apply_parses_boot_mode() {
        let cli = Cli::parse_from([
            "deskforge", "apply", "--stacks", "gaming", "--boot-mode", "dual",
        ]);
        match cli.command {
            Commands::Apply { boot_mode, esp, .. } => {
                assert_eq!(boot_mode, Some(BootMode::Dual));
                assert_eq!(esp, PathBuf::from("/boot/efi"));
            }
            _ => panic!("expected apply"),
        }
    }

    #[test]
    fn test_unknown_stack_is_rejected() {
        assert!(Cli::try_parse_from(["deskforge", "apply", "--stacks", "bogus"]).is_err());
    }

    #[test]
    fn test_global_dry_run_flag() {
        let cli = Cli::parse_from(["deskforge", "--dry-run", "detect"]);
        assert!(cli.dry_run);
    }
}
