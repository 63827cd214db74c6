//! deskforge - Main entry point
//!
//! Thin dispatcher over the provisioning core: parse the CLI, classify the
//! environment, compile the plan and hand it to the executor. Exit code 0
//! on any completed run (per-item failures included); non-zero only for
//! aborting precondition failures.

use log::{debug, error, info};
use std::collections::BTreeSet;
use std::time::Duration;

use deskforge::cli::{Cli, Commands};
use deskforge::executor::{BootRequest, Collaborators, Executor};
use deskforge::reconciler::ExtensionDirectives;
use deskforge::stacks::StackId;
use deskforge::system::bootloader::RefindInstaller;
use deskforge::system::firmware::FwupdService;
use deskforge::system::flatpak::FlatpakInstaller;
use deskforge::system::gsettings::GsettingsStore;
use deskforge::system::package::AptBackend;
use deskforge::system::service::SystemdServiceManager;
use deskforge::system::shell_ext::{EgoClient, GnomeExtensionLoader};
use deskforge::{EnvironmentFacts, compile, compile_apps, compile_extensions};
use strum::IntoEnumIterator;

/// Initialize the logger with appropriate settings
fn init_logger() {
    use env_logger::Builder;
    use std::io::Write;

    Builder::from_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}:{}] {}",
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .filter_level(log::LevelFilter::Info)
        .parse_default_env() // Allows RUST_LOG env var to override
        .init();
}

/// Main application entry point
fn main() {
    init_logger();
    info!("deskforge starting up");

    let cli = Cli::parse_args();
    debug!("CLI arguments parsed");

    match cli.command {
        Commands::Apply {
            stacks,
            boot_mode,
            esp,
            timeout,
            shell_version,
        } => {
            let selected: BTreeSet<StackId> = stacks.into_iter().collect();
            if let Err(e) = run_apply(
                &selected,
                boot_mode.map(|mode| BootRequest { mode, esp }),
                Duration::from_secs(timeout),
                &shell_version,
                cli.dry_run,
            ) {
                error!("Run aborted: {}", e);
                eprintln!("✗ {}", e);
                std::process::exit(1);
            }
        }
        Commands::Plan { stacks } => {
            let selected: BTreeSet<StackId> = stacks.into_iter().collect();
            let facts = EnvironmentFacts::classify();
            let plan = compile(&selected, &facts);
            println!("# environment: {}", facts);
            print!("{}", plan);
            for app in compile_apps(&selected) {
                println!("flatpak {}", app);
            }
            for ext in compile_extensions(&selected) {
                println!("extension {}", ext);
            }
        }
        Commands::Detect => {
            let facts = EnvironmentFacts::classify();
            println!("{}", facts);
        }
        Commands::ListStacks => {
            for stack in StackId::iter() {
                println!("{:<12} {}", stack.to_string(), stack.description());
            }
        }
    }
}

/// Wire up the real collaborators and run the executor phases.
fn run_apply(
    selected: &BTreeSet<StackId>,
    boot: Option<BootRequest>,
    timeout: Duration,
    shell_version: &str,
    dry_run: bool,
) -> deskforge::Result<()> {
    let facts = EnvironmentFacts::classify();
    let plan = compile(selected, &facts);
    let apps = compile_apps(selected);
    let directives = ExtensionDirectives {
        to_enable: compile_extensions(selected).into_iter().collect(),
        to_disable: BTreeSet::new(),
    };

    let packages = AptBackend::new(timeout);
    let flatpak = FlatpakInstaller::new(timeout);
    let services = SystemdServiceManager::new(timeout);
    let store = GsettingsStore::new(timeout);
    let loader = GnomeExtensionLoader::new(timeout);
    let metadata = EgoClient::new(timeout)
        .map_err(deskforge::DeskforgeError::general)?;
    let bootloader = RefindInstaller::new(timeout);
    let firmware = FwupdService::new(timeout);

    if !dry_run {
        // Refresh the package index once; a stale index fails per-item later
        if let Err(e) = packages.update_index() {
            log::warn!("package index refresh failed: {}", e);
        }
    }

    let executor = Executor::new(
        Collaborators {
            packages: &packages,
            apps: &flatpak,
            services: &services,
            store: &store,
            loader: &loader,
            metadata: &metadata,
            bootloader: &bootloader,
            firmware: &firmware,
        },
        &facts,
        shell_version,
    )
    .dry_run(dry_run);

    let report = executor.run(&plan, &apps, &directives, boot.as_ref())?;
    println!("{}", report);

    if report.failed_count() > 0 {
        info!("Completed with {} failed item(s)", report.failed_count());
    }
    Ok(())
}
