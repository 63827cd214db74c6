//! deskforge library
//!
//! Declarative stack-to-action provisioning for Ubuntu desktops: classify
//! the environment, compile selected stacks into a deduplicated plan,
//! reconcile desktop-shell extension state, generate boot configuration
//! with mode degradation, and apply everything through narrow external
//! collaborator interfaces.

pub mod bootcfg;
pub mod cli;
pub mod compiler;
pub mod environment;
pub mod error;
pub mod executor;
pub mod plan;
pub mod reconciler;
pub mod stacks;
pub mod system;
pub mod types;

// Re-export the main types for convenience
pub use bootcfg::{BootLoaderPresence, GeneratedBootConfig, generate};
pub use compiler::{compile, compile_apps, compile_extensions};
pub use environment::EnvironmentFacts;
pub use error::{DeskforgeError, Result};
pub use executor::{BootRequest, Collaborators, Executor, Outcome, ReportItem, RunReport};
pub use plan::{Action, ActionKind, Plan};
pub use reconciler::{ExtensionDirectives, reconcile};
pub use stacks::StackId;
pub use types::{BootMode, FirmwareMode, GpuVendor, Virtualization};
