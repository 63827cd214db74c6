//! Action plan types.
//!
//! An `Action` is one declarative provisioning step; a `Plan` is an ordered,
//! deduplicated sequence of them. The tagged union replaces the source
//! tradition of echoing package names into parallel shell arrays — every
//! action carries its kind and target explicitly and is immutable once
//! constructed.
//!
//! # Invariant
//!
//! A `Plan` never contains two actions with the same `(kind, target)` pair,
//! no matter how many stacks contributed the same entry. First-seen order is
//! preserved so install order is stable across runs with identical input.

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

/// One declarative provisioning step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Install a package through the system package manager.
    InstallPackage(String),
    /// Enable (and start) a systemd unit.
    EnableService(String),
    /// Render a named config template to a destination path.
    ApplyConfigTemplate { template: String, dest: PathBuf },
}

/// Discriminant of an `Action`, used for dedup keys and report grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    InstallPackage,
    EnableService,
    ApplyConfigTemplate,
}

impl Action {
    /// The action's kind discriminant.
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::InstallPackage(_) => ActionKind::InstallPackage,
            Action::EnableService(_) => ActionKind::EnableService,
            Action::ApplyConfigTemplate { .. } => ActionKind::ApplyConfigTemplate,
        }
    }

    /// The target the action operates on.
    ///
    /// For templates the target is the destination path: two stacks writing
    /// different templates to the same file would otherwise race, so the
    /// first-seen one wins.
    pub fn target(&self) -> String {
        match self {
            Action::InstallPackage(name) | Action::EnableService(name) => name.clone(),
            Action::ApplyConfigTemplate { dest, .. } => dest.display().to_string(),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::InstallPackage(name) => write!(f, "install {}", name),
            Action::EnableService(name) => write!(f, "enable {}", name),
            Action::ApplyConfigTemplate { template, dest } => {
                write!(f, "apply {} -> {}", template, dest.display())
            }
        }
    }
}

/// Ordered, deduplicated action sequence.
#[derive(Debug, Default, Clone)]
pub struct Plan {
    actions: Vec<Action>,
    seen: HashSet<(ActionKind, String)>,
}

impl Plan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an action unless its `(kind, target)` was already planned.
    ///
    /// Returns true when the action was actually added. The union is
    /// monotonic: nothing is ever removed from a plan.
    pub fn push(&mut self, action: Action) -> bool {
        let key = (action.kind(), action.target());
        if self.seen.contains(&key) {
            log::debug!("Plan already contains {} — skipping duplicate", action);
            return false;
        }
        self.seen.insert(key);
        self.actions.push(action);
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Package names in plan order.
    pub fn packages(&self) -> Vec<&str> {
        self.actions
            .iter()
            .filter_map(|a| match a {
                Action::InstallPackage(name) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Service names in plan order.
    pub fn services(&self) -> Vec<&str> {
        self.actions
            .iter()
            .filter_map(|a| match a {
                Action::EnableService(name) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Template directives in plan order.
    pub fn templates(&self) -> Vec<(&str, &PathBuf)> {
        self.actions
            .iter()
            .filter_map(|a| match a {
                Action::ApplyConfigTemplate { template, dest } => {
                    Some((template.as_str(), dest))
                }
                _ => None,
            })
            .collect()
    }

    /// True if the plan contains an action with this kind and target.
    pub fn contains(&self, kind: ActionKind, target: &str) -> bool {
        self.seen.contains(&(kind, target.to_string()))
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for action in &self.actions {
            writeln!(f, "{}", action)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_dedupes_by_kind_and_target() {
        let mut plan = Plan::new();
        assert!(plan.push(Action::InstallPackage("htop".into())));
        assert!(!plan.push(Action::InstallPackage("htop".into())));
        assert_eq!(plan.len(), 1);
    }

    #[test]
    fn test_same_target_different_kind_is_not_a_duplicate() {
        let mut plan = Plan::new();
        assert!(plan.push(Action::InstallPackage("ssh".into())));
        assert!(plan.push(Action::EnableService("ssh".into())));
        assert_eq!(plan.len(), 2);
    }

    #[test]
    fn test_first_seen_order_preserved() {
        let mut plan = Plan::new();
        plan.push(Action::InstallPackage("b".into()));
        plan.push(Action::InstallPackage("a".into()));
        plan.push(Action::InstallPackage("b".into()));
        assert_eq!(plan.packages(), vec!["b", "a"]);
    }

    #[test]
    fn test_template_dedup_keys_on_destination() {
        let mut plan = Plan::new();
        assert!(plan.push(Action::ApplyConfigTemplate {
            template: "a.conf".into(),
            dest: PathBuf::from("/etc/x.conf"),
        }));
        // Different template, same destination: first wins
        assert!(!plan.push(Action::ApplyConfigTemplate {
            template: "b.conf".into(),
            dest: PathBuf::from("/etc/x.conf"),
        }));
        assert_eq!(plan.templates().len(), 1);
        assert_eq!(plan.templates()[0].0, "a.conf");
    }

    #[test]
    fn test_accessors_partition_by_kind() {
        let mut plan = Plan::new();
        plan.push(Action::InstallPackage("htop".into()));
        plan.push(Action::EnableService("smartd".into()));
        plan.push(Action::ApplyConfigTemplate {
            template: "smartd.conf".into(),
            dest: PathBuf::from("/etc/smartd.conf"),
        });

        assert_eq!(plan.packages(), vec!["htop"]);
        assert_eq!(plan.services(), vec!["smartd"]);
        assert_eq!(plan.templates().len(), 1);
        assert!(plan.contains(ActionKind::EnableService, "smartd"));
        assert!(!plan.contains(ActionKind::InstallPackage, "smartd"));
    }

    #[test]
    fn test_display_lists_actions() {
        let mut plan = Plan::new();
        plan.push(Action::InstallPackage("htop".into()));
        plan.push(Action::EnableService("ssh".into()));
        let text = plan.to_string();
        assert!(text.contains("install htop"));
        assert!(text.contains("enable ssh"));
    }
}
