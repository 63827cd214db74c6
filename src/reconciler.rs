//! Extension state reconciler.
//!
//! The desktop shell persists two sets of extension identifiers — enabled
//! and disabled — and this tool is not their only writer: the shell itself
//! toggles extensions between runs. The reconciler therefore never mutates
//! in place. It takes the current persisted pair plus the desired
//! enable/disable lists and computes a fresh pair; the executor reads
//! before and writes after, keeping this logic pure and independently
//! testable.
//!
//! # Algorithm
//!
//! 1. `new_enabled = current_enabled ∪ to_enable`
//! 2. `after_removal = current_disabled \ to_enable` — a stale disable entry
//!    never survives an explicit enable
//! 3. `new_disabled = after_removal ∪ to_disable`
//! 4. Final pass: any `to_enable` member that slipped back in through
//!    `to_disable` is removed from the disabled side. Enable wins; an ID in
//!    both input lists is a caller contract violation, but the output is
//!    still consistent.
//!
//! # Guarantees
//!
//! - Output sets are disjoint for all inputs, adversarial ones included —
//!   a corrupted pre-existing overlap (an ID persisted in both sets)
//!   resolves toward enabled, consistent with the enable-wins tie-break
//! - Idempotent: feeding the output back as current state with the same
//!   desired lists changes nothing
//! - Never shrinks the enabled set for identifiers outside `to_disable`

use std::collections::BTreeSet;

/// Desired extension changes for one run.
#[derive(Debug, Clone, Default)]
pub struct ExtensionDirectives {
    /// Extensions to end up enabled.
    pub to_enable: BTreeSet<String>,
    /// Extensions to end up disabled.
    pub to_disable: BTreeSet<String>,
}

/// Compute new enabled/disabled sets from the persisted state and the
/// desired changes.
///
/// Pure set algebra — no I/O. See the module docs for the normative steps.
pub fn reconcile(
    current_enabled: &BTreeSet<String>,
    current_disabled: &BTreeSet<String>,
    to_enable: &BTreeSet<String>,
    to_disable: &BTreeSet<String>,
) -> (BTreeSet<String>, BTreeSet<String>) {
    // Step 1: enable everything requested, keep everything already enabled
    let mut new_enabled: BTreeSet<String> =
        current_enabled.union(to_enable).cloned().collect();

    // Step 2: an explicit enable clears a stale disable entry
    let after_removal: BTreeSet<String> =
        current_disabled.difference(to_enable).cloned().collect();

    // Step 3: add the requested disables
    let mut new_disabled: BTreeSet<String> =
        after_removal.union(to_disable).cloned().collect();

    // Step 4: enable wins over a conflicting disable request
    new_disabled.retain(|id| !to_enable.contains(id));

    // Disabling something also means it must not stay enabled; anything
    // still enabled (including a corrupted overlap persisted in both sets)
    // wins over a stale disabled entry
    new_enabled.retain(|id| !to_disable.contains(id) || to_enable.contains(id));
    new_disabled.retain(|id| !new_enabled.contains(id));

    debug_assert!(
        new_enabled.is_disjoint(&new_disabled),
        "reconcile produced overlapping sets"
    );

    (new_enabled, new_disabled)
}
