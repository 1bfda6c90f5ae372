//! Coverage audit: which actions are exercised by at least one runnable
//! test anywhere in the registry.
//!
//! An action counts as tested when it is invoked anywhere in the
//! sequence of a non-disabled test, its own or another action's.
//! Fixture expansions do not count; disabled tests contribute nothing.

use std::collections::BTreeSet;

use vfd_registry::{Action, Prereq};

/// Names of actions no runnable test invokes, in registry order.
pub fn untested_actions(registry: &[Action]) -> Vec<&'static str> {
    let mut tested: BTreeSet<&str> = BTreeSet::new();
    for action in registry {
        for test in action.tests {
            if test.prereq == Prereq::Disabled {
                continue;
            }
            for call in test.assert.seq() {
                tested.insert(call.action);
            }
        }
    }
    registry
        .iter()
        .map(|a| a.name)
        .filter(|name| !tested.contains(name))
        .collect()
}
