//! Finds the active states that respond to an event.

use crate::core::{Event, Trigger};
use crate::machine::{Branch, Machine, TransitionEntry};
use std::fmt;

/// The state selected to handle an event in one independent region, with the
/// transition it fires.
pub struct Response<'f, 'm, E: Event, C> {
    pub branch: &'f Branch,
    pub entry: &'m TransitionEntry<E, C>,
}

impl<E: Event, C> fmt::Debug for Response<'_, '_, E, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("state", &self.branch.state)
            .field("source", &self.entry.source.to_string())
            .field("trigger", &self.entry.trigger)
            .finish()
    }
}

/// Resolve which active states respond to `event`.
///
/// Depth-first and post-order: a branch is only asked when none of its
/// sub-branches responded, so the deepest responder wins. Regions of an
/// orthogonal state are explored independently, which is why the result can
/// hold several responses. Lookup is keyed by the event's exact kind;
/// declared subtypes only widen what a machine subscribes to on the bus.
pub fn respond<'f, 'm, E: Event, C: 'static>(
    machine: &'m Machine<E, C>,
    forest: &'f [Branch],
    event: &E,
    context: &C,
) -> Vec<Response<'f, 'm, E, C>> {
    forest
        .iter()
        .flat_map(|branch| respond_branch(machine, branch, event, context))
        .collect()
}

fn respond_branch<'f, 'm, E: Event, C: 'static>(
    machine: &'m Machine<E, C>,
    branch: &'f Branch,
    event: &E,
    context: &C,
) -> Vec<Response<'f, 'm, E, C>> {
    let deeper: Vec<_> = branch
        .children
        .iter()
        .flat_map(|child| respond_branch(machine, child, event, context))
        .collect();
    if !deeper.is_empty() {
        return deeper;
    }

    machine
        .transition(branch.state, Trigger::Event(event.kind()))
        .filter(|entry| entry.transition.permits(event, context))
        .map(|entry| vec![Response { branch, entry }])
        .unwrap_or_default()
}
