//! The static model of a state machine: state tree plus transition table.
//!
//! A [`Machine`] is built once from descriptions and never changes. Runtime
//! state (the active set and the user context) lives in the orchestrator.

mod active;
mod reformat;
mod transition;
mod tree;

pub use active::{ActiveSet, Branch};
pub use transition::{Transition, TransitionEntry, TransitionKind, TransitionTable};
pub use tree::{StateId, StateKind, StateNode, StateTree};

use crate::builder::{BuildError, States, Transitions};
use crate::core::{Event, Signature, Trigger};
use std::fmt;

/// Immutable state tree and transition table of one machine.
pub struct Machine<E: Event, C> {
    tree: StateTree<E, C>,
    table: TransitionTable<E, C>,
}

impl<E: Event, C: 'static> Machine<E, C> {
    /// Build the arena and the normalized table from descriptions.
    ///
    /// Structural problems that prevent building at all are returned as
    /// [`BuildError`]; everything else is left to the validator.
    pub fn build(states: States<E, C>, transitions: Transitions<E, C>) -> Result<Self, BuildError> {
        let (tree, table) = reformat::reformat(states, transitions)?;
        Ok(Self { tree, table })
    }
}

impl<E: Event, C> Machine<E, C> {
    pub fn tree(&self) -> &StateTree<E, C> {
        &self.tree
    }

    pub fn table(&self) -> &TransitionTable<E, C> {
        &self.table
    }

    /// Transition registered for `state` on `trigger`.
    pub fn transition(&self, state: StateId, trigger: Trigger<E::Kind>) -> Option<&TransitionEntry<E, C>> {
        self.table.get(self.tree.signature(state), trigger)
    }

    /// Look up a state by its signature.
    pub fn state(&self, signature: &Signature) -> Option<StateId> {
        self.tree.lookup(signature)
    }
}

impl<E: Event, C> fmt::Debug for Machine<E, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("states", &self.tree.len())
            .field("transitions", &self.table.len())
            .finish()
    }
}
