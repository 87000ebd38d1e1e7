//! The set of states a machine currently occupies.

use super::tree::{StateId, StateTree};
use crate::core::Signature;
use std::collections::BTreeSet;

/// Ancestor-closed set of active states.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActiveSet {
    states: BTreeSet<StateId>,
}

impl ActiveSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: StateId) -> bool {
        self.states.contains(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = StateId> + '_ {
        self.states.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub(crate) fn insert(&mut self, id: StateId) {
        self.states.insert(id);
    }

    pub(crate) fn remove(&mut self, id: StateId) {
        self.states.remove(&id);
    }

    /// Signatures of the active states, sorted.
    pub fn signatures<E, C>(&self, tree: &StateTree<E, C>) -> Vec<Signature> {
        let mut signatures: Vec<_> = self.iter().map(|id| tree.signature(id).clone()).collect();
        signatures.sort();
        signatures
    }

    /// Active states that are leaves of the active forest.
    pub fn leaves<E, C>(&self, tree: &StateTree<E, C>) -> Vec<StateId> {
        self.iter()
            .filter(|&id| !tree.children(id).iter().any(|&c| self.contains(c)))
            .collect()
    }

    /// Reshape the set into a forest rooted at the active top-level states.
    pub fn forest<E, C>(&self, tree: &StateTree<E, C>) -> Vec<Branch> {
        tree.roots()
            .iter()
            .filter(|&&root| self.contains(root))
            .map(|&root| self.branch(tree, root))
            .collect()
    }

    /// The active sub-tree rooted at `state`.
    pub fn branch<E, C>(&self, tree: &StateTree<E, C>, state: StateId) -> Branch {
        Branch {
            state,
            children: tree
                .children(state)
                .iter()
                .filter(|&&child| self.contains(child))
                .map(|&child| self.branch(tree, child))
                .collect(),
        }
    }
}

impl FromIterator<StateId> for ActiveSet {
    fn from_iter<I: IntoIterator<Item = StateId>>(iter: I) -> Self {
        Self {
            states: iter.into_iter().collect(),
        }
    }
}

/// One active state with its active sub-branches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Branch {
    pub state: StateId,
    pub children: Vec<Branch>,
}

impl Branch {
    /// States of this branch, children before parents.
    pub fn postorder(&self) -> Vec<StateId> {
        let mut out = Vec::new();
        self.collect_postorder(&mut out);
        out
    }

    fn collect_postorder(&self, out: &mut Vec<StateId>) {
        for child in &self.children {
            child.collect_postorder(out);
        }
        out.push(self.state);
    }
}
