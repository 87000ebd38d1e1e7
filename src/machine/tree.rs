//! Arena-backed state hierarchy.
//!
//! States live in a flat vector in pre-order and refer to each other by
//! [`StateId`]. The arena is produced once by `reformat` and never mutated
//! afterwards.

use crate::core::{Action, Signature};
use std::collections::HashMap;
use std::fmt;

/// Stable index of a state inside its tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateId(pub(crate) usize);

impl StateId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Structural kind of a state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StateKind {
    Leaf,
    /// A single nested hierarchy, children in declaration order.
    Composite { children: Vec<StateId> },
    /// Independent regions, one sub-root per region in region order.
    Orthogonal { regions: Vec<StateId> },
}

/// A state in the arena.
pub struct StateNode<E, C> {
    pub id: StateId,
    pub signature: Signature,
    pub kind: StateKind,
    pub parent: Option<StateId>,
    /// Runs after the built-in enter.
    pub on_enter: Option<Action<E, C>>,
    /// Runs before the built-in exit.
    pub on_exit: Option<Action<E, C>>,
}

impl<E, C> StateNode<E, C> {
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, StateKind::Leaf)
    }

    pub fn is_composite(&self) -> bool {
        matches!(self.kind, StateKind::Composite { .. })
    }

    pub fn is_orthogonal(&self) -> bool {
        matches!(self.kind, StateKind::Orthogonal { .. })
    }

    /// Composite children or orthogonal region roots.
    pub fn children(&self) -> &[StateId] {
        match &self.kind {
            StateKind::Leaf => &[],
            StateKind::Composite { children } => children,
            StateKind::Orthogonal { regions } => regions,
        }
    }
}

impl<E, C> fmt::Debug for StateNode<E, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateNode")
            .field("id", &self.id)
            .field("signature", &self.signature.to_string())
            .field("kind", &self.kind)
            .field("parent", &self.parent)
            .finish()
    }
}

/// The state hierarchy of one machine.
///
/// `roots` holds every top-level state; the first one is the machine root
/// entered on start.
pub struct StateTree<E, C> {
    nodes: Vec<StateNode<E, C>>,
    roots: Vec<StateId>,
    index: HashMap<Signature, StateId>,
}

impl<E, C> StateTree<E, C> {
    /// Assemble a tree from pre-ordered nodes. When signatures collide the
    /// first node wins the lookup; the validator reports the duplicate.
    pub(crate) fn from_nodes(nodes: Vec<StateNode<E, C>>, roots: Vec<StateId>) -> Self {
        let mut index = HashMap::with_capacity(nodes.len());
        for node in &nodes {
            index.entry(node.signature.clone()).or_insert(node.id);
        }
        Self {
            nodes,
            roots,
            index,
        }
    }

    /// The machine root. Trees always hold at least one state.
    pub fn root(&self) -> StateId {
        self.roots[0]
    }

    pub fn roots(&self) -> &[StateId] {
        &self.roots
    }

    pub fn node(&self, id: StateId) -> &StateNode<E, C> {
        &self.nodes[id.0]
    }

    /// Every state, flattened in pre-order.
    pub fn nodes(&self) -> &[StateNode<E, C>] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn lookup(&self, signature: &Signature) -> Option<StateId> {
        self.index.get(signature).copied()
    }

    pub fn signature(&self, id: StateId) -> &Signature {
        &self.node(id).signature
    }

    pub fn parent(&self, id: StateId) -> Option<StateId> {
        self.node(id).parent
    }

    pub fn children(&self, id: StateId) -> &[StateId] {
        self.node(id).children()
    }

    /// States from the top-level ancestor down to `id`, inclusive.
    pub fn path_from_root(&self, id: StateId) -> Vec<StateId> {
        let mut path = vec![id];
        let mut current = self.parent(id);
        while let Some(parent) = current {
            path.push(parent);
            current = self.parent(parent);
        }
        path.reverse();
        path
    }

    /// True if `ancestor` is a strict ancestor of `descendant`.
    pub fn is_ancestor(&self, ancestor: StateId, descendant: StateId) -> bool {
        let mut current = self.parent(descendant);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.parent(parent);
        }
        false
    }

    /// Index of the region of orthogonal state `orthogonal` that contains `id`.
    pub fn region_of(&self, orthogonal: StateId, id: StateId) -> Option<usize> {
        let regions = match &self.node(orthogonal).kind {
            StateKind::Orthogonal { regions } => regions,
            _ => return None,
        };
        let path = self.path_from_root(id);
        let below = path
            .iter()
            .position(|&s| s == orthogonal)
            .and_then(|at| path.get(at + 1))?;
        regions.iter().position(|r| r == below)
    }
}

impl<E, C> fmt::Debug for StateTree<E, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateTree")
            .field("roots", &self.roots)
            .field("nodes", &self.nodes)
            .finish()
    }
}
