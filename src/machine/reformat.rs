//! Turns state/transition descriptions into a linked arena and a normalized table.
//!
//! Signatures are assigned here: a state's signature is its region prefix
//! followed by its local name, where the prefix of region `i` of an orthogonal
//! state is that state's signature with its last segment tagged `[i]`.
//! Transition sources and targets declared inside a region get the same prefix.

use super::transition::{TransitionEntry, TransitionTable};
use super::tree::{StateId, StateKind, StateNode, StateTree};
use crate::builder::states::{Shape, StateSpec, States};
use crate::builder::{BuildError, Transitions};
use crate::core::{Event, Segment, Signature};

pub(crate) fn reformat<E: Event, C: 'static>(
    states: States<E, C>,
    transitions: Transitions<E, C>,
) -> Result<(StateTree<E, C>, TransitionTable<E, C>), BuildError> {
    if states.is_empty() {
        return Err(BuildError::EmptyStates);
    }

    let mut pass = Reformat {
        nodes: Vec::new(),
        table: TransitionTable::new(),
    };
    let roots = pass.add_map(states, &[], None)?;
    pass.add_transitions(transitions, &[]);

    Ok((StateTree::from_nodes(pass.nodes, roots), pass.table))
}

struct Reformat<E: Event, C> {
    nodes: Vec<StateNode<E, C>>,
    table: TransitionTable<E, C>,
}

impl<E: Event, C: 'static> Reformat<E, C> {
    fn add_map(
        &mut self,
        states: States<E, C>,
        prefix: &[Segment],
        parent: Option<StateId>,
    ) -> Result<Vec<StateId>, BuildError> {
        states
            .entries
            .into_iter()
            .map(|(name, spec)| self.add_state(name, spec, prefix, parent))
            .collect()
    }

    fn add_state(
        &mut self,
        name: String,
        spec: StateSpec<E, C>,
        prefix: &[Segment],
        parent: Option<StateId>,
    ) -> Result<StateId, BuildError> {
        if name.is_empty() || name.contains(['.', '[', ']']) {
            return Err(BuildError::InvalidName { name });
        }
        let id = StateId(self.nodes.len());
        let signature = Signature::local(name).within(prefix);

        // Push first so the arena stays in pre-order; the kind is filled in
        // once the children exist.
        self.nodes.push(StateNode {
            id,
            signature: signature.clone(),
            kind: StateKind::Leaf,
            parent,
            on_enter: spec.on_enter,
            on_exit: spec.on_exit,
        });

        let kind = match spec.shape {
            Shape::Leaf => StateKind::Leaf,
            Shape::Composite(children) => StateKind::Composite {
                children: self.add_map(children, prefix, Some(id))?,
            },
            Shape::Orthogonal(regions) => {
                if regions.is_empty() {
                    return Err(BuildError::NoRegions {
                        state: signature.to_string(),
                    });
                }
                let mut roots = Vec::with_capacity(regions.len());
                for (index, region) in regions.into_iter().enumerate() {
                    let region_prefix = signature.region_prefix(index);
                    let ids = self.add_map(region.states, &region_prefix, Some(id))?;
                    let [root] = ids[..] else {
                        return Err(BuildError::RegionRoots {
                            state: signature.to_string(),
                            region: index,
                            found: ids.len(),
                        });
                    };
                    self.add_transitions(region.transitions, &region_prefix);
                    roots.push(root);
                }
                StateKind::Orthogonal { regions: roots }
            }
        };

        self.nodes[id.0].kind = kind;
        Ok(id)
    }

    fn add_transitions(&mut self, transitions: Transitions<E, C>, prefix: &[Segment]) {
        for (source, by_trigger) in transitions.entries {
            let source = source.within(prefix);
            for (trigger, transition) in by_trigger {
                self.table.insert(TransitionEntry {
                    source: source.clone(),
                    trigger,
                    transition: transition.map_targets(|target| target.within(prefix)),
                });
            }
        }
    }
}
