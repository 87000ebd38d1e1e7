//! Independent structural checks over a built machine.
//!
//! Each rule is total: it never assumes another rule passed, and where two
//! rules could see the same fault only one of them reports it.

use super::defects::Defect;
use crate::core::{Event, Signature, Trigger};
use crate::machine::{Machine, Transition, TransitionEntry, TransitionKind};
use std::collections::{BTreeMap, VecDeque};
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

/// A single validation rule.
pub type Rule<E, C> = fn(&Machine<E, C>) -> Validation<(), NonEmptyVec<Defect>>;

/// Every rule, in reporting order.
pub fn all<E: Event, C: 'static>() -> Vec<Rule<E, C>> {
    vec![
        unreachable_states,
        duplicate_signatures,
        unknown_sources,
        unknown_targets,
        missing_initials,
        invalid_initials,
        invalid_locals,
        invalid_choices,
    ]
}

fn accumulate(defects: Vec<Defect>) -> Validation<(), NonEmptyVec<Defect>> {
    let checks: Vec<Validation<(), NonEmptyVec<Defect>>> =
        defects.into_iter().map(Validation::fail).collect();
    Validation::all_vec(checks).map(|_| ())
}

fn describe<E: Event, C>(entry: &TransitionEntry<E, C>) -> (String, String) {
    (entry.source.to_string(), entry.trigger.to_string())
}

/// States not reachable from the root through structure or transitions.
pub fn unreachable_states<E: Event, C: 'static>(machine: &Machine<E, C>) -> Validation<(), NonEmptyVec<Defect>> {
    let tree = machine.tree();
    let mut visited = vec![false; tree.len()];
    let mut queue = VecDeque::from([tree.root()]);

    while let Some(state) = queue.pop_front() {
        if std::mem::replace(&mut visited[state.index()], true) {
            continue;
        }
        queue.extend(tree.children(state).iter().copied());
        for entry in machine.table().outgoing(tree.signature(state)) {
            queue.extend(
                entry
                    .transition
                    .targets()
                    .into_iter()
                    .filter_map(|target| tree.lookup(target)),
            );
        }
    }

    accumulate(
        tree.nodes()
            .iter()
            .filter(|node| !visited[node.id.index()])
            .map(|node| Defect::Unreachable {
                state: node.signature.to_string(),
            })
            .collect(),
    )
}

/// Signatures shared by more than one state.
pub fn duplicate_signatures<E: Event, C: 'static>(machine: &Machine<E, C>) -> Validation<(), NonEmptyVec<Defect>> {
    let mut counts: BTreeMap<&Signature, usize> = BTreeMap::new();
    for node in machine.tree().nodes() {
        *counts.entry(&node.signature).or_default() += 1;
    }

    accumulate(
        counts
            .into_iter()
            .filter(|&(_, count)| count > 1)
            .map(|(signature, count)| Defect::DuplicateSignature {
                signature: signature.to_string(),
                count,
            })
            .collect(),
    )
}

/// Table entries whose source names no state.
pub fn unknown_sources<E: Event, C: 'static>(machine: &Machine<E, C>) -> Validation<(), NonEmptyVec<Defect>> {
    let tree = machine.tree();
    accumulate(
        machine
            .table()
            .iter()
            .filter(|entry| tree.lookup(&entry.source).is_none())
            .map(|entry| {
                let (origin, trigger) = describe(entry);
                Defect::UnknownSource { origin, trigger }
            })
            .collect(),
    )
}

/// External and local transitions whose target names no state.
///
/// Choice targets are covered by [`invalid_choices`].
pub fn unknown_targets<E: Event, C: 'static>(machine: &Machine<E, C>) -> Validation<(), NonEmptyVec<Defect>> {
    let tree = machine.tree();
    let mut defects = Vec::new();
    for entry in machine.table().iter() {
        let target = match &entry.transition {
            Transition::External { target, .. } | Transition::Local { target, .. } => target,
            _ => continue,
        };
        if tree.lookup(target).is_none() {
            let (origin, trigger) = describe(entry);
            defects.push(Defect::UnknownTarget {
                origin,
                trigger,
                target: target.to_string(),
            });
        }
    }
    accumulate(defects)
}

/// Composite states without an initial transition.
pub fn missing_initials<E: Event, C: 'static>(machine: &Machine<E, C>) -> Validation<(), NonEmptyVec<Defect>> {
    let tree = machine.tree();
    accumulate(
        tree.nodes()
            .iter()
            .filter(|node| node.is_composite())
            .filter(|node| {
                machine
                    .table()
                    .get(&node.signature, Trigger::Initial)
                    .is_none()
            })
            .map(|node| Defect::MissingInitial {
                state: node.signature.to_string(),
            })
            .collect(),
    )
}

/// Initial transitions that are local or internal, guarded, self-targeting,
/// or that lead outside their state.
///
/// Targets that do not exist are left to [`unknown_targets`] and
/// [`invalid_choices`].
pub fn invalid_initials<E: Event, C: 'static>(machine: &Machine<E, C>) -> Validation<(), NonEmptyVec<Defect>> {
    let tree = machine.tree();
    let mut defects = Vec::new();

    for entry in machine.table().iter() {
        if entry.trigger != Trigger::Initial {
            continue;
        }
        let Some(state) = tree.lookup(&entry.source) else {
            continue;
        };
        let mut invalid = |reason: String| {
            defects.push(Defect::InvalidInitial {
                state: entry.source.to_string(),
                reason,
            })
        };

        let transition = &entry.transition;
        match transition.kind() {
            TransitionKind::Local | TransitionKind::Internal => {
                invalid(format!("{} transitions cannot be initial", transition.kind()));
                continue;
            }
            TransitionKind::Choice if matches!(transition, Transition::Choice { default: None, .. }) => {
                invalid("choice has no default".into());
            }
            _ => {}
        }
        if transition.guard().is_some() {
            invalid("initial transitions cannot be guarded".into());
        }
        for target in transition.targets() {
            if *target == entry.source {
                invalid("targets its own state".into());
            } else if let Some(target_id) = tree.lookup(target) {
                if !tree.is_ancestor(state, target_id) {
                    invalid(format!("'{target}' is not a descendant"));
                }
            }
        }
    }
    accumulate(defects)
}

/// Local transitions that are self-loops or connect unrelated states.
pub fn invalid_locals<E: Event, C: 'static>(machine: &Machine<E, C>) -> Validation<(), NonEmptyVec<Defect>> {
    let tree = machine.tree();
    let mut defects = Vec::new();

    for entry in machine.table().iter() {
        // Local initials are already reported as invalid initials.
        if entry.trigger == Trigger::Initial {
            continue;
        }
        let Transition::Local { target, .. } = &entry.transition else {
            continue;
        };
        let (Some(source_id), Some(target_id)) = (tree.lookup(&entry.source), tree.lookup(target)) else {
            continue;
        };

        let reason = if source_id == target_id {
            "self-loops must be external"
        } else if !tree.is_ancestor(source_id, target_id) && !tree.is_ancestor(target_id, source_id) {
            "source and target are not ancestor and descendant"
        } else {
            continue;
        };
        let (origin, trigger) = describe(entry);
        defects.push(Defect::InvalidLocal {
            origin,
            trigger,
            target: target.to_string(),
            reason: reason.into(),
        });
    }
    accumulate(defects)
}

/// Choices with an empty switch or with targets that name no state.
pub fn invalid_choices<E: Event, C: 'static>(machine: &Machine<E, C>) -> Validation<(), NonEmptyVec<Defect>> {
    let tree = machine.tree();
    let mut defects = Vec::new();

    for entry in machine.table().iter() {
        let Transition::Choice { switch, default, .. } = &entry.transition else {
            continue;
        };
        let mut invalid = |reason: String| {
            let (origin, trigger) = describe(entry);
            defects.push(Defect::InvalidChoice {
                origin,
                trigger,
                reason,
            })
        };

        if switch.is_empty() {
            invalid("switch is empty".into());
        }
        for (key, target) in switch {
            if tree.lookup(target).is_none() {
                invalid(format!("case '{key}' targets unknown state '{target}'"));
            }
        }
        if let Some(target) = default {
            if tree.lookup(target).is_none() {
                invalid(format!("default targets unknown state '{target}'"));
            }
        }
    }
    accumulate(defects)
}
