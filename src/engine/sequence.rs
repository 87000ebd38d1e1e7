//! Ordered exit and entry steps for one dispatch.
//!
//! The same builder serves two modes. In plan mode it reads the context and
//! invokes nothing, which makes it usable for inspection and tests. In run
//! mode every step executes the moment it is appended, so the key function of
//! a choice reached later in the sequence observes what earlier actions did.

use super::responder::{respond, Response};
use crate::core::{Event, Trigger};
use crate::machine::{ActiveSet, Machine, StateId, StateKind, StateTree, TransitionEntry, TransitionKind};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;
use tracing::trace;

/// Errors raised while computing a sequence.
///
/// A validated machine never produces these; they surface only when
/// validation was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequenceError {
    #[error("Transition from '{origin}' targets unknown state '{target}'")]
    UnknownTarget { origin: String, target: String },

    #[error("Composite state '{state}' has no initial transition")]
    MissingInitial { state: String },

    #[error("Transition from '{origin}' on {trigger} resolved no target")]
    Unresolved { origin: String, trigger: String },

    #[error("Initial transition of '{state}' targets '{target}', which is not a descendant")]
    InitialNotDescendant { state: String, target: String },
}

/// What a step does. Used to drop repeated steps within one sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StepKind<K> {
    Enter(StateId),
    Exit(StateId),
    Transition { source: StateId, trigger: Trigger<K> },
}

/// One named element of a sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Step<K> {
    /// `<signature>-entry`, `<signature>-exit` or `<signature>-<trigger>`.
    pub name: String,
    pub kind: StepKind<K>,
}

impl<K> fmt::Display for Step<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// The result of one dispatch: exits in order, entries in order, and the
/// active set they lead to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sequence<K> {
    pub exits: Vec<Step<K>>,
    pub entries: Vec<Step<K>>,
    pub active: ActiveSet,
}

impl<K> Sequence<K> {
    fn unchanged(active: &ActiveSet) -> Self {
        Self {
            exits: Vec::new(),
            entries: Vec::new(),
            active: active.clone(),
        }
    }

    /// Nothing responded; no step ran.
    pub fn is_empty(&self) -> bool {
        self.exits.is_empty() && self.entries.is_empty()
    }

    pub fn exit_names(&self) -> Vec<&str> {
        self.exits.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn entry_names(&self) -> Vec<&str> {
        self.entries.iter().map(|s| s.name.as_str()).collect()
    }
}

enum Ctx<'c, C> {
    Plan(&'c C),
    Run(&'c mut C),
}

impl<C> Ctx<'_, C> {
    fn get(&self) -> &C {
        match self {
            Ctx::Plan(context) => context,
            Ctx::Run(context) => context,
        }
    }
}

/// How one responding transition reshapes the active set.
struct Route<'a, E: Event, C> {
    source: StateId,
    entry: &'a TransitionEntry<E, C>,
    /// Top of the exited sub-tree and whether the top itself is exited.
    exit: Option<(StateId, bool)>,
    enter: Enter,
}

enum Enter {
    /// Internal transition: only the action runs.
    Nothing,
    /// Full entry sequence of the state, its own enter included.
    Sequence(StateId),
    /// Entry sequence of the state without its own enter.
    Body(StateId),
    /// Optionally re-enter a state, enter the states strictly between `from`
    /// and `target`, then the entry sequence of `target`.
    Path {
        reenter: Option<StateId>,
        from: Option<StateId>,
        target: StateId,
    },
}

struct Sequencer<'a, 'c, E: Event, C> {
    machine: &'a Machine<E, C>,
    event: Option<&'a E>,
    ctx: Ctx<'c, C>,
    exits: Vec<Step<E::Kind>>,
    entries: Vec<Step<E::Kind>>,
    seen: HashSet<StepKind<E::Kind>>,
}

impl<'a, 'c, E: Event, C: 'static> Sequencer<'a, 'c, E, C> {
    fn new(machine: &'a Machine<E, C>, event: Option<&'a E>, ctx: Ctx<'c, C>) -> Self {
        Self {
            machine,
            event,
            ctx,
            exits: Vec::new(),
            entries: Vec::new(),
            seen: HashSet::new(),
        }
    }

    fn tree(&self) -> &'a StateTree<E, C> {
        self.machine.tree()
    }

    fn dispatch(mut self, active: &ActiveSet, event: &'a E) -> (Sequence<E::Kind>, Result<(), SequenceError>) {
        let forest = active.forest(self.tree());
        let responses = respond(self.machine, &forest, event, self.ctx.get());
        if responses.is_empty() {
            return (Sequence::unchanged(active), Ok(()));
        }

        // Targets are resolved before any step runs, against the context as
        // the responder saw it.
        let routes = match responses
            .iter()
            .map(|response| self.route(response))
            .collect::<Result<Vec<_>, _>>()
        {
            Ok(routes) => self.settle(routes),
            Err(err) => return (Sequence::unchanged(active), Err(err)),
        };

        for route in &routes {
            self.exit_route(route, active);
        }
        let mut result = Ok(());
        for route in &routes {
            if let Err(err) = self.enter_route(route) {
                result = Err(err);
                break;
            }
        }
        (self.finish(active), result)
    }

    fn start(mut self) -> (Sequence<E::Kind>, Result<(), SequenceError>) {
        let root = self.tree().root();
        let result = self.entry_sequence(root);
        (self.finish(&ActiveSet::new()), result)
    }

    fn finish(self, prior: &ActiveSet) -> Sequence<E::Kind> {
        let mut active = prior.clone();
        for step in &self.exits {
            if let StepKind::Exit(id) = step.kind {
                active.remove(id);
            }
        }
        for step in &self.entries {
            if let StepKind::Enter(id) = step.kind {
                active.insert(id);
            }
        }
        Sequence {
            exits: self.exits,
            entries: self.entries,
            active,
        }
    }

    fn route(&self, response: &Response<'_, 'a, E, C>) -> Result<Route<'a, E, C>, SequenceError> {
        let tree = self.tree();
        let source = response.branch.state;
        let entry = response.entry;
        let transition = &entry.transition;

        let Some(signature) = transition.target(self.event, self.ctx.get()) else {
            if transition.kind() == TransitionKind::Internal {
                return Ok(Route {
                    source,
                    entry,
                    exit: None,
                    enter: Enter::Nothing,
                });
            }
            return Err(SequenceError::Unresolved {
                origin: entry.source.to_string(),
                trigger: entry.trigger.to_string(),
            });
        };
        let target = tree.lookup(signature).ok_or_else(|| SequenceError::UnknownTarget {
            origin: entry.source.to_string(),
            target: signature.to_string(),
        })?;
        let local = transition.kind() == TransitionKind::Local;

        let (exit, enter) = if source == target {
            (Some((source, true)), Enter::Sequence(target))
        } else if tree.is_ancestor(source, target) {
            let reenter = (!local).then_some(source);
            (
                Some((source, !local)),
                Enter::Path {
                    reenter,
                    from: Some(source),
                    target,
                },
            )
        } else if tree.is_ancestor(target, source) {
            if local {
                (Some((target, false)), Enter::Body(target))
            } else {
                (Some((target, true)), Enter::Sequence(target))
            }
        } else {
            let source_path = tree.path_from_root(source);
            let target_path = tree.path_from_root(target);
            let shared = source_path
                .iter()
                .zip(&target_path)
                .take_while(|(a, b)| a == b)
                .count();
            let ancestor = shared.checked_sub(1).map(|i| source_path[i]);
            match ancestor {
                // Different regions of one orthogonal state: leave and re-enter it.
                Some(common) if tree.node(common).is_orthogonal() => (
                    Some((common, true)),
                    Enter::Path {
                        reenter: Some(common),
                        from: Some(common),
                        target,
                    },
                ),
                _ => (
                    Some((source_path[shared], true)),
                    Enter::Path {
                        reenter: None,
                        from: ancestor,
                        target,
                    },
                ),
            }
        };

        Ok(Route {
            source,
            entry,
            exit,
            enter,
        })
    }

    /// Drop every route whose source lies in a sub-tree another route exits.
    /// When two routes exit each other's sources the earlier one is kept.
    fn settle(&self, routes: Vec<Route<'a, E, C>>) -> Vec<Route<'a, E, C>> {
        let mut kept: Vec<Route<'a, E, C>> = Vec::with_capacity(routes.len());
        for route in routes {
            if kept.iter().any(|other| self.exits_over(other, route.source)) {
                trace!(
                    state = %self.tree().signature(route.source),
                    "response dropped, its state is exited by another response"
                );
                continue;
            }
            kept.retain(|other| !self.exits_over(&route, other.source));
            kept.push(route);
        }
        kept
    }

    fn exits_over(&self, route: &Route<'a, E, C>, state: StateId) -> bool {
        route
            .exit
            .is_some_and(|(top, _)| top == state || self.tree().is_ancestor(top, state))
    }

    fn exit_route(&mut self, route: &Route<'a, E, C>, active: &ActiveSet) {
        let Some((top, include_top)) = route.exit else {
            return;
        };
        let mut order = active.branch(self.tree(), top).postorder();
        if !include_top {
            order.pop();
        }
        for state in order {
            self.exit(state);
        }
    }

    fn enter_route(&mut self, route: &Route<'a, E, C>) -> Result<(), SequenceError> {
        self.fire(route.source, route.entry);
        match route.enter {
            Enter::Nothing => Ok(()),
            Enter::Sequence(state) => self.entry_sequence(state),
            Enter::Body(state) => self.entry_body(state),
            Enter::Path {
                reenter,
                from,
                target,
            } => {
                if let Some(state) = reenter {
                    self.enter(state);
                }
                self.enter_path(from, target)?;
                self.entry_sequence(target)
            }
        }
    }

    /// Enter `state`, then descend through initial transitions and regions
    /// until only leaves remain.
    fn entry_sequence(&mut self, state: StateId) -> Result<(), SequenceError> {
        self.enter(state);
        self.entry_body(state)
    }

    fn entry_body(&mut self, state: StateId) -> Result<(), SequenceError> {
        let tree = self.tree();
        match &tree.node(state).kind {
            StateKind::Leaf => Ok(()),
            StateKind::Orthogonal { regions } => {
                for &region in regions {
                    self.entry_sequence(region)?;
                }
                Ok(())
            }
            StateKind::Composite { .. } => {
                let name = tree.signature(state).to_string();
                let initial = self
                    .machine
                    .transition(state, Trigger::Initial)
                    .ok_or_else(|| SequenceError::MissingInitial { state: name.clone() })?;
                self.fire(state, initial);

                let signature = initial
                    .transition
                    .target(self.event, self.ctx.get())
                    .ok_or_else(|| SequenceError::Unresolved {
                        origin: name.clone(),
                        trigger: Trigger::<E::Kind>::Initial.to_string(),
                    })?;
                let target = tree.lookup(signature).ok_or_else(|| SequenceError::UnknownTarget {
                    origin: name.clone(),
                    target: signature.to_string(),
                })?;
                if !tree.is_ancestor(state, target) {
                    return Err(SequenceError::InitialNotDescendant {
                        state: name,
                        target: signature.to_string(),
                    });
                }
                self.enter_path(Some(state), target)?;
                self.entry_sequence(target)
            }
        }
    }

    /// Enter the states strictly between `from` and `target`, top-down.
    ///
    /// Any orthogonal state on the way, `from` included, also gets its other
    /// regions entered, since only the region holding `target` is on the path.
    fn enter_path(&mut self, from: Option<StateId>, target: StateId) -> Result<(), SequenceError> {
        let path = self.tree().path_from_root(target);
        let start = from
            .and_then(|f| path.iter().position(|&s| s == f))
            .map_or(0, |at| at + 1);

        if let (Some(from), Some(&next)) = (from, path.get(start)) {
            self.enter_other_regions(from, next)?;
        }
        for i in start..path.len().saturating_sub(1) {
            self.enter(path[i]);
            self.enter_other_regions(path[i], path[i + 1])?;
        }
        Ok(())
    }

    fn enter_other_regions(&mut self, state: StateId, toward: StateId) -> Result<(), SequenceError> {
        if let StateKind::Orthogonal { regions } = &self.tree().node(state).kind {
            for &region in regions.iter().filter(|&&r| r != toward) {
                self.entry_sequence(region)?;
            }
        }
        Ok(())
    }

    fn exit(&mut self, state: StateId) {
        let kind = StepKind::Exit(state);
        if !self.seen.insert(kind) {
            return;
        }
        let node = self.tree().node(state);
        let name = format!("{}-exit", node.signature);
        if let Ctx::Run(context) = &mut self.ctx {
            if let Some(hook) = &node.on_exit {
                hook.run(self.event, context);
            }
            trace!(step = %name, "exited state");
        }
        self.exits.push(Step { name, kind });
    }

    fn enter(&mut self, state: StateId) {
        let kind = StepKind::Enter(state);
        if !self.seen.insert(kind) {
            return;
        }
        let node = self.tree().node(state);
        let name = format!("{}-entry", node.signature);
        if let Ctx::Run(context) = &mut self.ctx {
            trace!(step = %name, "entered state");
            if let Some(hook) = &node.on_enter {
                hook.run(self.event, context);
            }
        }
        self.entries.push(Step { name, kind });
    }

    fn fire(&mut self, source: StateId, entry: &'a TransitionEntry<E, C>) {
        let kind = StepKind::Transition {
            source,
            trigger: entry.trigger,
        };
        if !self.seen.insert(kind) {
            return;
        }
        let name = format!("{}-{}", self.tree().signature(source), entry.trigger);
        if let Ctx::Run(context) = &mut self.ctx {
            let action = entry.transition.action();
            trace!(step = %name, action = action.name(), "running transition action");
            action.run(self.event, context);
        }
        self.entries.push(Step { name, kind });
    }
}

/// Compute the sequence `event` would cause without running anything.
pub fn plan<E: Event, C: 'static>(
    machine: &Machine<E, C>,
    active: &ActiveSet,
    event: &E,
    context: &C,
) -> Result<Sequence<E::Kind>, SequenceError> {
    let (sequence, result) = Sequencer::new(machine, Some(event), Ctx::Plan(context)).dispatch(active, event);
    result.map(|()| sequence)
}

/// Compute the entry sequence of the machine root without running anything.
pub fn plan_start<E: Event, C: 'static>(machine: &Machine<E, C>, context: &C) -> Result<Sequence<E::Kind>, SequenceError> {
    let (sequence, result) = Sequencer::new(machine, None, Ctx::Plan(context)).start();
    result.map(|()| sequence)
}

/// Steps that enter `state` and settle it into leaves.
pub fn entry_sequence<E: Event, C: 'static>(
    machine: &Machine<E, C>,
    state: StateId,
    event: Option<&E>,
    context: &C,
) -> Result<Vec<Step<E::Kind>>, SequenceError> {
    let mut sequencer = Sequencer::new(machine, event, Ctx::Plan(context));
    sequencer.entry_sequence(state)?;
    Ok(sequencer.entries)
}

/// Dispatch `event`, executing every step as it is appended.
///
/// On error the steps executed so far are kept in the returned sequence.
pub(crate) fn run<E: Event, C: 'static>(
    machine: &Machine<E, C>,
    active: &ActiveSet,
    event: &E,
    context: &mut C,
) -> (Sequence<E::Kind>, Result<(), SequenceError>) {
    Sequencer::new(machine, Some(event), Ctx::Run(context)).dispatch(active, event)
}

/// Enter the machine root, executing every step as it is appended.
pub(crate) fn run_start<E: Event, C: 'static>(
    machine: &Machine<E, C>,
    context: &mut C,
) -> (Sequence<E::Kind>, Result<(), SequenceError>) {
    Sequencer::new(machine, None, Ctx::Run(context)).start()
}
