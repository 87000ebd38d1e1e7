//! Transition variants and the normalized transition table.

use crate::core::{Action, Event, Guard, KeyFn, Signature, Trigger};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Discriminant of a [`Transition`], used in diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionKind {
    External,
    Local,
    Internal,
    Choice,
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::External => "external",
            Self::Local => "local",
            Self::Internal => "internal",
            Self::Choice => "choice",
        };
        f.write_str(name)
    }
}

/// A transition from a source state, keyed in the table by (source, trigger).
///
/// # Example
///
/// ```rust
/// use statecraft::core::Action;
/// use statecraft::machine::{Transition, TransitionKind};
///
/// let open: Transition<u8, Vec<String>> = Transition::external("opened")
///     .with_action(Action::new("log", |_, log: &mut Vec<String>| log.push("open".into())))
///     .when(|attempts: &u8, _| *attempts < 3);
///
/// assert_eq!(open.kind(), TransitionKind::External);
/// assert!(open.permits(&1, &vec![]));
/// assert!(!open.permits(&5, &vec![]));
/// ```
pub enum Transition<E, C> {
    /// Exits up to the common ancestor and enters the target.
    External {
        target: Signature,
        action: Action<E, C>,
        guard: Option<Guard<E, C>>,
    },
    /// Like external, but never exits or re-enters the shared ancestor.
    Local {
        target: Signature,
        action: Action<E, C>,
        guard: Option<Guard<E, C>>,
    },
    /// Runs the action without changing state.
    Internal {
        action: Action<E, C>,
        guard: Option<Guard<E, C>>,
    },
    /// Picks its target at dispatch time from `switch`, falling back to `default`.
    Choice {
        switch: BTreeMap<String, Signature>,
        default: Option<Signature>,
        key: KeyFn<E, C>,
        action: Action<E, C>,
    },
}

impl<E: 'static, C: 'static> Transition<E, C> {
    pub fn external(target: impl Into<Signature>) -> Self {
        Self::External {
            target: target.into(),
            action: Action::noop(),
            guard: None,
        }
    }

    pub fn local(target: impl Into<Signature>) -> Self {
        Self::Local {
            target: target.into(),
            action: Action::noop(),
            guard: None,
        }
    }

    pub fn internal() -> Self {
        Self::Internal {
            action: Action::noop(),
            guard: None,
        }
    }

    /// Replace the action.
    pub fn with_action(mut self, new_action: Action<E, C>) -> Self {
        match &mut self {
            Self::External { action, .. }
            | Self::Local { action, .. }
            | Self::Internal { action, .. }
            | Self::Choice { action, .. } => *action = new_action,
        }
        self
    }

    /// Attach a guard. Choice transitions are keyed rather than guarded and
    /// keep no guard.
    pub fn with_guard(mut self, new_guard: Guard<E, C>) -> Self {
        match &mut self {
            Self::External { guard, .. }
            | Self::Local { guard, .. }
            | Self::Internal { guard, .. } => *guard = Some(new_guard),
            Self::Choice { .. } => {}
        }
        self
    }

    /// Attach a guard using a closure.
    pub fn when<F>(self, predicate: F) -> Self
    where
        F: Fn(&E, &C) -> bool + 'static,
    {
        self.with_guard(Guard::new(predicate))
    }

    /// Set the fallback target of a choice transition.
    pub fn with_default(mut self, target: impl Into<Signature>) -> Self {
        if let Self::Choice { default, .. } = &mut self {
            *default = Some(target.into());
        }
        self
    }

    /// Set the key function of a choice transition.
    pub fn with_key(mut self, new_key: KeyFn<E, C>) -> Self {
        if let Self::Choice { key, .. } = &mut self {
            *key = new_key;
        }
        self
    }
}

impl<E, C> Transition<E, C> {
    pub fn kind(&self) -> TransitionKind {
        match self {
            Self::External { .. } => TransitionKind::External,
            Self::Local { .. } => TransitionKind::Local,
            Self::Internal { .. } => TransitionKind::Internal,
            Self::Choice { .. } => TransitionKind::Choice,
        }
    }

    pub fn action(&self) -> &Action<E, C> {
        match self {
            Self::External { action, .. }
            | Self::Local { action, .. }
            | Self::Internal { action, .. }
            | Self::Choice { action, .. } => action,
        }
    }

    pub fn guard(&self) -> Option<&Guard<E, C>> {
        match self {
            Self::External { guard, .. }
            | Self::Local { guard, .. }
            | Self::Internal { guard, .. } => guard.as_ref(),
            Self::Choice { .. } => None,
        }
    }

    /// Check if this transition fires for `event` in `context`.
    ///
    /// A choice fires only if it can resolve a target.
    pub fn permits(&self, event: &E, context: &C) -> bool {
        match self {
            Self::Choice { .. } => self.target(Some(event), context).is_some(),
            _ => self.guard().map_or(true, |g| g.check(event, context)),
        }
    }

    /// Resolve the target for this firing. `None` for internal transitions and
    /// for choices whose key matches nothing and that have no default.
    pub fn target(&self, event: Option<&E>, context: &C) -> Option<&Signature> {
        match self {
            Self::External { target, .. } | Self::Local { target, .. } => Some(target),
            Self::Internal { .. } => None,
            Self::Choice {
                switch,
                default,
                key,
                ..
            } => switch
                .get(&key.key(event, context))
                .or(default.as_ref()),
        }
    }

    /// Every target this transition can possibly resolve to.
    pub fn targets(&self) -> Vec<&Signature> {
        match self {
            Self::External { target, .. } | Self::Local { target, .. } => vec![target],
            Self::Internal { .. } => Vec::new(),
            Self::Choice {
                switch, default, ..
            } => switch.values().chain(default.iter()).collect(),
        }
    }

    /// Rewrite every target signature, used when region prefixes are applied.
    pub(crate) fn map_targets<F>(self, f: F) -> Self
    where
        F: Fn(&Signature) -> Signature,
    {
        match self {
            Self::External {
                target,
                action,
                guard,
            } => Self::External {
                target: f(&target),
                action,
                guard,
            },
            Self::Local {
                target,
                action,
                guard,
            } => Self::Local {
                target: f(&target),
                action,
                guard,
            },
            internal @ Self::Internal { .. } => internal,
            Self::Choice {
                switch,
                default,
                key,
                action,
            } => Self::Choice {
                switch: switch.into_iter().map(|(k, t)| (k, f(&t))).collect(),
                default: default.as_ref().map(&f),
                key,
                action,
            },
        }
    }
}

impl<E: Event, C: 'static> Transition<E, C> {
    /// Choice transition over `(key, target)` pairs, keyed by event kind
    /// until [`Transition::with_key`] replaces the key function.
    pub fn choice<I, K, T>(switch: I) -> Self
    where
        I: IntoIterator<Item = (K, T)>,
        K: Into<String>,
        T: Into<Signature>,
    {
        Self::Choice {
            switch: switch
                .into_iter()
                .map(|(k, t)| (k.into(), t.into()))
                .collect(),
            default: None,
            key: KeyFn::by_kind(),
            action: Action::noop(),
        }
    }
}

impl<E, C> Clone for Transition<E, C> {
    fn clone(&self) -> Self {
        match self {
            Self::External {
                target,
                action,
                guard,
            } => Self::External {
                target: target.clone(),
                action: action.clone(),
                guard: guard.clone(),
            },
            Self::Local {
                target,
                action,
                guard,
            } => Self::Local {
                target: target.clone(),
                action: action.clone(),
                guard: guard.clone(),
            },
            Self::Internal { action, guard } => Self::Internal {
                action: action.clone(),
                guard: guard.clone(),
            },
            Self::Choice {
                switch,
                default,
                key,
                action,
            } => Self::Choice {
                switch: switch.clone(),
                default: default.clone(),
                key: key.clone(),
                action: action.clone(),
            },
        }
    }
}

impl<E, C> fmt::Debug for Transition<E, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Transition");
        s.field("kind", &self.kind());
        match self {
            Self::External { target, .. } | Self::Local { target, .. } => {
                s.field("target", target);
            }
            Self::Internal { .. } => {}
            Self::Choice {
                switch, default, ..
            } => {
                s.field("switch", switch).field("default", default);
            }
        }
        s.field("action", &self.action().name()).finish()
    }
}

/// A transition together with the source and trigger it is registered under.
pub struct TransitionEntry<E: Event, C> {
    pub source: Signature,
    pub trigger: Trigger<E::Kind>,
    pub transition: Transition<E, C>,
}

impl<E: Event, C> fmt::Debug for TransitionEntry<E, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionEntry")
            .field("source", &self.source)
            .field("trigger", &self.trigger)
            .field("transition", &self.transition)
            .finish()
    }
}

/// Mapping from (source signature, trigger) to a transition.
pub struct TransitionTable<E: Event, C> {
    entries: BTreeMap<Signature, BTreeMap<Trigger<E::Kind>, TransitionEntry<E, C>>>,
}

impl<E: Event, C> TransitionTable<E, C> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Insert an entry, replacing any previous one for the same key.
    pub fn insert(&mut self, entry: TransitionEntry<E, C>) {
        self.entries
            .entry(entry.source.clone())
            .or_default()
            .insert(entry.trigger, entry);
    }

    pub fn get(&self, source: &Signature, trigger: Trigger<E::Kind>) -> Option<&TransitionEntry<E, C>> {
        self.entries.get(source)?.get(&trigger)
    }

    /// Entries registered for one source state.
    pub fn outgoing(&self, source: &Signature) -> impl Iterator<Item = &TransitionEntry<E, C>> {
        self.entries
            .get(source)
            .into_iter()
            .flat_map(|by_trigger| by_trigger.values())
    }

    /// All entries, ordered by source then trigger.
    pub fn iter(&self) -> impl Iterator<Item = &TransitionEntry<E, C>> {
        self.entries.values().flat_map(|by_trigger| by_trigger.values())
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Event kinds used as triggers anywhere in the table.
    pub fn event_kinds(&self) -> BTreeSet<E::Kind> {
        self.iter()
            .filter_map(|entry| match entry.trigger {
                Trigger::Event(kind) => Some(kind),
                Trigger::Initial => None,
            })
            .collect()
    }
}

impl<E: Event, C> Default for TransitionTable<E, C> {
    fn default() -> Self {
        Self::new()
    }
}
