//! Transition descriptions: state name → trigger → transition.

use crate::core::{Event, Signature, Trigger};
use crate::machine::Transition;
use std::collections::BTreeMap;

/// Transition table description. Names are local to the machine or region
/// the table belongs to; region prefixes are applied when the machine is built.
/// A transition that crosses regions is declared in an enclosing table, with
/// source and target given as full signatures (`"par[1].idle".parse()`).
///
/// # Example
///
/// ```rust
/// use statecraft::builder::Transitions;
/// use statecraft::event_enum;
/// use statecraft::machine::Transition;
///
/// event_enum! {
///     enum Door { Open, Close }
/// }
///
/// let transitions: Transitions<Door, ()> = Transitions::new()
///     .initial("top", Transition::external("closed"))
///     .on("closed", Door::Open, Transition::external("opened"))
///     .on("opened", Door::Close, Transition::external("closed"));
/// assert_eq!(transitions.len(), 3);
/// ```
pub struct Transitions<E: Event, C> {
    pub(crate) entries: BTreeMap<Signature, BTreeMap<Trigger<E::Kind>, Transition<E, C>>>,
}

impl<E: Event, C: 'static> Transitions<E, C> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Add a transition for `state` on `trigger`, replacing any previous one.
    pub fn add(
        mut self,
        state: impl Into<Signature>,
        trigger: Trigger<E::Kind>,
        transition: Transition<E, C>,
    ) -> Self {
        self.entries
            .entry(state.into())
            .or_default()
            .insert(trigger, transition);
        self
    }

    /// Add a transition fired by events of `kind`.
    pub fn on(self, state: impl Into<Signature>, kind: E::Kind, transition: Transition<E, C>) -> Self {
        self.add(state, Trigger::Event(kind), transition)
    }

    /// Set the initial transition of a composite state.
    pub fn initial(self, state: impl Into<Signature>, transition: Transition<E, C>) -> Self {
        self.add(state, Trigger::Initial, transition)
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E: Event, C: 'static> Default for Transitions<E, C> {
    fn default() -> Self {
        Self::new()
    }
}
