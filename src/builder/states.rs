//! State descriptions: nested name → state mappings.

use super::transitions::Transitions;
use crate::core::{Action, Event};

/// Ordered mapping from local state name to its description.
///
/// The first entry of a top-level map is the machine root; the first (and
/// only) entry of a region map is the region's sub-root.
///
/// # Example
///
/// ```rust
/// use statecraft::builder::{StateSpec, States};
/// use statecraft::event_enum;
///
/// event_enum! {
///     enum Door { Open, Close }
/// }
///
/// let states: States<Door, ()> = States::new().state(
///     "top",
///     StateSpec::composite(States::new().leaf("closed").leaf("opened")),
/// );
/// assert_eq!(states.len(), 1);
/// ```
pub struct States<E: Event, C> {
    pub(crate) entries: Vec<(String, StateSpec<E, C>)>,
}

impl<E: Event, C: 'static> States<E, C> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Add a state with the given description.
    pub fn state(mut self, name: impl Into<String>, spec: StateSpec<E, C>) -> Self {
        self.entries.push((name.into(), spec));
        self
    }

    /// Add a leaf state without hooks.
    pub fn leaf(self, name: impl Into<String>) -> Self {
        self.state(name, StateSpec::leaf())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<E: Event, C: 'static> Default for States<E, C> {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) enum Shape<E: Event, C> {
    Leaf,
    Composite(States<E, C>),
    Orthogonal(Vec<Region<E, C>>),
}

/// Description of one state: its shape and optional enter/exit hooks.
pub struct StateSpec<E: Event, C> {
    pub(crate) shape: Shape<E, C>,
    pub(crate) on_enter: Option<Action<E, C>>,
    pub(crate) on_exit: Option<Action<E, C>>,
}

impl<E: Event, C: 'static> StateSpec<E, C> {
    fn with_shape(shape: Shape<E, C>) -> Self {
        Self {
            shape,
            on_enter: None,
            on_exit: None,
        }
    }

    pub fn leaf() -> Self {
        Self::with_shape(Shape::Leaf)
    }

    /// A state with one nested hierarchy. Needs an `Initial` transition.
    pub fn composite(children: States<E, C>) -> Self {
        Self::with_shape(Shape::Composite(children))
    }

    /// A state whose regions are all active at once.
    pub fn orthogonal(regions: Vec<Region<E, C>>) -> Self {
        Self::with_shape(Shape::Orthogonal(regions))
    }

    /// Hook run after the state is entered.
    pub fn on_enter(mut self, action: Action<E, C>) -> Self {
        self.on_enter = Some(action);
        self
    }

    /// Hook run before the state is exited.
    pub fn on_exit(mut self, action: Action<E, C>) -> Self {
        self.on_exit = Some(action);
        self
    }
}

/// One independent sub-machine of an orthogonal state.
pub struct Region<E: Event, C> {
    pub(crate) states: States<E, C>,
    pub(crate) transitions: Transitions<E, C>,
}

impl<E: Event, C: 'static> Region<E, C> {
    pub fn new(states: States<E, C>, transitions: Transitions<E, C>) -> Self {
        Self {
            states,
            transitions,
        }
    }
}
