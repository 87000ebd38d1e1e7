//! Typed callables attached to states and transitions.
//!
//! Guards decide whether a transition fires, actions carry the side effects,
//! and key functions pick a branch for choice transitions. Each has a fixed
//! signature and an explicit default (always true, no-op, key by event kind).

use super::event::Event;
use std::fmt;
use std::rc::Rc;

/// Predicate that determines if a transition can fire.
///
/// Guards receive the triggering event and a read-only view of the machine
/// context. They are expected to be pure; the engine does not enforce it.
///
/// # Example
///
/// ```rust
/// use statecraft::core::Guard;
///
/// let only_large = Guard::new(|amount: &u32, limit: &u32| amount > limit);
///
/// assert!(only_large.check(&10, &5));
/// assert!(!only_large.check(&3, &5));
/// ```
pub struct Guard<E, C> {
    predicate: Rc<dyn Fn(&E, &C) -> bool>,
}

impl<E: 'static, C: 'static> Guard<E, C> {
    /// Create a guard from a predicate over the event and context.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&E, &C) -> bool + 'static,
    {
        Guard {
            predicate: Rc::new(predicate),
        }
    }

    /// Guard that never blocks.
    pub fn always() -> Self {
        Self::new(|_, _| true)
    }
}

impl<E, C> Guard<E, C> {
    /// Evaluate the predicate.
    pub fn check(&self, event: &E, context: &C) -> bool {
        (self.predicate)(event, context)
    }
}

impl<E, C> Clone for Guard<E, C> {
    fn clone(&self) -> Self {
        Self {
            predicate: Rc::clone(&self.predicate),
        }
    }
}

impl<E, C> fmt::Debug for Guard<E, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Guard")
    }
}

/// Named side effect run on entry, exit, or while a transition fires.
///
/// The event is `None` only for the initial entry performed when a machine
/// starts.
pub struct Action<E, C> {
    name: String,
    function: Rc<dyn Fn(Option<&E>, &mut C)>,
}

impl<E: 'static, C: 'static> Action<E, C> {
    pub fn new<F>(name: impl Into<String>, function: F) -> Self
    where
        F: Fn(Option<&E>, &mut C) + 'static,
    {
        Self {
            name: name.into(),
            function: Rc::new(function),
        }
    }

    /// Action that does nothing.
    pub fn noop() -> Self {
        Self::new("noop", |_, _| {})
    }
}

impl<E, C> Action<E, C> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn run(&self, event: Option<&E>, context: &mut C) {
        (self.function)(event, context)
    }
}

impl<E, C> Clone for Action<E, C> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            function: Rc::clone(&self.function),
        }
    }
}

impl<E, C> fmt::Debug for Action<E, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action").field("name", &self.name).finish()
    }
}

/// Key function of a choice transition.
pub struct KeyFn<E, C> {
    function: Rc<dyn Fn(Option<&E>, &C) -> String>,
}

impl<E: 'static, C: 'static> KeyFn<E, C> {
    pub fn new<F>(function: F) -> Self
    where
        F: Fn(Option<&E>, &C) -> String + 'static,
    {
        Self {
            function: Rc::new(function),
        }
    }
}

impl<E, C> KeyFn<E, C> {
    pub fn key(&self, event: Option<&E>, context: &C) -> String {
        (self.function)(event, context)
    }
}

impl<E: Event, C: 'static> KeyFn<E, C> {
    /// Keys on the `Debug` rendering of the event kind, or `"Initial"` when
    /// there is no event.
    pub fn by_kind() -> Self {
        Self::new(|event: Option<&E>, _| match event {
            Some(event) => format!("{:?}", event.kind()),
            None => "Initial".to_string(),
        })
    }
}

impl<E, C> Clone for KeyFn<E, C> {
    fn clone(&self) -> Self {
        Self {
            function: Rc::clone(&self.function),
        }
    }
}

impl<E, C> fmt::Debug for KeyFn<E, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeyFn")
    }
}
