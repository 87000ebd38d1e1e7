//! Synchronous, reentrancy-safe event bus.
//!
//! # Guarantees
//!
//! - **FIFO**: envelopes are delivered in the order they were posted, across
//!   nested `dispatch` calls.
//! - **Bounded stack**: a `dispatch` made while another one is running only
//!   enqueues; the outer call drains the queue.
//! - **Snapshot delivery**: listeners registered or removed while an envelope
//!   is being delivered take effect from the next envelope on.
//! - **Exact topics**: an event is delivered to the listeners of its own kind
//!   only. Subtype fan-out is done by registering under every subtype.

mod error;

pub use error::BusError;

use crate::core::Event;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::rc::Rc;
use tracing::trace;
use uuid::Uuid;

/// What travels through the bus: a user event or a private one-shot token.
#[derive(Clone, Debug, PartialEq)]
pub enum Envelope<E> {
    Event(E),
    Token(Uuid),
}

impl<E: Event> Envelope<E> {
    pub fn topic(&self) -> Topic<E::Kind> {
        match self {
            Envelope::Event(event) => Topic::Kind(event.kind()),
            Envelope::Token(token) => Topic::Token(*token),
        }
    }

    pub fn event(&self) -> Option<&E> {
        match self {
            Envelope::Event(event) => Some(event),
            Envelope::Token(_) => None,
        }
    }
}

/// Key listeners are registered under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Topic<K> {
    Kind(K),
    /// A topic no ordinary event can reach.
    Token(Uuid),
}

impl<K: fmt::Debug> fmt::Display for Topic<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::Kind(kind) => write!(f, "{kind:?}"),
            Topic::Token(token) => write!(f, "token:{token}"),
        }
    }
}

/// Handle returned by [`EventBus::register`], needed to unregister.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

type Listener<E> = Rc<dyn Fn(&Envelope<E>)>;

struct Inner<E: Event> {
    listeners: RefCell<HashMap<Topic<E::Kind>, Vec<(ListenerId, Listener<E>)>>>,
    queue: RefCell<VecDeque<Envelope<E>>>,
    dispatching: Cell<bool>,
    next_id: Cell<u64>,
}

/// Single-threaded event bus. Cloning yields another handle to the same bus,
/// which is how actions dispatch follow-up events.
///
/// # Example
///
/// ```rust
/// use statecraft::bus::{Envelope, EventBus, Topic};
/// use statecraft::event_enum;
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// event_enum! {
///     enum Ev { Ping, Pong }
/// }
///
/// let bus = EventBus::new();
/// let seen = Rc::new(RefCell::new(Vec::new()));
///
/// let handle = bus.clone();
/// let log = Rc::clone(&seen);
/// bus.register(Topic::Kind(Ev::Ping), move |_: &Envelope<Ev>| {
///     log.borrow_mut().push("ping");
///     handle.dispatch(Ev::Pong);
/// });
/// let log = Rc::clone(&seen);
/// bus.register(Topic::Kind(Ev::Pong), move |_: &Envelope<Ev>| log.borrow_mut().push("pong"));
///
/// bus.dispatch(Ev::Ping);
/// assert_eq!(*seen.borrow(), vec!["ping", "pong"]);
/// ```
pub struct EventBus<E: Event> {
    inner: Rc<Inner<E>>,
}

impl<E: Event> EventBus<E> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(Inner {
                listeners: RefCell::new(HashMap::new()),
                queue: RefCell::new(VecDeque::new()),
                dispatching: Cell::new(false),
                next_id: Cell::new(0),
            }),
        }
    }

    /// Add a listener for `topic`.
    pub fn register<F>(&self, topic: Topic<E::Kind>, listener: F) -> ListenerId
    where
        F: Fn(&Envelope<E>) + 'static,
    {
        let id = ListenerId(self.inner.next_id.get());
        self.inner.next_id.set(id.0 + 1);
        self.inner
            .listeners
            .borrow_mut()
            .entry(topic)
            .or_default()
            .push((id, Rc::new(listener)));
        trace!(%topic, %id, "registered listener");
        id
    }

    /// Remove a listener previously added under `topic`.
    pub fn unregister(&self, topic: Topic<E::Kind>, id: ListenerId) -> Result<(), BusError> {
        let mut listeners = self.inner.listeners.borrow_mut();
        let registered = listeners.get_mut(&topic).ok_or_else(|| BusError::UnknownTopic {
            topic: topic.to_string(),
        })?;
        let position = registered
            .iter()
            .position(|(candidate, _)| *candidate == id)
            .ok_or_else(|| BusError::UnknownListener {
                topic: topic.to_string(),
                id,
            })?;
        registered.remove(position);
        if registered.is_empty() {
            listeners.remove(&topic);
        }
        trace!(%topic, %id, "unregistered listener");
        Ok(())
    }

    /// Deliver `event` to the listeners of its kind.
    pub fn dispatch(&self, event: E) {
        self.post(Envelope::Event(event));
    }

    /// Deliver a private token to the listeners of `Topic::Token(token)`.
    pub fn dispatch_token(&self, token: Uuid) {
        self.post(Envelope::Token(token));
    }

    /// Enqueue `envelope` and, unless a dispatch is already running, drain
    /// the queue.
    pub fn post(&self, envelope: Envelope<E>) {
        self.inner.queue.borrow_mut().push_back(envelope);
        if self.inner.dispatching.get() {
            return;
        }

        let _guard = DispatchGuard::engage(&self.inner.dispatching);
        loop {
            let Some(envelope) = self.inner.queue.borrow_mut().pop_front() else {
                break;
            };
            let topic = envelope.topic();
            let snapshot: Vec<Listener<E>> = self
                .inner
                .listeners
                .borrow()
                .get(&topic)
                .map(|registered| registered.iter().map(|(_, l)| Rc::clone(l)).collect())
                .unwrap_or_default();

            trace!(%topic, listeners = snapshot.len(), "delivering envelope");
            for listener in snapshot {
                listener(&envelope);
            }
        }
    }

    /// True while a dispatch loop is draining the queue.
    pub fn is_dispatching(&self) -> bool {
        self.inner.dispatching.get()
    }

    /// Envelopes waiting to be delivered.
    pub fn pending(&self) -> usize {
        self.inner.queue.borrow().len()
    }

    /// Topics with at least one listener.
    pub fn topic_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    pub fn listener_count(&self, topic: Topic<E::Kind>) -> usize {
        self.inner
            .listeners
            .borrow()
            .get(&topic)
            .map_or(0, Vec::len)
    }
}

impl<E: Event> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<E: Event> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("topics", &self.inner.listeners.borrow().len())
            .field("pending", &self.pending())
            .field("dispatching", &self.is_dispatching())
            .finish()
    }
}

/// Clears the dispatching flag when the drain loop ends, even by unwinding.
struct DispatchGuard<'a>(&'a Cell<bool>);

impl<'a> DispatchGuard<'a> {
    fn engage(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self(flag)
    }
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}
