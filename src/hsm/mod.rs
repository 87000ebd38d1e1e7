//! The orchestrator: owns the runtime state of one machine and connects it
//! to an [`EventBus`].
//!
//! A machine moves through `NotStarted → Running → Stopped` and may be
//! started again after stopping. While running, every event kind the machine
//! can react to (including declared subtypes) has a handler on the bus; each
//! delivered event is resolved, sequenced and executed in one go.

mod config;
mod error;

pub use config::HsmConfig;
pub use error::HsmError;

use crate::builder::{HsmBuilder, States, Transitions};
use crate::bus::{EventBus, ListenerId, Topic};
use crate::core::{subscription_set, DispatchHistory, DispatchRecord, Event, Signature};
use crate::engine::{self, Sequence, StepKind};
use crate::machine::{ActiveSet, Machine};
use crate::validate;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use tracing::{debug, error, trace, warn};
use uuid::Uuid;

/// Lifecycle of a machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    NotStarted,
    Running,
    Stopped,
}

struct Runtime<C> {
    status: Status,
    context: C,
    active: ActiveSet,
    history: DispatchHistory,
}

/// Listeners one `start` put on a bus.
struct Registration<E: Event> {
    bus: EventBus<E>,
    listeners: Vec<(Topic<E::Kind>, ListenerId)>,
    /// The start-token listener; emptied once it has fired.
    start: (Topic<E::Kind>, Rc<Cell<Option<ListenerId>>>),
}

/// A hierarchical state machine bound to a user context.
///
/// The runtime is borrowed for the whole of a dispatch, so hooks, actions,
/// guards and key functions must not call back into the same `Hsm`. They get
/// the context directly and can post follow-up events through a bus handle.
///
/// # Example
///
/// ```rust
/// use statecraft::builder::{StateSpec, States, Transitions};
/// use statecraft::bus::EventBus;
/// use statecraft::event_enum;
/// use statecraft::hsm::Hsm;
/// use statecraft::machine::Transition;
///
/// event_enum! {
///     enum Door { Open, Close }
/// }
///
/// let states = States::new().state(
///     "top",
///     StateSpec::composite(States::new().leaf("closed").leaf("opened")),
/// );
/// let transitions = Transitions::new()
///     .initial("top", Transition::external("closed"))
///     .on("closed", Door::Open, Transition::external("opened"))
///     .on("opened", Door::Close, Transition::external("closed"));
///
/// let hsm = Hsm::new(states, transitions, ()).unwrap();
/// let bus = EventBus::new();
/// hsm.start(&bus).unwrap();
///
/// bus.dispatch(Door::Open);
/// assert!(hsm.is_active(&"opened".parse().unwrap()));
/// ```
pub struct Hsm<E: Event, C> {
    name: Rc<str>,
    machine: Rc<Machine<E, C>>,
    runtime: Rc<RefCell<Runtime<C>>>,
    registration: RefCell<Option<Registration<E>>>,
}

impl<E: Event, C: 'static> Hsm<E, C> {
    /// Build and validate a machine with the default configuration.
    pub fn new(states: States<E, C>, transitions: Transitions<E, C>, context: C) -> Result<Self, HsmError> {
        Self::with_config(states, transitions, context, HsmConfig::default())
    }

    /// Build a machine, validating it unless `config.skip_validation` is set.
    pub fn with_config(
        states: States<E, C>,
        transitions: Transitions<E, C>,
        context: C,
        config: HsmConfig,
    ) -> Result<Self, HsmError> {
        let machine = Machine::build(states, transitions)?;
        if config.skip_validation {
            warn!(machine = %config.name, "validation skipped");
        } else {
            validate::check(&machine).map_err(HsmError::Invalid)?;
        }
        debug!(
            machine = %config.name,
            states = machine.tree().len(),
            transitions = machine.table().len(),
            "built state machine"
        );

        let history = config
            .history_limit
            .map_or_else(DispatchHistory::new, DispatchHistory::bounded);
        Ok(Self {
            name: Rc::from(config.name),
            machine: Rc::new(machine),
            runtime: Rc::new(RefCell::new(Runtime {
                status: Status::NotStarted,
                context,
                active: ActiveSet::new(),
                history,
            })),
            registration: RefCell::new(None),
        })
    }

    pub fn builder() -> HsmBuilder<E, C> {
        HsmBuilder::new()
    }

    /// Subscribe to `bus` and perform the initial entry.
    ///
    /// The initial entry travels through the bus as a private token, so when
    /// `start` is called from inside a dispatch it runs in queue order like
    /// any other event.
    pub fn start(&self, bus: &EventBus<E>) -> Result<(), HsmError> {
        {
            let mut runtime = self.runtime.borrow_mut();
            if runtime.status == Status::Running {
                return Err(HsmError::AlreadyRunning {
                    name: self.name.to_string(),
                });
            }
            runtime.status = Status::Running;
            runtime.active = ActiveSet::new();
        }

        let kinds = subscription_set::<E, _>(self.machine.table().event_kinds());
        let mut listeners = Vec::with_capacity(kinds.len());
        for kind in kinds {
            let topic = Topic::Kind(kind);
            let machine = Rc::clone(&self.machine);
            let runtime = Rc::clone(&self.runtime);
            let name = Rc::clone(&self.name);
            let id = bus.register(topic, move |envelope| {
                if let Some(event) = envelope.event() {
                    handle(&machine, &runtime, &name, event);
                }
            });
            listeners.push((topic, id));
        }
        debug!(machine = %self.name, kinds = listeners.len(), "registered event handlers");

        let token = Uuid::new_v4();
        let topic = Topic::Token(token);
        let own_id: Rc<Cell<Option<ListenerId>>> = Rc::new(Cell::new(None));
        let id = {
            let machine = Rc::clone(&self.machine);
            let runtime = Rc::clone(&self.runtime);
            let name = Rc::clone(&self.name);
            let own_id = Rc::clone(&own_id);
            let bus_handle = bus.clone();
            bus.register(topic, move |_| {
                kick_start(&machine, &runtime, &name);
                if let Some(id) = own_id.take() {
                    if let Err(err) = bus_handle.unregister(topic, id) {
                        warn!(machine = %name, %err, "could not remove start listener");
                    }
                }
            })
        };
        own_id.set(Some(id));
        *self.registration.borrow_mut() = Some(Registration {
            bus: bus.clone(),
            listeners,
            start: (topic, own_id),
        });
        bus.dispatch_token(token);
        Ok(())
    }

    /// Unsubscribe from the bus. Active states are not exited.
    pub fn stop(&self) -> Result<(), HsmError> {
        {
            let mut runtime = self.runtime.borrow_mut();
            if runtime.status != Status::Running {
                return Ok(());
            }
            runtime.status = Status::Stopped;
        }
        if let Some(registration) = self.registration.borrow_mut().take() {
            for (topic, id) in registration.listeners {
                registration.bus.unregister(topic, id)?;
            }
            let (topic, own_id) = registration.start;
            if let Some(id) = own_id.take() {
                registration.bus.unregister(topic, id)?;
            }
        }
        debug!(machine = %self.name, "stopped");
        Ok(())
    }
}

impl<E: Event, C> Hsm<E, C> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> Status {
        self.runtime.borrow().status
    }

    pub fn machine(&self) -> &Machine<E, C> {
        &self.machine
    }

    /// Signatures of the active states, sorted.
    pub fn active_states(&self) -> Vec<Signature> {
        self.runtime.borrow().active.signatures(self.machine.tree())
    }

    pub fn is_active(&self, signature: &Signature) -> bool {
        self.machine
            .state(signature)
            .is_some_and(|id| self.runtime.borrow().active.contains(id))
    }

    pub fn with_context<R>(&self, f: impl FnOnce(&C) -> R) -> R {
        f(&self.runtime.borrow().context)
    }

    pub fn with_context_mut<R>(&self, f: impl FnOnce(&mut C) -> R) -> R {
        f(&mut self.runtime.borrow_mut().context)
    }

    pub fn history(&self) -> DispatchHistory {
        self.runtime.borrow().history.clone()
    }
}

impl<E: Event, C> fmt::Debug for Hsm<E, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let runtime = self.runtime.try_borrow();
        f.debug_struct("Hsm")
            .field("name", &self.name)
            .field("status", &runtime.as_ref().map(|r| r.status).ok())
            .field("machine", &self.machine)
            .finish()
    }
}

fn kick_start<E: Event, C: 'static>(machine: &Machine<E, C>, runtime: &RefCell<Runtime<C>>, name: &str) {
    let mut guard = runtime.borrow_mut();
    let runtime = &mut *guard;
    if runtime.status != Status::Running {
        debug!(machine = name, "stopped before the initial entry ran");
        return;
    }

    let (sequence, result) = engine::run_start(machine, &mut runtime.context);
    if let Err(err) = result {
        error!(machine = name, %err, "initial entry failed");
    }
    debug!(
        machine = name,
        active = ?sequence.active.signatures(machine.tree()),
        "started"
    );
    apply(machine, runtime, "start".to_string(), sequence);
}

fn handle<E: Event, C: 'static>(machine: &Machine<E, C>, runtime: &RefCell<Runtime<C>>, name: &str, event: &E) {
    let mut guard = runtime.borrow_mut();
    let runtime = &mut *guard;
    if runtime.status != Status::Running {
        return;
    }
    if runtime.active.is_empty() {
        warn!(machine = name, ?event, "event arrived before the initial entry; skipped");
        return;
    }

    let (sequence, result) = engine::run(machine, &runtime.active, event, &mut runtime.context);
    match result {
        Ok(()) if sequence.is_empty() => {
            trace!(machine = name, ?event, "event not handled");
            return;
        }
        Ok(()) => debug_assert!(
            !sequence.active.is_empty(),
            "a dispatch left machine '{name}' without active states"
        ),
        Err(err) => error!(machine = name, ?event, %err, "sequence failed; executed steps are kept"),
    }
    apply(machine, runtime, format!("{event:?}"), sequence);
}

fn apply<E: Event, C>(machine: &Machine<E, C>, runtime: &mut Runtime<C>, event: String, sequence: Sequence<E::Kind>) {
    let record = DispatchRecord {
        event,
        exits: sequence.exits.iter().map(|s| s.name.clone()).collect(),
        entries: sequence.entries.iter().map(|s| s.name.clone()).collect(),
        entered: sequence
            .entries
            .iter()
            .filter_map(|step| match &step.kind {
                StepKind::Enter(id) => Some(machine.tree().signature(*id).to_string()),
                _ => None,
            })
            .collect(),
        active: sequence
            .active
            .signatures(machine.tree())
            .iter()
            .map(Signature::to_string)
            .collect(),
        timestamp: Utc::now(),
    };
    runtime.history = runtime.history.record(record);
    runtime.active = sequence.active;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::StateSpec;
    use crate::core::Action;
    use crate::event_enum;
    use crate::machine::Transition;

    event_enum! {
        enum Door {
            OpenDoor,
            CloseDoor,
            Slam,
        }
    }

    fn door(context: Vec<String>) -> Result<Hsm<Door, Vec<String>>, HsmError> {
        let states = States::new().state(
            "top",
            StateSpec::composite(States::new().leaf("closed").leaf("opened")),
        );
        let transitions = Transitions::new()
            .initial("top", Transition::external("closed"))
            .on(
                "closed",
                Door::OpenDoor,
                Transition::external("opened")
                    .with_action(Action::new("log", |_, log: &mut Vec<String>| log.push("open".into()))),
            )
            .on("opened", Door::CloseDoor, Transition::external("closed"));
        Hsm::new(states, transitions, context)
    }

    fn names(hsm: &Hsm<Door, Vec<String>>) -> Vec<String> {
        hsm.active_states().iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn start_enters_root_and_records_history() {
        let hsm = door(Vec::new()).unwrap();
        let bus = EventBus::new();
        assert_eq!(hsm.status(), Status::NotStarted);

        hsm.start(&bus).unwrap();

        assert_eq!(hsm.status(), Status::Running);
        assert_eq!(names(&hsm), vec!["closed", "top"]);
        let history = hsm.history();
        let start = history.last().unwrap();
        assert_eq!(start.event, "start");
        assert_eq!(start.entries, vec!["top-entry", "top-Initial", "closed-entry"]);
        assert_eq!(start.entered, vec!["top", "closed"]);
        assert!(start.changed_state());
    }

    #[test]
    fn dispatch_runs_actions_against_context() {
        let hsm = door(Vec::new()).unwrap();
        let bus = EventBus::new();
        hsm.start(&bus).unwrap();

        bus.dispatch(Door::OpenDoor);

        assert_eq!(names(&hsm), vec!["opened", "top"]);
        assert_eq!(hsm.with_context(|log| log.clone()), vec!["open"]);
        assert_eq!(hsm.history().records().len(), 2);
    }

    #[test]
    fn unhandled_event_changes_nothing() {
        let hsm = door(Vec::new()).unwrap();
        let bus = EventBus::new();
        hsm.start(&bus).unwrap();

        bus.dispatch(Door::CloseDoor);
        bus.dispatch(Door::Slam);

        assert_eq!(names(&hsm), vec!["closed", "top"]);
        assert_eq!(hsm.history().records().len(), 1);
    }

    #[test]
    fn starting_twice_fails() {
        let hsm = door(Vec::new()).unwrap();
        let bus = EventBus::new();
        hsm.start(&bus).unwrap();

        assert!(matches!(hsm.start(&bus), Err(HsmError::AlreadyRunning { .. })));
    }

    #[test]
    fn stop_unsubscribes_and_keeps_states() {
        let hsm = door(Vec::new()).unwrap();
        let bus = EventBus::new();
        hsm.start(&bus).unwrap();

        hsm.stop().unwrap();
        bus.dispatch(Door::OpenDoor);

        assert_eq!(hsm.status(), Status::Stopped);
        assert_eq!(names(&hsm), vec!["closed", "top"]);
        assert_eq!(bus.listener_count(Topic::Kind(Door::OpenDoor)), 0);
        hsm.stop().unwrap();
    }

    #[test]
    fn restart_performs_a_fresh_initial_entry() {
        let hsm = door(Vec::new()).unwrap();
        let bus = EventBus::new();
        hsm.start(&bus).unwrap();
        bus.dispatch(Door::OpenDoor);
        hsm.stop().unwrap();

        hsm.start(&bus).unwrap();

        assert_eq!(hsm.status(), Status::Running);
        assert_eq!(names(&hsm), vec!["closed", "top"]);
    }

    #[test]
    fn stop_discards_a_pending_initial_entry() {
        let hsm = Rc::new(door(Vec::new()).unwrap());
        let bus = EventBus::new();
        {
            let hsm = Rc::clone(&hsm);
            let inner = bus.clone();
            bus.register(Topic::Kind(Door::Slam), move |_| {
                hsm.start(&inner).unwrap();
                hsm.stop().unwrap();
                hsm.start(&inner).unwrap();
            });
        }

        bus.dispatch(Door::Slam);

        let history = hsm.history();
        assert_eq!(history.records().len(), 1);
        assert_eq!(history.records()[0].event, "start");
        assert_eq!(names(&hsm), vec!["closed", "top"]);
        // The Slam listener plus one handler per kind in the table.
        assert_eq!(bus.topic_count(), 3);
    }

    #[test]
    fn start_listener_removes_itself() {
        let hsm = door(Vec::new()).unwrap();
        let bus = EventBus::new();
        hsm.start(&bus).unwrap();

        // One listener per event kind used in the table, nothing else.
        let registered: usize = Door::kinds()
            .into_iter()
            .map(|kind| bus.listener_count(Topic::Kind(kind)))
            .sum();
        assert_eq!(registered, 2);
        assert_eq!(bus.topic_count(), 2);
        assert_eq!(bus.pending(), 0);
    }

    #[test]
    fn invalid_machine_is_rejected_with_report() {
        let states = States::new().state(
            "top",
            StateSpec::composite(States::new().leaf("a")),
        );
        let result: Result<Hsm<Door, ()>, _> = Hsm::new(states, Transitions::new(), ());

        match result {
            Err(HsmError::Invalid(report)) => assert_eq!(report.len(), 1),
            other => panic!("expected a validation report, got {other:?}"),
        }
    }

    #[test]
    fn skip_validation_builds_anyway() {
        let states = States::new().state(
            "top",
            StateSpec::composite(States::new().leaf("a")),
        );
        let config = HsmConfig {
            skip_validation: true,
            ..HsmConfig::named("lenient")
        };
        let hsm: Hsm<Door, ()> = Hsm::with_config(states, Transitions::new(), (), config).unwrap();
        let bus = EventBus::new();

        hsm.start(&bus).unwrap();

        // The initial entry stops at `top`, which has no initial transition.
        assert_eq!(hsm.active_states(), vec![Signature::local("top")]);
        assert_eq!(hsm.name(), "lenient");
    }

    #[test]
    fn history_respects_configured_limit() {
        let states = States::new().state(
            "top",
            StateSpec::composite(States::new().leaf("closed").leaf("opened")),
        );
        let transitions = Transitions::new()
            .initial("top", Transition::external("closed"))
            .on("closed", Door::OpenDoor, Transition::external("opened"))
            .on("opened", Door::CloseDoor, Transition::external("closed"));
        let config = HsmConfig {
            history_limit: Some(2),
            ..HsmConfig::default()
        };
        let hsm: Hsm<Door, ()> = Hsm::with_config(states, transitions, (), config).unwrap();
        let bus = EventBus::new();
        hsm.start(&bus).unwrap();

        bus.dispatch(Door::OpenDoor);
        bus.dispatch(Door::CloseDoor);

        let history = hsm.history();
        assert_eq!(history.records().len(), 2);
        assert_eq!(history.records()[0].event, "OpenDoor");
        assert_eq!(history.last().unwrap().active, vec!["closed", "top"]);
    }
}
