//! Statecraft: a hierarchical state machine engine
//!
//! Statecraft implements UML statechart semantics: nested composite states,
//! orthogonal regions that run side by side, and external, local, internal
//! and choice transitions. Events travel through a synchronous, FIFO event
//! bus that stays safe when handlers dispatch further events.
//!
//! The engine keeps a pure core: building a [`machine::Machine`] and
//! computing the exit/entry sequence for an event are pure functions over
//! immutable data, usable on their own through [`engine::plan`]. The
//! [`hsm::Hsm`] orchestrator is the imperative shell that owns the active
//! states and the user context and executes the computed steps.
//!
//! # Core Concepts
//!
//! - **Signature**: hierarchical state path, rendered as `a[2].sub[3].leaf`
//! - **Responder**: the deepest active state with a permitting transition
//! - **Sequence**: ordered exit and entry steps for one dispatch
//! - **Validator**: accumulates every structural defect before a machine runs
//!
//! # Example
//!
//! ```rust
//! use statecraft::builder::{StateSpec, States, Transitions};
//! use statecraft::bus::EventBus;
//! use statecraft::core::Action;
//! use statecraft::event_enum;
//! use statecraft::hsm::Hsm;
//! use statecraft::machine::Transition;
//!
//! event_enum! {
//!     enum Door { OpenDoor, CloseDoor }
//! }
//!
//! let states = States::new().state(
//!     "top",
//!     StateSpec::composite(States::new().leaf("closed").leaf("opened")),
//! );
//! let transitions = Transitions::new()
//!     .initial("top", Transition::external("closed"))
//!     .on(
//!         "closed",
//!         Door::OpenDoor,
//!         Transition::external("opened")
//!             .with_action(Action::new("count", |_, opened: &mut u32| *opened += 1)),
//!     )
//!     .on("opened", Door::CloseDoor, Transition::external("closed"));
//!
//! let hsm = Hsm::new(states, transitions, 0u32).unwrap();
//! let bus = EventBus::new();
//! hsm.start(&bus).unwrap();
//!
//! bus.dispatch(Door::OpenDoor);
//! bus.dispatch(Door::CloseDoor);
//! bus.dispatch(Door::OpenDoor);
//!
//! assert_eq!(hsm.with_context(|opened| *opened), 2);
//! let active: Vec<String> = hsm.active_states().iter().map(|s| s.to_string()).collect();
//! assert_eq!(active, vec!["opened", "top"]);
//! ```

pub mod builder;
pub mod bus;
pub mod core;
pub mod engine;
pub mod hsm;
pub mod machine;
pub mod validate;

// Re-export commonly used types
pub use builder::{HsmBuilder, Region, StateSpec, States, Transitions};
pub use bus::{EventBus, Topic};
pub use core::{Action, Event, Guard, KeyFn, Signature, Trigger};
pub use hsm::{Hsm, HsmConfig, HsmError, Status};
pub use machine::Transition;
