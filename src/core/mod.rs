//! Core value types shared by every other module.
//!
//! - Signatures and the dotted diagnostic name notation
//! - The `Event` trait, its explicit is-a relation, and transition triggers
//! - Guards, actions and choice key functions
//! - Immutable dispatch history

mod event;
mod guard;
mod history;
mod signature;

pub use event::{is_a, subscription_set, Event, Trigger};
pub use guard::{Action, Guard, KeyFn};
pub use history::{DispatchHistory, DispatchRecord};
pub use signature::{Segment, Signature, SignatureError};
