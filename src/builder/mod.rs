//! Builder API for ergonomic state machine construction.
//!
//! Machines are described with plain values: [`States`] holds the hierarchy,
//! [`Transitions`] the table, and [`HsmBuilder`] wires both to a context and
//! a configuration. Region prefixes and parent links are only assigned when
//! the description is built into a [`Machine`](crate::machine::Machine).

pub mod error;
pub mod machine;
pub mod macros;
pub mod states;
pub mod transitions;

pub use error::BuildError;
pub use machine::HsmBuilder;
pub use states::{Region, StateSpec, States};
pub use transitions::Transitions;
