//! Builder for constructing orchestrated machines.

use crate::builder::error::BuildError;
use crate::builder::states::States;
use crate::builder::transitions::Transitions;
use crate::core::Event;
use crate::hsm::{Hsm, HsmConfig, HsmError};

/// Builder for an [`Hsm`] with a fluent API.
pub struct HsmBuilder<E: Event, C> {
    states: Option<States<E, C>>,
    transitions: Transitions<E, C>,
    context: Option<C>,
    config: HsmConfig,
}

impl<E: Event, C: 'static> HsmBuilder<E, C> {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            states: None,
            transitions: Transitions::new(),
            context: None,
            config: HsmConfig::default(),
        }
    }

    /// Set the state map (required).
    pub fn states(mut self, states: States<E, C>) -> Self {
        self.states = Some(states);
        self
    }

    /// Set the transition table.
    pub fn transitions(mut self, transitions: Transitions<E, C>) -> Self {
        self.transitions = transitions;
        self
    }

    /// Set the user context (required).
    pub fn context(mut self, context: C) -> Self {
        self.context = Some(context);
        self
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: HsmConfig) -> Self {
        self.config = config;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn skip_validation(mut self) -> Self {
        self.config.skip_validation = true;
        self
    }

    pub fn history_limit(mut self, limit: Option<usize>) -> Self {
        self.config.history_limit = limit;
        self
    }

    /// Build the machine.
    /// Returns an error if required fields are missing or the machine is
    /// malformed.
    pub fn build(self) -> Result<Hsm<E, C>, HsmError> {
        let states = self.states.ok_or(BuildError::MissingStates)?;
        let context = self.context.ok_or(BuildError::MissingContext)?;
        Hsm::with_config(states, self.transitions, context, self.config)
    }
}

impl<E: Event, C: Default + 'static> HsmBuilder<E, C> {
    /// Use `C::default()` as the context.
    pub fn default_context(self) -> Self {
        self.context(C::default())
    }
}

impl<E: Event, C: 'static> Default for HsmBuilder<E, C> {
    fn default() -> Self {
        Self::new()
    }
}
