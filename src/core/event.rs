//! Event trait and transition triggers.
//!
//! Events form a closed set of kinds. Subtyping between kinds is declared
//! explicitly through [`Event::supertype`] rather than discovered from a type
//! hierarchy, and the dispatcher follows that relation when it decides which
//! kinds a machine listens to.

use std::collections::BTreeSet;
use std::fmt::{self, Debug};
use std::hash::Hash;

/// Trait for events delivered to a state machine.
///
/// # Example
///
/// ```rust
/// use statecraft::core::Event;
///
/// #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// enum DoorKind {
///     Open,
///     Close,
///     Slam,
/// }
///
/// #[derive(Clone, Debug)]
/// enum DoorEvent {
///     Open,
///     Close,
///     Slam { force: u8 },
/// }
///
/// impl Event for DoorEvent {
///     type Kind = DoorKind;
///
///     fn kind(&self) -> DoorKind {
///         match self {
///             Self::Open => DoorKind::Open,
///             Self::Close => DoorKind::Close,
///             Self::Slam { .. } => DoorKind::Slam,
///         }
///     }
///
///     // A slam is a kind of close.
///     fn supertype(kind: DoorKind) -> Option<DoorKind> {
///         match kind {
///             DoorKind::Slam => Some(DoorKind::Close),
///             _ => None,
///         }
///     }
///
///     fn kinds() -> Vec<DoorKind> {
///         vec![DoorKind::Open, DoorKind::Close, DoorKind::Slam]
///     }
/// }
///
/// assert_eq!(DoorEvent::Slam { force: 9 }.kind(), DoorKind::Slam);
/// ```
pub trait Event: Clone + Debug + 'static {
    /// Discriminant used to key transition tables and bus topics.
    type Kind: Copy + Eq + Ord + Hash + Debug + 'static;

    /// Kind of this event instance.
    fn kind(&self) -> Self::Kind;

    /// Direct parent of `kind` in the is-a relation.
    ///
    /// Default implementation declares no subtyping.
    fn supertype(kind: Self::Kind) -> Option<Self::Kind> {
        let _ = kind;
        None
    }

    /// Every kind in the closed set.
    ///
    /// Only needed when [`Event::supertype`] declares subtypes; the default
    /// returns an empty list.
    fn kinds() -> Vec<Self::Kind> {
        Vec::new()
    }
}

/// Returns true if `kind` is `ancestor` or declares it as a (transitive) supertype.
pub fn is_a<E: Event>(kind: E::Kind, ancestor: E::Kind) -> bool {
    let mut seen = BTreeSet::new();
    let mut current = Some(kind);
    while let Some(k) = current {
        if k == ancestor {
            return true;
        }
        if !seen.insert(k) {
            return false;
        }
        current = E::supertype(k);
    }
    false
}

/// Kinds a listener for `kinds` has to subscribe to: the kinds themselves plus
/// every declared subtype of any of them.
pub fn subscription_set<E, I>(kinds: I) -> BTreeSet<E::Kind>
where
    E: Event,
    I: IntoIterator<Item = E::Kind>,
{
    let wanted: BTreeSet<E::Kind> = kinds.into_iter().collect();
    let mut set = wanted.clone();
    for candidate in E::kinds() {
        if wanted.iter().any(|&w| is_a::<E>(candidate, w)) {
            set.insert(candidate);
        }
    }
    set
}

/// What a transition table entry reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Trigger<K> {
    /// Sentinel used for a composite state's default entry.
    Initial,
    /// An ordinary event kind.
    Event(K),
}

impl<K: Debug> fmt::Display for Trigger<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initial => f.write_str("Initial"),
            Self::Event(kind) => write!(f, "{kind:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
    enum Kind {
        Input,
        Key,
        Enter,
        Mouse,
        Tick,
    }

    #[derive(Clone, Debug)]
    struct TestEvent(Kind);

    impl Event for TestEvent {
        type Kind = Kind;

        fn kind(&self) -> Kind {
            self.0
        }

        fn supertype(kind: Kind) -> Option<Kind> {
            match kind {
                Kind::Key | Kind::Mouse => Some(Kind::Input),
                Kind::Enter => Some(Kind::Key),
                _ => None,
            }
        }

        fn kinds() -> Vec<Kind> {
            vec![Kind::Input, Kind::Key, Kind::Enter, Kind::Mouse, Kind::Tick]
        }
    }

    #[test]
    fn is_a_follows_declared_chain() {
        assert!(is_a::<TestEvent>(Kind::Enter, Kind::Key));
        assert!(is_a::<TestEvent>(Kind::Enter, Kind::Input));
        assert!(is_a::<TestEvent>(Kind::Tick, Kind::Tick));
        assert!(!is_a::<TestEvent>(Kind::Input, Kind::Key));
        assert!(!is_a::<TestEvent>(Kind::Tick, Kind::Input));
    }

    #[test]
    fn subscription_set_includes_subtypes() {
        let set = subscription_set::<TestEvent, _>([Kind::Key]);
        assert_eq!(set.into_iter().collect::<Vec<_>>(), vec![Kind::Key, Kind::Enter]);

        let set = subscription_set::<TestEvent, _>([Kind::Input, Kind::Tick]);
        assert_eq!(set.len(), 5);
    }

    #[test]
    fn trigger_display_uses_kind_debug() {
        assert_eq!(Trigger::<Kind>::Initial.to_string(), "Initial");
        assert_eq!(Trigger::Event(Kind::Mouse).to_string(), "Mouse");
    }

    #[test]
    fn event_without_declared_relation_has_no_subtypes() {
        #[derive(Clone, Debug)]
        struct Plain;

        impl Event for Plain {
            type Kind = u8;

            fn kind(&self) -> u8 {
                0
            }
        }

        assert_eq!(subscription_set::<Plain, _>([0, 1]).len(), 2);
        assert!(!is_a::<Plain>(0, 1));
    }
}
