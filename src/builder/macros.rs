//! Macros for ergonomic event declarations.

/// Declare a fieldless event enum that serves as its own event kind.
///
/// The optional `is_a` clause declares the subtype relation used when a
/// machine subscribes to a bus.
///
/// # Example
///
/// ```
/// use statecraft::core::{is_a, Event};
/// use statecraft::event_enum;
///
/// event_enum! {
///     pub enum Input {
///         Key,
///         Enter,
///         Click,
///     }
///     is_a: [Enter => Key]
/// }
///
/// assert_eq!(Input::Enter.kind(), Input::Enter);
/// assert!(is_a::<Input>(Input::Enter, Input::Key));
/// assert_eq!(Input::kinds().len(), 3);
/// ```
#[macro_export]
macro_rules! event_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident
            ),* $(,)?
        }

        $(is_a: [$($child:ident => $parent:ident),* $(,)?])?
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant
            ),*
        }

        impl $crate::core::Event for $name {
            type Kind = $name;

            fn kind(&self) -> Self::Kind {
                *self
            }

            #[allow(unreachable_patterns)]
            fn supertype(kind: Self::Kind) -> Option<Self::Kind> {
                match kind {
                    $($(Self::$child => Some(Self::$parent),)*)?
                    _ => None,
                }
            }

            fn kinds() -> Vec<Self::Kind> {
                vec![$(Self::$variant),*]
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::core::{is_a, subscription_set, Event};

    event_enum! {
        enum TestEvent {
            Input,
            Key,
            Enter,
            Tick,
        }
        is_a: [Key => Input, Enter => Key]
    }

    #[test]
    fn event_enum_macro_generates_trait() {
        assert_eq!(TestEvent::Tick.kind(), TestEvent::Tick);
        assert_eq!(TestEvent::supertype(TestEvent::Enter), Some(TestEvent::Key));
        assert_eq!(TestEvent::supertype(TestEvent::Tick), None);
        assert_eq!(TestEvent::kinds().len(), 4);
    }

    #[test]
    fn declared_relation_is_transitive() {
        assert!(is_a::<TestEvent>(TestEvent::Enter, TestEvent::Input));
        assert!(!is_a::<TestEvent>(TestEvent::Tick, TestEvent::Input));

        let set = subscription_set::<TestEvent, _>([TestEvent::Input]);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn event_enum_supports_visibility() {
        event_enum! {
            pub enum PublicEvent {
                A,
                B,
            }
        }

        assert_eq!(PublicEvent::B.kind(), PublicEvent::B);
    }

    #[test]
    fn event_enum_works_without_relation() {
        event_enum! {
            enum MinimalEvent {
                One,
                Two,
            }
        }

        assert_eq!(MinimalEvent::supertype(MinimalEvent::One), None);
        assert_eq!(MinimalEvent::kinds(), vec![MinimalEvent::One, MinimalEvent::Two]);
    }
}
