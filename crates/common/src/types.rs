use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_newtype {
    ($(#[$attr:meta])* $name:ident) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generates a fresh random (v4) identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

uuid_newtype!(
    /// Identity of one aggregate instance (an order, a kitchen, a menu item).
    ///
    /// Combined with the aggregate type name it forms the key of a stored state.
    AggregateId
);

uuid_newtype!(
    /// Identity of one raised event. Never reused, even across aggregates.
    EventId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_differ() {
        assert_ne!(AggregateId::new(), AggregateId::new());
        assert_ne!(EventId::new(), EventId::default());
    }

    #[test]
    fn uuid_conversions_are_lossless() {
        let uuid = Uuid::new_v4();
        assert_eq!(AggregateId::from(uuid).as_uuid(), uuid);
        assert_eq!(Uuid::from(EventId::from_uuid(uuid)), uuid);
    }

    #[test]
    fn displays_as_hyphenated_uuid() {
        let uuid = Uuid::new_v4();
        assert_eq!(AggregateId::from_uuid(uuid).to_string(), uuid.to_string());
        assert_eq!(EventId::from_uuid(uuid).to_string(), uuid.to_string());
    }

    #[test]
    fn serializes_as_bare_uuid_string() {
        let id = AggregateId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.as_uuid()));
        let back: AggregateId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
