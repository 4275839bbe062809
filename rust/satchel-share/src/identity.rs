//! Opaque identifiers.

use serde::{Deserialize, Serialize};

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing identifier
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// The identifier as a string
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }
    };
}

identifier! {
    /// A logged-in user, as established by the authentication layer
    UserId
}

identifier! {
    /// An uploaded file
    FileId
}

identifier! {
    /// A share capability. Doubles as the secret part of its share URL, so
    /// it is always random and never derived from anything else.
    CapabilityId
}

impl FileId {
    /// A fresh random file id
    pub fn generate() -> Self {
        Self(satchel_common::random_identifier())
    }
}

impl CapabilityId {
    /// A fresh random capability id
    pub fn generate() -> Self {
        Self(satchel_common::random_identifier())
    }

    /// Whether this id has the shape of one made by [CapabilityId::generate].
    /// Anything else cannot name a stored capability.
    pub fn is_well_formed(&self) -> bool {
        satchel_common::is_identifier(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_generates_distinct_ids() {
        assert_ne!(CapabilityId::generate(), CapabilityId::generate());
        assert_ne!(FileId::generate(), FileId::generate());
    }

    #[test]
    fn it_serializes_as_a_bare_string() {
        let id = UserId::new("alice");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"alice\"");
    }

    #[test]
    fn it_only_accepts_generated_capability_ids_as_well_formed() {
        assert!(CapabilityId::generate().is_well_formed());
        assert!(!CapabilityId::new("x".repeat(200)).is_well_formed());
        assert!(!CapabilityId::new("share-1").is_well_formed());
    }
}
