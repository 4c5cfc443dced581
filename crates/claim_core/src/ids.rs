//! Identifier newtypes and shared scalar aliases.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Seconds since the Unix epoch.
pub type Timestamp = u64;

/// Quantity of each resource needed for one construction or upgrade step.
pub type ResourceCost = BTreeMap<ResourceId, u64>;

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl $name {
            #[doc = concat!("Create a new `", stringify!($name), "`.")]
            #[must_use]
            pub const fn new(id: u64) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

numeric_id!(
    /// Player identifier, assigned by the authentication collaborator.
    OwnerId
);
numeric_id!(
    /// Committed territory identifier, issued by the registry.
    TerritoryId
);
numeric_id!(
    /// Player building identifier, issued by the building engine.
    BuildingId
);
numeric_id!(
    /// Capture session identifier.
    SessionId
);

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            #[doc = concat!("Create a new `", stringify!($name), "`.")]
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the raw identifier.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Building template identifier from the static catalog (e.g. `"sawmill"`).
    TemplateId
);
string_id!(
    /// Resource identifier in the ledger (e.g. `"wood"`).
    ResourceId
);

/// Build a [`ResourceCost`] from `(resource, quantity)` pairs.
#[must_use]
pub fn cost<'a>(entries: impl IntoIterator<Item = (&'a str, u64)>) -> ResourceCost {
    entries
        .into_iter()
        .map(|(resource, quantity)| (ResourceId::from(resource), quantity))
        .collect()
}
