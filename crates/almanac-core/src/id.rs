//! Strongly-typed identifiers.
//!
//! Account and event IDs are distinct newtypes over [`Uuid`], so an ownership
//! check can only ever compare an `AccountId` with another `AccountId`.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! define_id {
  ($(#[$meta:meta])* $name:ident) => {
    $(#[$meta])*
    #[derive(
      Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
      Deserialize,
    )]
    #[serde(transparent)]
    pub struct $name(Uuid);

    impl $name {
      /// Generate a fresh random ID.
      pub fn new() -> Self { Self(Uuid::new_v4()) }

      pub const fn from_uuid(uuid: Uuid) -> Self { Self(uuid) }

      pub const fn as_uuid(&self) -> Uuid { self.0 }
    }

    impl Default for $name {
      fn default() -> Self { Self::new() }
    }

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
      }
    }

    impl FromStr for $name {
      type Err = uuid::Error;

      fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
      }
    }
  };
}

define_id!(
  /// Identifies an [`Account`](crate::account::Account).
  AccountId
);

define_id!(
  /// Identifies an [`Event`](crate::event::Event).
  EventId
);
