//! Identifier newtypes.
//!
//! The wire format (§6: "All UUIDs are 128-bit values encoded as canonical
//! lowercase hex strings") is preserved through `Display`/`FromStr`; the Rust
//! side additionally gets compile-time separation between id spaces instead
//! of passing raw `String`s around.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! uuid_newtype {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
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
                write!(f, "{}", self.0.hyphenated())
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

uuid_newtype!(TenantId);
uuid_newtype!(InstanceId);
uuid_newtype!(WorkloadId);
uuid_newtype!(NodeId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_canonical_lowercase_hex() {
        let id = TenantId::new();
        let rendered = id.to_string();
        assert_eq!(rendered, rendered.to_lowercase());
        let parsed: TenantId = rendered.parse().unwrap();
        assert_eq!(parsed, id);
    }
}
