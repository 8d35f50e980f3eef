//! Fixed-size identifiers for personas, friend peers and owner nodes.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::ReputationError;

macro_rules! fixed_id {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
        )]
        pub struct $name(pub [u8; $len]);

        impl $name {
            /// Length of the identifier in bytes
            pub const LENGTH: usize = $len;

            /// The all-zero identifier, used as "no identity"
            pub const fn null() -> Self {
                $name([0; $len])
            }

            /// Whether this is the all-zero identifier
            pub fn is_null(&self) -> bool {
                self.0.iter().all(|b| *b == 0)
            }

            /// Raw bytes of the identifier
            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&hex::encode(self.0))
            }
        }

        impl FromStr for $name {
            type Err = ReputationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let mut bytes = [0; $len];
                hex::decode_to_slice(s, &mut bytes).map_err(|e| ReputationError::InvalidId {
                    kind: stringify!($name),
                    input: s.to_string(),
                    msg: e.to_string(),
                })?;

                Ok($name(bytes))
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                $name(bytes)
            }
        }
    };
}

fixed_id!(
    /// Pseudonymous identity that can be rated
    PersonaId,
    16
);

fixed_id!(
    /// Directly connected friend with whom opinions are exchanged
    PeerId,
    16
);

fixed_id!(
    /// Cryptographic node that signs and owns one or more personas
    NodeId,
    8
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_display_and_parse() {
        let mut bytes = [0u8; 16];
        bytes[0] = 0xab;
        bytes[15] = 0x01;
        let persona = PersonaId(bytes);
        let s = persona.to_string();

        assert_eq!(s, "ab000000000000000000000000000001");
        assert_eq!(s.parse::<PersonaId>().unwrap(), persona);
    }

    #[test]
    fn parse_rejects_wrong_length() {
        assert!("abcd".parse::<NodeId>().is_err());
        assert!("zz00000000000000".parse::<NodeId>().is_err());
        assert!("0102030405060708".parse::<NodeId>().is_ok());
    }

    #[test]
    fn null_ids() {
        assert!(PersonaId::null().is_null());
        assert!(PersonaId::default().is_null());
        assert!(!PeerId([1; 16]).is_null());
    }
}
