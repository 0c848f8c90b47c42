//! Websafe entity keys.
//!
//! A key is a kind prefix plus a UUID, e.g. `event-6f1c...`. Ownership and
//! parentage are explicit columns on the records, never encoded in the key.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;

macro_rules! websafe_key {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(Uuid);

        impl $name {
            pub const PREFIX: &'static str = $prefix;

            /// Allocate a fresh key.
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", Self::PREFIX, self.0)
            }
        }

        impl FromStr for $name {
            type Err = AppError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.strip_prefix(Self::PREFIX)
                    .and_then(|rest| rest.strip_prefix('-'))
                    .and_then(|raw| Uuid::parse_str(raw).ok())
                    .map(Self)
                    .ok_or_else(|| {
                        AppError::BadRequest(format!(
                            "Malformed {} key: {}",
                            Self::PREFIX,
                            s
                        ))
                    })
            }
        }

        impl TryFrom<String> for $name {
            type Error = AppError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for String {
            fn from(key: $name) -> Self {
                key.to_string()
            }
        }
    };
}

websafe_key!(
    /// Key of an event (conference).
    EventKey,
    "event"
);

websafe_key!(
    /// Key of a session inside an event.
    SessionKey,
    "session"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_parse_roundtrip() {
        let key = EventKey::generate();
        let parsed: EventKey = key.to_string().parse().unwrap();
        assert_eq!(parsed, key);
        assert!(key.to_string().starts_with("event-"));
    }

    #[test]
    fn test_wrong_kind_is_rejected() {
        let session = SessionKey::generate().to_string();
        let err = session.parse::<EventKey>().unwrap_err();
        assert_eq!(err.error_code(), "BAD_REQUEST");
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!("session-not-a-uuid".parse::<SessionKey>().is_err());
        assert!("".parse::<SessionKey>().is_err());
        assert!("session".parse::<SessionKey>().is_err());
    }

    #[test]
    fn test_serde_uses_websafe_form() {
        let key = SessionKey::generate();
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, format!("\"{}\"", key));
        let back: SessionKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
        assert!(serde_json::from_str::<SessionKey>("\"event-123\"").is_err());
    }
}
