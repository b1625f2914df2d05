//! Strongly-typed identifiers used across the client.
//!
//! The remote catalog issues numeric identifiers; these newtypes keep artist,
//! event and subject ids from being mixed up.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Identifier of an artist.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtistId(i64);

/// Identifier of an event.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(i64);

/// Identifier of the authenticated subject (the logged-in user).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(i64);

macro_rules! impl_numeric_id {
    ($t:ty, $name:literal) => {
        impl $t {
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<i64> for $t {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$t> for i64 {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let value = s
                    .trim()
                    .parse::<i64>()
                    .map_err(|e| DomainError::invalid_id(format!("{}: {}", $name, e)))?;
                Ok(Self(value))
            }
        }
    };
}

impl_numeric_id!(ArtistId, "ArtistId");
impl_numeric_id!(EventId, "EventId");
impl_numeric_id!(SubjectId, "SubjectId");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_trimmed_numeric_ids() {
        assert_eq!(" 42 ".parse::<EventId>().unwrap(), EventId::new(42));
    }

    #[test]
    fn rejects_non_numeric_ids_with_type_name() {
        let err = "abc".parse::<ArtistId>().unwrap_err();
        match err {
            DomainError::InvalidId(msg) => assert!(msg.starts_with("ArtistId")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn serializes_transparently() {
        let json = serde_json::to_string(&SubjectId::new(7)).unwrap();
        assert_eq!(json, "7");
    }
}
