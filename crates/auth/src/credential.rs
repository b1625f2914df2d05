use serde::{Deserialize, Serialize};

const BEARER_PREFIX: &str = "bearer ";

/// Opaque credential string as issued by the authentication endpoint.
///
/// The raw value is kept verbatim (minus surrounding whitespace) because it is
/// what gets persisted in the credential slot. The remote sometimes hands out
/// the token already prefixed with `Bearer `; [`Credential::token`] strips it.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    /// Returns `None` for blank input.
    pub fn parse(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    /// The value exactly as persisted.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The bare token, without any `Bearer ` prefix.
    pub fn token(&self) -> &str {
        let raw = self.0.as_str();
        match raw.get(..BEARER_PREFIX.len()) {
            Some(prefix) if prefix.eq_ignore_ascii_case(BEARER_PREFIX) => {
                raw[BEARER_PREFIX.len()..].trim_start()
            }
            _ => raw,
        }
    }

    /// Value for an `Authorization` header.
    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.token())
    }
}

impl core::fmt::Debug for Credential {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}
