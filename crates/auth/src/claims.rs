use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use encore_core::SubjectId;

use crate::{Identity, RoleSet};

/// Claims payload carried inside a credential (transport-agnostic).
///
/// Every field is optional at the wire level; [`validate_claims`] decides
/// which ones are required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialClaims {
    /// Numeric subject identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<SubjectClaim>,

    /// Standard subject claim; fallback for `id` and `username`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Roles, either a JSON array or a comma-delimited string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<RolesClaim>,

    /// Expiration (unix seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// Issued-at (unix seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubjectClaim {
    Number(i64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RolesClaim {
    List(Vec<String>),
    Delimited(String),
}

impl RolesClaim {
    pub fn normalize(&self) -> RoleSet {
        match self {
            RolesClaim::List(tags) => RoleSet::from_tags(tags),
            RolesClaim::Delimited(raw) => RoleSet::from_delimited(raw),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClaimsError {
    #[error("credential has expired")]
    Expired,

    #[error("invalid credential time window (exp <= iat)")]
    InvalidTimeWindow,

    #[error("missing required claim '{0}'")]
    MissingClaim(&'static str),

    #[error("subject claim is not a numeric id: {0}")]
    InvalidSubject(String),
}

/// Deterministically validate claims and extract the identity they describe.
///
/// Note: this validates the *claims* only. Signature verification is the
/// remote service's job; the client treats the credential as opaque proof.
pub fn validate_claims(claims: &CredentialClaims, now: DateTime<Utc>) -> Result<Identity, ClaimsError> {
    if let (Some(exp), Some(iat)) = (claims.exp, claims.iat) {
        if exp <= iat {
            return Err(ClaimsError::InvalidTimeWindow);
        }
    }
    if let Some(exp) = claims.exp {
        if now.timestamp() >= exp {
            return Err(ClaimsError::Expired);
        }
    }

    let subject_id = subject_id(claims)?;
    let display_name = non_blank(claims.username.as_deref())
        .or_else(|| non_blank(claims.sub.as_deref()))
        .ok_or(ClaimsError::MissingClaim("username"))?
        .to_string();
    let roles = claims
        .roles
        .as_ref()
        .map(RolesClaim::normalize)
        .unwrap_or_default();

    Ok(Identity {
        subject_id,
        display_name,
        roles,
    })
}

fn subject_id(claims: &CredentialClaims) -> Result<SubjectId, ClaimsError> {
    match &claims.id {
        Some(SubjectClaim::Number(n)) => Ok(SubjectId::new(*n)),
        Some(SubjectClaim::Text(raw)) => raw
            .parse()
            .map_err(|_| ClaimsError::InvalidSubject(raw.clone())),
        None => match non_blank(claims.sub.as_deref()) {
            Some(sub) => sub
                .parse()
                .map_err(|_| ClaimsError::InvalidSubject(sub.to_string())),
            None => Err(ClaimsError::MissingClaim("id")),
        },
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap()
    }

    fn claims() -> CredentialClaims {
        CredentialClaims {
            id: Some(SubjectClaim::Number(7)),
            username: Some("ana".to_string()),
            roles: Some(RolesClaim::Delimited("ROLE_USER,ROLE_ADMIN".to_string())),
            exp: Some(now().timestamp() + 3600),
            ..CredentialClaims::default()
        }
    }

    #[test]
    fn extracts_identity_from_complete_claims() {
        let identity = validate_claims(&claims(), now()).unwrap();
        assert_eq!(identity.subject_id, SubjectId::new(7));
        assert_eq!(identity.display_name, "ana");
        assert!(identity.is_admin());
    }

    #[test]
    fn expired_claims_are_rejected() {
        let mut c = claims();
        c.exp = Some(now().timestamp());
        assert_eq!(validate_claims(&c, now()), Err(ClaimsError::Expired));
    }

    #[test]
    fn missing_id_and_sub_is_rejected() {
        let mut c = claims();
        c.id = None;
        assert_eq!(validate_claims(&c, now()), Err(ClaimsError::MissingClaim("id")));
    }

    #[test]
    fn numeric_sub_stands_in_for_id_and_name() {
        let c = CredentialClaims {
            sub: Some("12".to_string()),
            ..CredentialClaims::default()
        };
        let identity = validate_claims(&c, now()).unwrap();
        assert_eq!(identity.subject_id, SubjectId::new(12));
        assert_eq!(identity.display_name, "12");
        assert!(identity.roles.is_empty());
    }

    #[test]
    fn textual_id_must_be_numeric() {
        let mut c = claims();
        c.id = Some(SubjectClaim::Text("abc".to_string()));
        assert_eq!(
            validate_claims(&c, now()),
            Err(ClaimsError::InvalidSubject("abc".to_string()))
        );
    }

    #[test]
    fn inverted_time_window_is_rejected() {
        let mut c = claims();
        c.iat = c.exp.map(|exp| exp + 1);
        assert_eq!(validate_claims(&c, now()), Err(ClaimsError::InvalidTimeWindow));
    }

    #[test]
    fn roles_accept_either_wire_form() {
        let list: CredentialClaims =
            serde_json::from_str(r#"{"id":1,"username":"a","roles":["ROLE_USER","ROLE_USER"]}"#).unwrap();
        let text: CredentialClaims =
            serde_json::from_str(r#"{"id":"1","username":"a","roles":"ROLE_USER"}"#).unwrap();

        let a = validate_claims(&list, now()).unwrap();
        let b = validate_claims(&text, now()).unwrap();
        assert_eq!(a, b);
    }
}
