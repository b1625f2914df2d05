//! `encore-auth` — credential decoding and role model.
//!
//! This crate is decoupled from HTTP and storage: it turns an opaque
//! credential string into an [`Identity`] or a [`DecodeError`].

pub mod claims;
pub mod credential;
pub mod decode;
pub mod identity;
pub mod roles;

pub use claims::{ClaimsError, CredentialClaims, RolesClaim, SubjectClaim, validate_claims};
pub use credential::Credential;
pub use decode::{CredentialDecoder, DecodeError, JwtCredentialDecoder};
pub use identity::Identity;
pub use roles::{Role, RoleSet};
