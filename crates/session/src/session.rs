use encore_auth::{Credential, Identity};

/// The client's current belief about who is logged in.
///
/// `identity` exists only next to the credential it was decoded from, so an
/// authenticated session without a well-formed credential is unrepresentable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Session {
    #[default]
    Anonymous,
    Authenticated {
        credential: Credential,
        identity: Identity,
    },
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Session::Authenticated { .. })
    }

    pub fn is_admin(&self) -> bool {
        self.identity().is_some_and(Identity::is_admin)
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Session::Anonymous => None,
            Session::Authenticated { identity, .. } => Some(identity),
        }
    }

    pub fn credential(&self) -> Option<&Credential> {
        match self {
            Session::Anonymous => None,
            Session::Authenticated { credential, .. } => Some(credential),
        }
    }
}

impl core::fmt::Display for Session {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.identity() {
            None => f.write_str("anonymous"),
            Some(identity) if identity.is_admin() => write!(f, "{} (admin)", identity.display_name),
            Some(identity) => f.write_str(&identity.display_name),
        }
    }
}

/// What triggered a session transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeCause {
    Login,
    Logout,
    /// A stored or supplied credential failed to decode.
    DecodeFailure,
    /// Another context wrote a credential to the shared slot.
    ExternalLogin,
    /// Another context cleared the shared slot.
    ExternalLogout,
    /// The remote answered 401/403 to an authenticated request.
    AuthorizationFailure,
}

/// Published by the session manager after every effective transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionChange {
    pub previous: Session,
    pub current: Session,
    pub cause: ChangeCause,
    /// Session epoch after the change.
    pub epoch: u64,
}

impl SessionChange {
    pub fn became_anonymous(&self) -> bool {
        self.previous.is_authenticated() && !self.current.is_authenticated()
    }

    pub fn became_authenticated(&self) -> bool {
        !self.previous.is_authenticated() && self.current.is_authenticated()
    }
}
