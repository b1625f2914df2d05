//! Error classification.
//!
//! Every failure the user can trigger ends up in one [`ErrorClass`]. The
//! class decides how the application reacts; the single question asked of
//! every failure is [`ApiError::forces_logout`].

use thiserror::Error;

use encore_auth::DecodeError;
use encore_catalog::GateRejection;
use encore_core::DomainError;
use encore_navigation::SideEffect;
use encore_session::SessionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The credential does not decode. The session collapses silently.
    AuthenticationInvalid,
    /// 401/403. Ends the session when the call carried a credential.
    AuthorizationDenied,
    /// Rejected by a rule (locally or remotely). Cached state is untouched.
    PreconditionFailed,
    /// The change was already made.
    Conflict,
    /// Network trouble or a server fault; the user may retry by hand.
    Transient,
}

impl ErrorClass {
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => ErrorClass::AuthorizationDenied,
            409 => ErrorClass::Conflict,
            500..=599 => ErrorClass::Transient,
            _ => ErrorClass::PreconditionFailed,
        }
    }
}

impl From<&DecodeError> for ErrorClass {
    fn from(_: &DecodeError) -> Self {
        ErrorClass::AuthenticationInvalid
    }
}

/// Failure talking to the remote catalog.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("remote answered {status}: {message}")]
    Status { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            ApiError::Status { status, .. } => ErrorClass::from_status(*status),
            ApiError::Network(_) | ApiError::Decode(_) => ErrorClass::Transient,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether this failure must end the session.
    ///
    /// Only an authorization failure on a call that carried the credential
    /// does; a 403 on a public path is a content restriction.
    pub fn forces_logout(&self, authenticated_call: bool) -> bool {
        authenticated_call && self.class() == ErrorClass::AuthorizationDenied
    }

    pub fn user_message(&self) -> String {
        let detail = match self {
            ApiError::Status { message, .. } if !message.is_empty() => Some(message.as_str()),
            _ => None,
        };

        match (self.class(), detail) {
            (ErrorClass::AuthorizationDenied, _) => {
                "Session expired or insufficient permission.".to_string()
            }
            (ErrorClass::PreconditionFailed, Some(detail)) => format!("Request rejected: {detail}"),
            (ErrorClass::PreconditionFailed, None) => "Request rejected by the service.".to_string(),
            (ErrorClass::Conflict, Some(detail)) => format!("Already done: {detail}"),
            (ErrorClass::Conflict, None) => "Already done.".to_string(),
            (ErrorClass::Transient, _) | (ErrorClass::AuthenticationInvalid, _) => {
                "The service could not be reached. Please try again.".to_string()
            }
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Failure of a user action at the application layer.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("login required")]
    LoginRequired,

    #[error("administrator role required")]
    AccessDenied,

    #[error("the service returned a credential that could not be used")]
    InvalidCredential,

    #[error("{0} is not loaded in the current view")]
    NotLoaded(String),

    #[error(transparent)]
    Rejected(#[from] GateRejection),

    #[error(transparent)]
    Invalid(#[from] DomainError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl ActionError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ActionError::LoginRequired | ActionError::AccessDenied => ErrorClass::AuthorizationDenied,
            ActionError::InvalidCredential => ErrorClass::AuthenticationInvalid,
            ActionError::NotLoaded(_)
            | ActionError::Rejected(_)
            | ActionError::Invalid(_)
            | ActionError::Session(SessionError::EmptyCredential) => ErrorClass::PreconditionFailed,
            ActionError::Session(SessionError::Store(_)) => ErrorClass::Transient,
            ActionError::Api(err) => err.class(),
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            ActionError::LoginRequired => SideEffect::RequireLogin.message().to_string(),
            ActionError::AccessDenied => SideEffect::AccessDenied.message().to_string(),
            ActionError::Api(err) => err.user_message(),
            other => {
                let mut text = other.to_string();
                if let Some(first) = text.get_mut(..1) {
                    first.make_ascii_uppercase();
                }
                text
            }
        }
    }
}
