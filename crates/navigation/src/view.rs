use std::str::FromStr;

use thiserror::Error;

use encore_session::Session;

/// A screen of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    Home,
    Login,
    Register,
    Artists,
    EventDetails,
    Dashboard,
    Admin,
    EditArtist,
    EditEvent,
}

impl View {
    pub const ALL: [View; 9] = [
        View::Home,
        View::Login,
        View::Register,
        View::Artists,
        View::EventDetails,
        View::Dashboard,
        View::Admin,
        View::EditArtist,
        View::EditEvent,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            View::Home => "home",
            View::Login => "login",
            View::Register => "register",
            View::Artists => "artists",
            View::EventDetails => "eventDetails",
            View::Dashboard => "dashboard",
            View::Admin => "admin",
            View::EditArtist => "editArtist",
            View::EditEvent => "editEvent",
        }
    }

    /// Who may open the view.
    pub const fn access(self) -> Access {
        match self {
            View::Home | View::Artists | View::EventDetails => Access::Public,
            View::Login | View::Register => Access::GuestOnly,
            View::Dashboard => Access::Authenticated,
            View::Admin | View::EditArtist | View::EditEvent => Access::Admin,
        }
    }

    /// Views whose target id means something.
    pub const fn takes_target(self) -> bool {
        matches!(self, View::EventDetails | View::EditArtist | View::EditEvent)
    }

    /// Views that may stay open right after the session becomes anonymous.
    pub const fn survives_logout(self) -> bool {
        matches!(
            self,
            View::Home | View::Login | View::Register | View::Artists | View::EventDetails
        )
    }

    /// Views that may stay open right after the session becomes authenticated.
    pub const fn survives_login(self) -> bool {
        matches!(
            self,
            View::Dashboard
                | View::Admin
                | View::EditArtist
                | View::EditEvent
                | View::Artists
                | View::EventDetails
                | View::Home
        )
    }
}

impl core::fmt::Display for View {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown view: {0}")]
pub struct ParseViewError(pub String);

impl FromStr for View {
    type Err = ParseViewError;

    /// Accepts the canonical camelCase names as well as kebab/snake case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();

        View::ALL
            .into_iter()
            .find(|view| view.as_str().eq_ignore_ascii_case(&folded))
            .ok_or_else(|| ParseViewError(s.to_string()))
    }
}

/// Access requirement of a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Anyone; authenticated users may get extra affordances.
    Public,
    /// Only while anonymous (login, register).
    GuestOnly,
    Authenticated,
    Admin,
}

/// The session as far as access decisions are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Standing {
    Anonymous,
    Member,
    Administrator,
}

impl From<&Session> for Standing {
    fn from(session: &Session) -> Self {
        if session.is_admin() {
            Standing::Administrator
        } else if session.is_authenticated() {
            Standing::Member
        } else {
            Standing::Anonymous
        }
    }
}
