//! Navigation guard.
//!
//! Pure functions from (requested view, session) to the view that is actually
//! shown. The decision table lives in [`decide`]; everything else is plumbing.

use encore_core::{ArtistId, EventId};
use encore_session::{Session, SessionChange};

use crate::view::{Access, Standing, View};

/// Something the user should be told about a navigation decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideEffect {
    /// Authenticated, but the view needs the admin role.
    AccessDenied,
    /// An action needing a session was attempted anonymously.
    RequireLogin,
    /// The remote rejected the credential and the session was ended.
    SessionExpired,
}

impl SideEffect {
    pub fn message(self) -> &'static str {
        match self {
            SideEffect::AccessDenied => "Access denied: administrator role required.",
            SideEffect::RequireLogin => "You must log in to do that.",
            SideEffect::SessionExpired => "Session expired or insufficient permission. Please log in again.",
        }
    }
}

/// Current view plus its optional target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationState {
    pub view: View,
    pub target_id: Option<i64>,
}

impl NavigationState {
    /// Drops the target for views that do not take one.
    pub fn new(view: View, target_id: Option<i64>) -> Self {
        Self {
            view,
            target_id: target_id.filter(|_| view.takes_target()),
        }
    }

    pub fn home() -> Self {
        Self::new(View::Home, None)
    }

    pub fn event_id(&self) -> Option<EventId> {
        match self.view {
            View::EventDetails | View::EditEvent => self.target_id.map(EventId::new),
            _ => None,
        }
    }

    pub fn artist_id(&self) -> Option<ArtistId> {
        match self.view {
            View::EditArtist => self.target_id.map(ArtistId::new),
            _ => None,
        }
    }
}

impl Default for NavigationState {
    fn default() -> Self {
        Self::home()
    }
}

impl core::fmt::Display for NavigationState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.target_id {
            Some(id) => write!(f, "{}/{}", self.view, id),
            None => write!(f, "{}", self.view),
        }
    }
}

/// Outcome of a navigation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub state: NavigationState,
    pub effect: Option<SideEffect>,
}

impl Resolution {
    pub fn view(&self) -> View {
        self.state.view
    }

    pub fn target_id(&self) -> Option<i64> {
        self.state.target_id
    }
}

enum Decision {
    Allow,
    Redirect(View, Option<SideEffect>),
}

/// The access table.
fn decide(access: Access, standing: Standing) -> Decision {
    use Access as A;
    use Standing as S;

    match (access, standing) {
        (A::GuestOnly, S::Member | S::Administrator) => Decision::Redirect(View::Dashboard, None),
        (A::Authenticated | A::Admin, S::Anonymous) => Decision::Redirect(View::Login, None),
        (A::Admin, S::Member) => Decision::Redirect(View::Dashboard, Some(SideEffect::AccessDenied)),

        (A::Public, _) => Decision::Allow,
        (A::GuestOnly, S::Anonymous) => Decision::Allow,
        (A::Authenticated, S::Member | S::Administrator) => Decision::Allow,
        (A::Admin, S::Administrator) => Decision::Allow,
    }
}

/// Decides which view a navigation request actually lands on.
///
/// Redirects always clear the target id.
pub fn resolve(requested: View, target_id: Option<i64>, session: &Session) -> Resolution {
    match decide(requested.access(), Standing::from(session)) {
        Decision::Allow => Resolution {
            state: NavigationState::new(requested, target_id),
            effect: None,
        },
        Decision::Redirect(view, effect) => Resolution {
            state: NavigationState::new(view, None),
            effect,
        },
    }
}

/// Corrects the current view after a session transition, if needed.
///
/// Logout and login have their own fallbacks (home and dashboard). Any other
/// change, such as a credential swap that drops the admin role, re-runs the
/// access table for the new session.
pub fn on_session_change(current: &NavigationState, change: &SessionChange) -> Option<Resolution> {
    if change.became_anonymous() && !current.view.survives_logout() {
        return Some(Resolution {
            state: NavigationState::home(),
            effect: None,
        });
    }
    if change.became_authenticated() && !current.view.survives_login() {
        return Some(Resolution {
            state: NavigationState::new(View::Dashboard, None),
            effect: None,
        });
    }

    let resolution = resolve(current.view, current.target_id, &change.current);
    (resolution.state != *current).then_some(resolution)
}

/// Redirect for an action that needs a session, or `None` when one exists.
pub fn require_login(session: &Session) -> Option<Resolution> {
    if session.is_authenticated() {
        return None;
    }
    Some(Resolution {
        state: NavigationState::new(View::Login, None),
        effect: Some(SideEffect::RequireLogin),
    })
}
