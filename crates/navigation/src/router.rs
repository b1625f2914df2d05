use encore_session::{Session, SessionChange};

use crate::guard::{self, NavigationState, Resolution};
use crate::view::View;

/// Proof that a view was showing when some async work started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewScope {
    generation: u64,
    state: NavigationState,
}

impl ViewScope {
    pub fn state(&self) -> NavigationState {
        self.state
    }
}

/// Holds the current view. Only the guard decides what goes in here.
///
/// Every change of view starts a new generation; scopes from an older
/// generation are no longer live.
#[derive(Debug, Default)]
pub struct ViewRouter {
    state: NavigationState,
    generation: u64,
}

impl ViewRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> NavigationState {
        self.state
    }

    pub fn view(&self) -> View {
        self.state.view
    }

    pub fn scope(&self) -> ViewScope {
        ViewScope {
            generation: self.generation,
            state: self.state,
        }
    }

    pub fn is_live(&self, scope: &ViewScope) -> bool {
        scope.generation == self.generation
    }

    /// Routes a navigation request through the guard and applies the result.
    pub fn navigate(&mut self, view: View, target_id: Option<i64>, session: &Session) -> Resolution {
        let resolution = guard::resolve(view, target_id, session);
        if resolution.view() != view {
            tracing::info!(requested = %view, resolved = %resolution.state, effect = ?resolution.effect, "navigation redirected");
        }
        self.show(resolution.state);
        resolution
    }

    /// Applies an already resolved decision, e.g. from [`guard::require_login`].
    pub fn apply(&mut self, resolution: &Resolution) {
        self.show(resolution.state);
    }

    /// Re-validates the current view after a session transition.
    pub fn on_session_change(&mut self, change: &SessionChange) -> Option<Resolution> {
        let resolution = guard::on_session_change(&self.state, change)?;
        tracing::info!(
            from = %self.state,
            to = %resolution.state,
            effect = ?resolution.effect,
            "view reset after session change"
        );
        self.show(resolution.state);
        Some(resolution)
    }

    /// Tears the current view down and shows it again, invalidating scopes.
    pub fn reload(&mut self) {
        self.generation += 1;
    }

    fn show(&mut self, next: NavigationState) {
        if next != self.state {
            self.state = next;
            self.generation += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encore_auth::{Credential, Identity, RoleSet};
    use encore_core::SubjectId;
    use encore_session::ChangeCause;

    use crate::guard::SideEffect;

    fn member() -> Session {
        Session::Authenticated {
            credential: Credential::parse("token").unwrap(),
            identity: Identity {
                subject_id: SubjectId::new(2),
                display_name: "bo".to_string(),
                roles: RoleSet::from_tags(["ROLE_USER"]),
            },
        }
    }

    #[test]
    fn switching_views_kills_old_scopes() {
        let mut router = ViewRouter::new();
        router.navigate(View::Dashboard, None, &member());
        let scope = router.scope();
        assert!(router.is_live(&scope));

        router.navigate(View::Dashboard, None, &member());
        assert!(router.is_live(&scope));

        router.navigate(View::Artists, None, &member());
        assert!(!router.is_live(&scope));
    }

    #[test]
    fn external_login_leaves_artists_in_place() {
        let mut router = ViewRouter::new();
        router.navigate(View::Artists, None, &Session::Anonymous);
        let scope = router.scope();

        let change = SessionChange {
            previous: Session::Anonymous,
            current: member(),
            cause: ChangeCause::ExternalLogin,
            epoch: 1,
        };
        assert_eq!(router.on_session_change(&change), None);
        assert_eq!(router.view(), View::Artists);
        assert!(router.is_live(&scope));
    }

    #[test]
    fn logout_from_dashboard_goes_home() {
        let mut router = ViewRouter::new();
        router.navigate(View::Dashboard, None, &member());
        let scope = router.scope();

        let change = SessionChange {
            previous: member(),
            current: Session::Anonymous,
            cause: ChangeCause::Logout,
            epoch: 2,
        };
        assert_eq!(router.on_session_change(&change).map(|r| r.state), Some(NavigationState::home()));
        assert!(!router.is_live(&scope));
    }

    #[test]
    fn demotion_on_an_admin_view_lands_on_dashboard() {
        let admin = Session::Authenticated {
            credential: Credential::parse("admin-token").unwrap(),
            identity: Identity {
                subject_id: SubjectId::new(1),
                display_name: "root".to_string(),
                roles: RoleSet::from_tags(["ROLE_ADMIN"]),
            },
        };
        let mut router = ViewRouter::new();
        router.navigate(View::EditArtist, Some(4), &admin);
        let scope = router.scope();

        let change = SessionChange {
            previous: admin,
            current: member(),
            cause: ChangeCause::ExternalLogin,
            epoch: 3,
        };
        let resolution = router.on_session_change(&change).unwrap();

        assert_eq!(resolution.effect, Some(SideEffect::AccessDenied));
        assert_eq!(router.current(), NavigationState::new(View::Dashboard, None));
        assert!(!router.is_live(&scope));
    }

    #[test]
    fn reload_invalidates_scopes_without_moving() {
        let mut router = ViewRouter::new();
        let scope = router.scope();
        router.reload();
        assert_eq!(router.view(), View::Home);
        assert!(!router.is_live(&scope));
    }
}
