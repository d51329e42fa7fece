//! Route guard.
//!
//! A pure decision function over `(session snapshot, required role)`: no
//! internal state, no side effects. The caller re-evaluates it on every
//! navigation and session change; while startup restore is still in flight
//! it reports [`Decision::Pending`] so the view renders a neutral loading
//! state instead of redirecting prematurely.

use crate::routes::{self, RouteId};
use crate::session::{Role, SessionSnapshot};

/// Outcome of a guard check for one navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Session restore still in flight; render a neutral loading state.
    Pending,
    /// The view may render.
    Allow,
    /// No authenticated session.
    RedirectToLogin,
    /// Authenticated, but the role does not permit this view.
    RedirectToUnauthorized,
}

/// Gate a view behind an optional required role.
pub fn authorize(snapshot: &SessionSnapshot, required_role: Option<Role>) -> Decision {
    if snapshot.restoring {
        return Decision::Pending;
    }
    if !snapshot.session.authenticated {
        return Decision::RedirectToLogin;
    }
    match required_role {
        Some(required) if snapshot.session.role != Some(required) => {
            Decision::RedirectToUnauthorized
        }
        _ => Decision::Allow,
    }
}

/// Gate a route using the static permission table. Public routes always
/// render.
pub fn authorize_route(snapshot: &SessionSnapshot, route: RouteId) -> Decision {
    if routes::is_public(route) {
        return Decision::Allow;
    }
    if snapshot.restoring {
        return Decision::Pending;
    }
    if !snapshot.session.authenticated {
        return Decision::RedirectToLogin;
    }
    match snapshot.session.role {
        Some(role) if routes::is_permitted(role, route) => Decision::Allow,
        _ => Decision::RedirectToUnauthorized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;

    fn authenticated(role: Role) -> SessionSnapshot {
        SessionSnapshot {
            session: Session {
                user_id: 1,
                username: "admin".into(),
                display_name: "Admin Restoran".into(),
                role: Some(role),
                authenticated: true,
            },
            restoring: false,
        }
    }

    fn anonymous() -> SessionSnapshot {
        SessionSnapshot {
            session: Session::anonymous(),
            restoring: false,
        }
    }

    #[test]
    fn no_required_role_allows_iff_authenticated() {
        assert_eq!(authorize(&authenticated(Role::Owner), None), Decision::Allow);
        assert_eq!(
            authorize(&authenticated(Role::Cashier), None),
            Decision::Allow
        );
        assert_eq!(authorize(&anonymous(), None), Decision::RedirectToLogin);
    }

    #[test]
    fn role_mismatch_redirects_to_unauthorized() {
        assert_eq!(
            authorize(&authenticated(Role::Owner), Some(Role::Owner)),
            Decision::Allow
        );
        assert_eq!(
            authorize(&authenticated(Role::Owner), Some(Role::Cashier)),
            Decision::RedirectToUnauthorized
        );
        assert_eq!(
            authorize(&authenticated(Role::Cashier), Some(Role::Owner)),
            Decision::RedirectToUnauthorized
        );
    }

    #[test]
    fn unauthenticated_beats_role_check() {
        assert_eq!(
            authorize(&anonymous(), Some(Role::Owner)),
            Decision::RedirectToLogin
        );
    }

    #[test]
    fn restoring_session_is_pending() {
        let snapshot = SessionSnapshot {
            session: Session::anonymous(),
            restoring: true,
        };
        assert_eq!(authorize(&snapshot, None), Decision::Pending);
        assert_eq!(
            authorize_route(&snapshot, RouteId::Orders),
            Decision::Pending
        );
        // Public routes render even mid-restore.
        assert_eq!(authorize_route(&snapshot, RouteId::Login), Decision::Allow);
    }

    #[test]
    fn route_table_drives_route_decisions() {
        assert_eq!(
            authorize_route(&authenticated(Role::Cashier), RouteId::Orders),
            Decision::Allow
        );
        assert_eq!(
            authorize_route(&authenticated(Role::Cashier), RouteId::Reports),
            Decision::RedirectToUnauthorized
        );
        assert_eq!(
            authorize_route(&authenticated(Role::Owner), RouteId::Reports),
            Decision::Allow
        );
        assert_eq!(
            authorize_route(&anonymous(), RouteId::Reports),
            Decision::RedirectToLogin
        );
    }
}
