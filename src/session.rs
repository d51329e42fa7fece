//! Session/authorization store.
//!
//! Single source of truth for "who is logged in and with what role", and the
//! sole writer of the persisted auth token. Exactly one store exists per
//! client process; views read it through the synchronous query interface
//! ([`SessionStore::current_session`] / [`SessionStore::snapshot`]) and the
//! route guard consumes the snapshot.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::sync::Mutex;
use tracing::{info, warn};

use crate::api::ApiClient;
use crate::error::Error;
use crate::routes::{self, RouteId};
use crate::storage::TokenStore;

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// User role, enumerated explicitly. The wire vocabulary is
/// `owner`/`cashier`; the legacy dashboard's `admin`/`kasir` strings are
/// accepted on input only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[serde(alias = "admin")]
    Owner,
    #[serde(alias = "kasir")]
    Cashier,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Cashier => "cashier",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "owner" | "admin" => Ok(Role::Owner),
            "cashier" | "kasir" => Ok(Role::Cashier),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// The in-memory record of the current authenticated identity.
///
/// Invariant: `role.is_some()` iff `authenticated`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub user_id: i64,
    pub username: String,
    pub display_name: String,
    pub role: Option<Role>,
    pub authenticated: bool,
}

impl Session {
    /// The unauthenticated session value.
    pub fn anonymous() -> Self {
        Self {
            user_id: 0,
            username: String::new(),
            display_name: String::new(),
            role: None,
            authenticated: false,
        }
    }

    fn from_user(user: UserInfo) -> Self {
        let display_name = user.display_name.unwrap_or_else(|| user.username.clone());
        Self {
            user_id: user.id,
            username: user.username,
            display_name,
            role: Some(user.role),
            authenticated: true,
        }
    }
}

/// Point-in-time view read once per render cycle: the session plus whether
/// startup restore is still in flight (drives the guard's `Pending`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub session: Session,
    pub restoring: bool,
}

/// Successful login: the new session plus the "navigate to default landing
/// view" signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginSuccess {
    pub session: Session,
    pub redirect: RouteId,
}

/// `user` object shape from `/auth/login` and `/auth/me`.
#[derive(Debug, Deserialize)]
struct UserInfo {
    #[serde(alias = "user_id")]
    id: i64,
    username: String,
    role: Role,
    #[serde(rename = "displayName", alias = "display_name", alias = "nama_lengkap")]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
    user: UserInfo,
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

struct State {
    session: Session,
    restoring: bool,
}

/// The session store. Owns the [`Session`] exclusively and is the only
/// writer of the persisted token slot.
pub struct SessionStore {
    client: Arc<dyn ApiClient>,
    tokens: Arc<dyn TokenStore>,
    state: Mutex<State>,
    // Serializes login attempts: a second attempt while one is in flight
    // fails fast with Error::Busy.
    login_gate: tokio::sync::Mutex<()>,
    // Serializes the async operations against logout: logout bumps the
    // epoch, and a resolving login or restore applies its result only when
    // the epoch is unchanged since it started.
    epoch: AtomicU64,
}

impl SessionStore {
    /// Create the store in the "restoring" state: the guard reports
    /// `Pending` until [`restore_session`](Self::restore_session) (or a
    /// login/logout) settles the session.
    pub fn new(client: Arc<dyn ApiClient>, tokens: Arc<dyn TokenStore>) -> Self {
        Self {
            client,
            tokens,
            state: Mutex::new(State {
                session: Session::anonymous(),
                restoring: true,
            }),
            login_gate: tokio::sync::Mutex::new(()),
            epoch: AtomicU64::new(0),
        }
    }

    /// Synchronous read of the current session. No side effects.
    pub fn current_session(&self) -> Session {
        self.state
            .lock()
            .map(|st| st.session.clone())
            .unwrap_or_else(|_| Session::anonymous())
    }

    /// Synchronous snapshot for the route guard.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state
            .lock()
            .map(|st| SessionSnapshot {
                session: st.session.clone(),
                restoring: st.restoring,
            })
            .unwrap_or_else(|_| SessionSnapshot {
                session: Session::anonymous(),
                restoring: false,
            })
    }

    fn settle(&self, session: Session) {
        if let Ok(mut st) = self.state.lock() {
            st.session = session;
            st.restoring = false;
        }
    }

    /// Authenticate against the admin dashboard.
    ///
    /// On success the token is persisted before the in-memory session is
    /// updated; a storage failure aborts the whole operation so a persisted
    /// token never exists without matching session state. Collaborator
    /// rejections surface as [`Error::InvalidCredentials`] with the
    /// collaborator's message. A [`logout`](Self::logout) issued while the
    /// request is in flight wins: the login result is discarded and the
    /// call fails with [`Error::SessionExpired`].
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginSuccess, Error> {
        let _gate = self.login_gate.try_lock().map_err(|_| Error::Busy)?;
        let epoch = self.epoch.load(Ordering::SeqCst);

        let body = serde_json::json!({ "username": username, "password": password });
        let resp = self
            .client
            .post("/auth/login", &body)
            .await
            .map_err(|e| match e {
                // A 401 from the login endpoint means bad credentials, not an
                // expired session.
                Error::SessionExpired => {
                    Error::InvalidCredentials("Invalid username or password".into())
                }
                Error::Validation(msg) => Error::InvalidCredentials(msg),
                Error::Api { status, message } if status < 500 => {
                    Error::InvalidCredentials(message)
                }
                other => other,
            })?;

        let resp: LoginResponse =
            serde_json::from_value(resp).map_err(|e| Error::Decode(e.to_string()))?;

        // A logout (or restore) settled the session while the request was in
        // flight; the user's last action wins, so discard this result.
        if self.epoch.load(Ordering::SeqCst) != epoch {
            warn!(username, "login superseded by logout, discarding result");
            return Err(Error::SessionExpired);
        }
        // Invalidate any still-pending restore so it cannot undo this login.
        self.epoch.fetch_add(1, Ordering::SeqCst);

        // Persist first; only a successful write may be followed by the
        // in-memory update.
        self.tokens.save(&resp.token)?;
        self.client.set_auth_token(Some(&resp.token));

        let session = Session::from_user(resp.user);
        self.settle(session.clone());

        info!(username = %session.username, role = %session.role.map(|r| r.as_str()).unwrap_or(""), "login successful");
        Ok(LoginSuccess {
            session,
            redirect: routes::landing(),
        })
    }

    /// Resolve a persisted token against `/auth/me` at startup.
    ///
    /// Any failure (expired token, network, malformed response) clears the
    /// persisted token and leaves the session unauthenticated, so the
    /// persisted slot never disagrees with the in-memory state. Always
    /// clears the restoring flag. A [`logout`](Self::logout) issued while
    /// the request is in flight wins: the restore result is discarded.
    pub async fn restore_session(&self) -> Option<Session> {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let Some(token) = self.tokens.load() else {
            self.settle(Session::anonymous());
            return None;
        };

        self.client.set_auth_token(Some(&token));
        let restored = match self.client.get("/auth/me", &[]).await {
            Ok(value) => serde_json::from_value::<UserInfo>(value)
                .map(Session::from_user)
                .map_err(|e| Error::Decode(e.to_string())),
            Err(e) => Err(e),
        };

        // A logout settled the session meanwhile; it already cleared the
        // token, so neither branch below may run.
        if self.epoch.load(Ordering::SeqCst) != epoch {
            warn!("restore superseded by logout, discarding result");
            return None;
        }

        match restored {
            Ok(session) => {
                info!(username = %session.username, "session restored from persisted token");
                self.settle(session.clone());
                Some(session)
            }
            Err(e) => {
                warn!(error = %e, "session restore failed, clearing persisted token");
                if let Err(e) = self.tokens.clear() {
                    warn!(error = %e, "failed to clear persisted token");
                }
                self.client.set_auth_token(None);
                self.settle(Session::anonymous());
                None
            }
        }
    }

    /// Clear persisted token and session state. Idempotent: calling while
    /// already unauthenticated is a no-op without error. Returns the
    /// "navigate to login" signal.
    pub fn logout(&self) -> RouteId {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        if let Err(e) = self.tokens.clear() {
            warn!(error = %e, "failed to clear persisted token during logout");
        }
        self.client.set_auth_token(None);

        if let Ok(mut st) = self.state.lock() {
            if st.session.authenticated {
                info!(username = %st.session.username, "logged out");
            }
            st.session = Session::anonymous();
            st.restoring = false;
        }
        RouteId::Login
    }

    /// Force-expire the session: used when an authenticated request reports
    /// [`Error::SessionExpired`]. Same effects as [`logout`](Self::logout),
    /// without treating it as a user action.
    pub fn expire(&self) -> RouteId {
        warn!("session expired, forcing logout");
        self.logout()
    }
}

/// True when the error indicates the session should be force-expired.
pub fn is_session_expiry(err: &Error) -> bool {
    matches!(err, Error::SessionExpired)
}

// Used by login tests to model the collaborator's wire shape.
#[cfg(test)]
pub(crate) fn login_response_json(
    token: &str,
    id: i64,
    username: &str,
    role: &str,
) -> serde_json::Value {
    serde_json::json!({
        "token": token,
        "user": { "id": id, "username": username, "role": role, "displayName": "Admin Restoran" }
    })
}
