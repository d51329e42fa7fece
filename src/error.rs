//! Error taxonomy for the client core.
//!
//! Everything the session store and fetch layer can fail with is enumerated
//! here; collaborator-layer failures are converted to these variants at the
//! boundary and never escape to the rendering layer as panics or unhandled
//! rejections.

use thiserror::Error;

/// Typed failure surfaced by the session store, API client, and fetch layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Login rejected by the authentication collaborator. The message is
    /// user-displayable; recovery is re-prompting, never fatal.
    #[error("{0}")]
    InvalidCredentials(String),

    /// The auth token was rejected during restore or an authenticated
    /// request. Recovery is a forced logout and redirect to login.
    #[error("Session expired, please sign in again")]
    SessionExpired,

    /// Transport failure (timeout, DNS, connection refused). Retryable by
    /// the caller; the core never retries on its own.
    #[error("{0}")]
    Network(String),

    /// Authenticated but not permitted. The route guard handles this by
    /// redirect; the API client maps HTTP 403 here.
    #[error("Not authorized for this resource")]
    Forbidden,

    /// Collaborator-reported validation failure. The message is forwarded
    /// verbatim; the core does not interpret its structure.
    #[error("{0}")]
    Validation(String),

    /// A serialized session operation was already in flight. Policy is to
    /// reject, not queue.
    #[error("Another sign-in attempt is already in progress")]
    Busy,

    /// The persisted token store failed.
    #[error("Credential storage error: {0}")]
    Storage(String),

    /// Any other non-2xx response from the admin dashboard.
    #[error("{message} (HTTP {status})")]
    Api { status: u16, message: String },

    /// The response body was not the expected JSON shape.
    #[error("Invalid response from admin dashboard: {0}")]
    Decode(String),
}

impl Error {
    /// Human-readable text for `FetchState.error` and inline form display.
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}
