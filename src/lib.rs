//! resto-admin-client — headless client core for the restaurant admin
//! dashboard.
//!
//! Three collaborating pieces, consumed by whatever rendering layer the
//! embedder brings:
//!
//! - [`session::SessionStore`] — single source of truth for "who is logged
//!   in and with what role"; sole writer of the persisted auth token.
//! - [`guard`] — pure per-navigation decision function over a session
//!   snapshot and the static role permission table in [`routes`].
//! - [`fetch`] — single-resource and paginated fetch hooks bridging async
//!   admin-dashboard requests to synchronous-readable state snapshots, with
//!   supersession and drop-cancellation guarantees.
//!
//! The REST backend is reached through the injectable [`api::ApiClient`]
//! seam ([`api::HttpClient`] in production, a fake in tests).
//!
//! ```no_run
//! use std::sync::Arc;
//! use resto_admin_client::{
//!     api::HttpClient, guard, routes::RouteId, session::SessionStore,
//!     storage::KeyringStore,
//! };
//!
//! # async fn start() -> Result<(), resto_admin_client::Error> {
//! let client = Arc::new(HttpClient::new("https://admin.resto.example")?);
//! let store = SessionStore::new(client.clone(), Arc::new(KeyringStore::new()));
//!
//! let _ = store.restore_session().await;
//! match guard::authorize_route(&store.snapshot(), RouteId::Dashboard) {
//!     guard::Decision::Allow => { /* render */ }
//!     _ => { /* redirect */ }
//! }
//! # Ok(())
//! # }
//! ```

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod api;
pub mod error;
pub mod fetch;
pub mod guard;
pub mod resources;
pub mod routes;
pub mod session;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;

pub use error::Error;
pub use fetch::{FetchRequest, FetchState, Fetcher, PaginatedFetcher, Pagination};
pub use guard::Decision;
pub use routes::RouteId;
pub use session::{Role, Session, SessionSnapshot, SessionStore};

/// Initialize structured console logging for embedders that have no
/// subscriber of their own. Safe to call more than once; later calls are
/// no-ops.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,resto_admin_client=debug"));

    let console_layer = fmt::layer().with_target(true);
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .try_init();
}
