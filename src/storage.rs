//! Persisted auth-token storage.
//!
//! The token is the only persisted client state: a single opaque slot kept
//! in the OS credential store (DPAPI on Windows, Keychain on macOS, Secret
//! Service on Linux, via the `keyring` crate). The [`TokenStore`] trait lets
//! tests and embedders without an OS keyring inject [`MemoryStore`] instead.

use keyring::Entry;
use std::sync::Mutex;
use tracing::warn;
use zeroize::Zeroize;

use crate::error::Error;

/// Keyring service name for all entries written by this crate.
const SERVICE_NAME: &str = "resto-admin-client";

/// The single documented storage key for the opaque auth token.
pub const TOKEN_KEY: &str = "auth_token";

/// A single persisted slot for the opaque auth token.
///
/// `clear` must succeed when no token is stored; writes are last-write-wins
/// (no concurrent writer exists within one client process — the session
/// store is the sole writer).
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Option<String>;
    fn save(&self, token: &str) -> Result<(), Error>;
    fn clear(&self) -> Result<(), Error>;
}

// ---------------------------------------------------------------------------
// OS keyring implementation
// ---------------------------------------------------------------------------

/// [`TokenStore`] backed by the OS credential store.
pub struct KeyringStore;

impl KeyringStore {
    pub fn new() -> Self {
        Self
    }

    fn entry() -> Result<Entry, Error> {
        Entry::new(SERVICE_NAME, TOKEN_KEY).map_err(|e| Error::Storage(e.to_string()))
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStore for KeyringStore {
    /// Returns `None` when the entry does not exist (or the platform returns
    /// a "not found" error). Other keyring failures are logged and treated
    /// as absent so startup restore degrades to the login screen.
    fn load(&self) -> Option<String> {
        let entry = match Self::entry() {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "keyring: failed to create entry");
                return None;
            }
        };
        match entry.get_password() {
            Ok(pw) => Some(pw),
            Err(keyring::Error::NoEntry) => None,
            Err(e) => {
                warn!(error = %e, "keyring: failed to read auth token");
                None
            }
        }
    }

    fn save(&self, token: &str) -> Result<(), Error> {
        Self::entry()?
            .set_password(token)
            .map_err(|e| Error::Storage(e.to_string()))
    }

    /// Silently succeeds if the entry does not exist.
    fn clear(&self) -> Result<(), Error> {
        match Self::entry()?.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(Error::Storage(e.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

/// [`TokenStore`] held in process memory, for tests and embedders without an
/// OS credential store. The token is zeroized on clear and overwrite.
#[derive(Default)]
pub struct MemoryStore {
    slot: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populated store, for restore-path tests.
    pub fn with_token(token: &str) -> Self {
        Self {
            slot: Mutex::new(Some(token.to_string())),
        }
    }
}

impl TokenStore for MemoryStore {
    fn load(&self) -> Option<String> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }

    fn save(&self, token: &str) -> Result<(), Error> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|e| Error::Storage(e.to_string()))?;
        if let Some(old) = slot.as_mut() {
            old.zeroize();
        }
        *slot = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), Error> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|e| Error::Storage(e.to_string()))?;
        if let Some(old) = slot.as_mut() {
            old.zeroize();
        }
        *slot = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryStore::new();
        assert_eq!(store.load(), None);

        store.save("tok-1").expect("save");
        assert_eq!(store.load().as_deref(), Some("tok-1"));

        store.save("tok-2").expect("overwrite");
        assert_eq!(store.load().as_deref(), Some("tok-2"));

        store.clear().expect("clear");
        assert_eq!(store.load(), None);
    }

    #[test]
    fn memory_store_clear_is_idempotent() {
        let store = MemoryStore::new();
        store.clear().expect("clear empty");
        store.clear().expect("clear again");
    }

    // The OS keyring is process-global shared state; #[serial] keeps parallel
    // test threads off the same entry. Ignored by default because headless CI
    // hosts have no credential service.
    #[test]
    #[serial]
    #[ignore = "requires an OS credential store"]
    fn keyring_store_round_trip() {
        let store = KeyringStore::new();
        store.save("keyring-test-token").expect("save");
        assert_eq!(store.load().as_deref(), Some("keyring-test-token"));
        store.clear().expect("clear");
        assert_eq!(store.load(), None);
        store.clear().expect("clear when absent");
    }
}
