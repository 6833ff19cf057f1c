//! Best-effort persistence over an injected store.
use std::convert::Infallible;
use std::sync::{Arc, Mutex, PoisonError};

use crate::save_codec::{decode_snapshot, encode_snapshot};
use crate::snapshot::PlayerSnapshot;

/// Raw storage for a single encoded save.
/// Platform-specific implementations should provide this
pub trait SnapshotStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Read the stored save, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn read(&self) -> Result<Option<String>, Self::Error>;

    /// Replace the stored save.
    ///
    /// # Errors
    ///
    /// Returns an error if the save cannot be written.
    fn write(&self, encoded: &str) -> Result<(), Self::Error>;

    /// Remove the stored save.
    ///
    /// # Errors
    ///
    /// Returns an error if the save cannot be removed.
    fn clear(&self) -> Result<(), Self::Error>;
}

/// In-process store; clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slot: Arc<Mutex<Option<String>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-encoded text verbatim.
    #[must_use]
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(raw.into()))),
        }
    }

    #[must_use]
    pub fn raw(&self) -> Option<String> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SnapshotStore for MemoryStore {
    type Error = Infallible;

    fn read(&self) -> Result<Option<String>, Self::Error> {
        Ok(self.raw())
    }

    fn write(&self, encoded: &str) -> Result<(), Self::Error> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(encoded.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), Self::Error> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// Loads, saves, and resets player state without ever failing the caller.
///
/// Read or decode failures fall back to a new game; write failures are
/// logged and otherwise ignored.
#[derive(Debug, Clone)]
pub struct PersistenceGateway<S> {
    store: S,
}

impl<S: SnapshotStore> PersistenceGateway<S> {
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Last saved snapshot, or a new game stamped at `now_ms`.
    #[must_use]
    pub fn load(&self, now_ms: i64) -> PlayerSnapshot {
        match self.store.read() {
            Ok(Some(raw)) => match decode_snapshot(&raw) {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    log::warn!("discarding unreadable save: {err}");
                    PlayerSnapshot::new_game(now_ms)
                }
            },
            Ok(None) => PlayerSnapshot::new_game(now_ms),
            Err(err) => {
                log::warn!("failed to read save: {err}");
                PlayerSnapshot::new_game(now_ms)
            }
        }
    }

    /// Persist the snapshot. Returns whether the write landed.
    pub fn save(&self, snapshot: &PlayerSnapshot, now_ms: i64) -> bool {
        let encoded = match encode_snapshot(snapshot, now_ms) {
            Ok(encoded) => encoded,
            Err(err) => {
                log::warn!("failed to encode save: {err}");
                return false;
            }
        };
        match self.store.write(&encoded) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("failed to write save: {err}");
                false
            }
        }
    }

    /// Remove stored state so the next load starts a new game.
    pub fn reset(&self) -> bool {
        match self.store.clear() {
            Ok(()) => true,
            Err(err) => {
                log::warn!("failed to clear save: {err}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realm::Realm;
    use std::io;

    #[derive(Debug, Default)]
    struct BrokenStore;

    impl SnapshotStore for BrokenStore {
        type Error = io::Error;

        fn read(&self) -> Result<Option<String>, Self::Error> {
            Err(io::Error::other("disk on fire"))
        }

        fn write(&self, _encoded: &str) -> Result<(), Self::Error> {
            Err(io::Error::other("disk on fire"))
        }

        fn clear(&self) -> Result<(), Self::Error> {
            Err(io::Error::other("disk on fire"))
        }
    }

    #[test]
    fn empty_store_loads_new_game() {
        let gateway = PersistenceGateway::new(MemoryStore::new());
        assert_eq!(gateway.load(77), PlayerSnapshot::new_game(77));
    }

    #[test]
    fn saved_state_is_loaded_back() {
        let gateway = PersistenceGateway::new(MemoryStore::new());
        let mut snapshot = PlayerSnapshot::new_game(1);
        snapshot.character.realm = Realm::Void;
        snapshot.character.progress = 12.25;
        assert!(gateway.save(&snapshot, 2));
        assert_eq!(gateway.load(3), snapshot);
    }

    #[test]
    fn corrupt_save_falls_back_to_new_game() {
        let gateway = PersistenceGateway::new(MemoryStore::with_raw("{\"format\":"));
        assert_eq!(gateway.load(9), PlayerSnapshot::new_game(9));
    }

    #[test]
    fn reset_clears_store() {
        let store = MemoryStore::new();
        let gateway = PersistenceGateway::new(store.clone());
        let mut snapshot = PlayerSnapshot::new_game(1);
        snapshot.character.sub_level = 5;
        gateway.save(&snapshot, 1);
        assert!(store.raw().is_some());
        assert!(gateway.reset());
        assert!(store.raw().is_none());
        assert_eq!(gateway.load(4).character.sub_level, 1);
    }

    #[test]
    fn store_failures_never_reach_the_caller() {
        let gateway = PersistenceGateway::new(BrokenStore);
        assert_eq!(gateway.load(5), PlayerSnapshot::new_game(5));
        assert!(!gateway.save(&PlayerSnapshot::new_game(5), 5));
        assert!(!gateway.reset());
    }
}
