//! SelectionStore: sole owner of the current-location state.
//!
//! Every write goes through `set`, which validates against the catalog,
//! persists, and then synchronously notifies the listener (the display
//! synchroniser).  UI handlers never touch display state themselves.

use std::sync::Arc;

use locsync_proto::catalog::{Location, LocationCatalog};
use locsync_proto::storage::KeyValueStore;
use tracing::{debug, info, warn};

pub const SELECTED_LOCATION_KEY: &str = "selectedLocation";
pub const DETECTION_DISMISSED_KEY: &str = "locationDetectionDismissed";

/// Receives every accepted selection, including re-selections of the
/// current id.
pub trait SelectionListener {
    fn selection_changed(&mut self, location: &Location);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionState {
    /// Always a key of the catalog.
    pub current_location_id: String,
    /// Sticky once true.
    pub detection_dismissed: bool,
}

pub struct SelectionStore<K: KeyValueStore> {
    catalog: Arc<LocationCatalog>,
    storage: K,
    state: SelectionState,
}

impl<K: KeyValueStore> SelectionStore<K> {
    /// Restore state from `storage`.  Anything unreadable, unknown, or
    /// missing falls back to `default_id` (or the first catalog entry when
    /// that is unknown too).
    pub fn open(catalog: Arc<LocationCatalog>, storage: K, default_id: &str) -> Self {
        let fallback = catalog.resolve_default(default_id).to_string();

        let current_location_id = match storage.get(SELECTED_LOCATION_KEY) {
            Ok(Some(id)) if catalog.contains(&id) => id,
            Ok(Some(id)) => {
                debug!("stored selection {:?} is not in the catalog, ignoring", id);
                fallback
            }
            Ok(None) => fallback,
            Err(e) => {
                debug!("could not read stored selection: {}", e);
                fallback
            }
        };

        let detection_dismissed = match storage.get(DETECTION_DISMISSED_KEY) {
            Ok(value) => value.as_deref() == Some("true"),
            Err(e) => {
                debug!("could not read detection flag: {}", e);
                false
            }
        };

        info!(
            "selection restored: {} (detection dismissed: {})",
            current_location_id, detection_dismissed
        );

        Self {
            catalog,
            storage,
            state: SelectionState {
                current_location_id,
                detection_dismissed,
            },
        }
    }

    /// Current selection; always a catalog id.
    pub fn get(&self) -> &str {
        &self.state.current_location_id
    }

    pub fn current_location(&self) -> &Location {
        self.catalog
            .get(&self.state.current_location_id)
            .unwrap_or(&self.catalog.all()[0])
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn catalog(&self) -> &Arc<LocationCatalog> {
        &self.catalog
    }

    /// Select `id`.  Unknown ids are ignored with a diagnostic and return
    /// `false`.  A failed storage write is logged but the selection still
    /// takes effect for this session.
    pub fn set(&mut self, id: &str, listener: &mut dyn SelectionListener) -> bool {
        let Some(location) = self.catalog.get(id) else {
            warn!("ignoring selection of unknown location {:?}", id);
            return false;
        };

        if let Err(e) = self.storage.set(SELECTED_LOCATION_KEY, id) {
            warn!("could not persist selection {:?}: {}", id, e);
        }

        if self.state.current_location_id != id {
            info!("selection {} → {}", self.state.current_location_id, id);
            self.state.current_location_id = id.to_string();
        }

        listener.selection_changed(location);
        true
    }

    pub fn mark_detection_dismissed(&mut self) {
        if let Err(e) = self.storage.set(DETECTION_DISMISSED_KEY, "true") {
            warn!("could not persist detection dismissal: {}", e);
        }
        if !self.state.detection_dismissed {
            info!("location detection dismissed");
            self.state.detection_dismissed = true;
        }
    }

    pub fn is_detection_dismissed(&self) -> bool {
        self.state.detection_dismissed
    }

    /// Hand the storage back, e.g. to start a new session from it.
    pub fn into_storage(self) -> K {
        self.storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use locsync_proto::storage::{MemoryStore, StorageError};

    #[derive(Default)]
    struct Recorder {
        seen: Vec<String>,
    }

    impl SelectionListener for Recorder {
        fn selection_changed(&mut self, location: &Location) {
            self.seen.push(location.id.clone());
        }
    }

    /// Reads work, writes always fail.
    struct ReadOnlyStore(MemoryStore);

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.0.get(key)
        }

        fn set(&mut self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            )))
        }

        fn remove(&mut self, _key: &str) -> Result<(), StorageError> {
            Ok(())
        }
    }

    fn catalog() -> Arc<LocationCatalog> {
        Arc::new(LocationCatalog::builtin())
    }

    #[test]
    fn test_defaults_when_storage_is_empty() {
        let store = SelectionStore::open(catalog(), MemoryStore::new(), "geldrop");
        assert_eq!(store.get(), "geldrop");
        assert!(!store.is_detection_dismissed());
    }

    #[test]
    fn test_unknown_stored_value_is_treated_as_absent() {
        let storage = MemoryStore::with_entries([
            (SELECTED_LOCATION_KEY, "{\"garbage"),
            (DETECTION_DISMISSED_KEY, "yes"),
        ]);
        let store = SelectionStore::open(catalog(), storage, "heeze");
        assert_eq!(store.get(), "heeze");
        assert!(!store.is_detection_dismissed());
    }

    #[test]
    fn test_unknown_default_falls_back_to_first_entry() {
        let store = SelectionStore::open(catalog(), MemoryStore::new(), "atlantis");
        assert_eq!(store.get(), "geldrop");
    }

    #[test]
    fn test_set_then_get_round_trips_every_location() {
        let cat = catalog();
        let mut store = SelectionStore::open(cat.clone(), MemoryStore::new(), "geldrop");
        let mut recorder = Recorder::default();
        for id in cat.ids() {
            assert!(store.set(id, &mut recorder));
            assert_eq!(store.get(), id);
            assert_eq!(store.current_location().id, id);
        }
        assert_eq!(recorder.seen, vec!["geldrop", "heeze", "eindhoven"]);
    }

    #[test]
    fn test_set_unknown_is_a_no_op() {
        let mut store = SelectionStore::open(catalog(), MemoryStore::new(), "heeze");
        let mut recorder = Recorder::default();
        assert!(!store.set("tilburg", &mut recorder));
        assert_eq!(store.get(), "heeze");
        assert!(recorder.seen.is_empty());

        let storage = store.into_storage();
        assert_eq!(storage.get(SELECTED_LOCATION_KEY).unwrap(), None);
    }

    #[test]
    fn test_selection_persists_across_sessions() {
        let mut store = SelectionStore::open(catalog(), MemoryStore::new(), "geldrop");
        store.set("eindhoven", &mut Recorder::default());
        store.mark_detection_dismissed();
        store.mark_detection_dismissed();

        let storage = store.into_storage();
        assert_eq!(
            storage.get(DETECTION_DISMISSED_KEY).unwrap().as_deref(),
            Some("true")
        );

        let next = SelectionStore::open(catalog(), storage, "geldrop");
        assert_eq!(next.get(), "eindhoven");
        assert!(next.is_detection_dismissed());
    }

    #[test]
    fn test_write_failure_still_updates_session() {
        let storage = ReadOnlyStore(MemoryStore::with_entries([(SELECTED_LOCATION_KEY, "heeze")]));
        let mut store = SelectionStore::open(catalog(), storage, "geldrop");
        assert_eq!(store.get(), "heeze");

        let mut recorder = Recorder::default();
        assert!(store.set("geldrop", &mut recorder));
        assert_eq!(store.get(), "geldrop");
        assert_eq!(recorder.seen, vec!["geldrop"]);

        store.mark_detection_dismissed();
        assert!(store.is_detection_dismissed());
    }
}
