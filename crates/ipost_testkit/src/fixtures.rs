//! Test fixtures: a running data layer with automatic cleanup.

use crate::clock::MutableClock;
use crate::faults::{FaultSwitch, FaultyBackend};
use ipost_core::{
    CoordinatorConfig, FeedConfig, FeedRepository, FeedScreen, InMemoryPreferences,
    StoreCoordinator,
};
use ipost_storage::InMemoryBackend;
use ipost_store::{RecordStore, StoreConfig};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// Preference store shared by every repository a [`TestFeed`] hands out.
pub type SharedPreferences = Arc<InMemoryPreferences>;

/// A coordinator over a fresh store, a controllable clock and shared
/// preferences.
pub struct TestFeed {
    /// The running coordinator.
    pub coordinator: StoreCoordinator,
    /// Clock used for post timestamps.
    pub clock: Arc<MutableClock>,
    /// Preferences shared by all repositories from this fixture.
    pub preferences: SharedPreferences,
    /// Switch for the store's backend, when it was opened faulty.
    pub faults: Option<FaultSwitch>,
    /// The commit log bytes behind a faulty store, shared with it.
    pub log: Option<InMemoryBackend>,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: Option<TempDir>,
}

impl TestFeed {
    /// Creates a feed over an in-memory store.
    pub fn memory() -> Self {
        let store = RecordStore::open_in_memory().expect("Failed to open in-memory store");
        Self::with_store(store, None, None, None)
    }

    /// Creates a feed over a store in a fresh temporary directory.
    pub fn file() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = RecordStore::open(temp_dir.path()).expect("Failed to open file store");
        Self::with_store(store, None, None, Some(temp_dir))
    }

    /// Creates a feed whose store writes through a [`FaultyBackend`].
    pub fn faulty() -> Self {
        let (backend, switch, log) = FaultyBackend::in_memory();
        let store = RecordStore::open_with_backend(StoreConfig::default(), Box::new(backend))
            .expect("Failed to open faulty store");
        Self::with_store(store, Some(switch), Some(log), None)
    }

    fn with_store(
        store: RecordStore,
        faults: Option<FaultSwitch>,
        log: Option<InMemoryBackend>,
        temp_dir: Option<TempDir>,
    ) -> Self {
        let clock = MutableClock::fixed().shared();
        let config = CoordinatorConfig::new()
            .thread_name("ipost-test-store")
            .clock(clock.clone());
        let coordinator =
            StoreCoordinator::with_store(store, config).expect("Failed to start coordinator");
        Self {
            coordinator,
            clock,
            preferences: Arc::new(InMemoryPreferences::new()),
            faults,
            log,
            _temp_dir: temp_dir,
        }
    }

    /// A repository client over this feed. Each call returns a client with
    /// its own generation counter.
    pub fn repository(&self) -> FeedRepository<SharedPreferences> {
        FeedRepository::new(
            self.coordinator.clone(),
            Arc::clone(&self.preferences),
            FeedConfig::default(),
        )
    }

    /// A screen driver over a new repository client.
    pub fn screen(&self) -> FeedScreen<SharedPreferences> {
        FeedScreen::new(self.repository())
    }

    /// The store directory if file-based, None if in-memory.
    pub fn path(&self) -> Option<&Path> {
        self._temp_dir.as_ref().map(TempDir::path)
    }

    /// The fault switch. Panics if the feed was not opened with
    /// [`faulty`](Self::faulty).
    pub fn faults(&self) -> &FaultSwitch {
        self.faults.as_ref().expect("TestFeed was not opened faulty")
    }

    /// Replays a faulty feed's commit log into a new store, as a restart
    /// would. Detach the coordinator's store first.
    pub fn reopen_log(&self) -> RecordStore {
        let log = self.log.as_ref().expect("TestFeed was not opened faulty");
        RecordStore::open_with_backend(StoreConfig::default(), Box::new(log.clone()))
            .expect("Failed to replay commit log")
    }
}

impl std::fmt::Debug for TestFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestFeed")
            .field("path", &self.path())
            .field("faulty", &self.faults.is_some())
            .finish_non_exhaustive()
    }
}

/// Runs a test against a temporary on-disk store directory. The directory
/// is removed afterwards.
pub fn with_temp_store_dir<F, R>(f: F) -> R
where
    F: FnOnce(&Path) -> R,
{
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    f(temp_dir.path())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_feed_has_path() {
        let feed = TestFeed::file();
        assert!(feed.path().is_some());
        assert!(TestFeed::memory().path().is_none());
    }

    #[test]
    fn faulty_feed_exposes_switch() {
        let feed = TestFeed::faulty();
        assert!(!feed.faults().is_armed());
    }
}
