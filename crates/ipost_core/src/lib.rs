//! # iPost Core
//!
//! The data layer of the iPost feed.
//!
//! This crate provides:
//! - [`StoreCoordinator`]: one thread that owns the record store and runs
//!   operations one at a time, in submission order
//! - [`UserSnapshot`] / [`PostSnapshot`]: immutable copies handed to callers
//! - [`FeedRepository`]: the client API, with the seed gate, the persisted
//!   user selection and generation-tagged post requests
//! - [`FeedState`]: optimistic inserts and stale-response suppression
//! - [`FeedScreen`]: a driver combining the two for one screen
//!
//! ```no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use ipost_core::{
//!     CoordinatorConfig, FeedConfig, FeedRepository, FeedScreen, InMemoryPreferences,
//!     StoreCoordinator,
//! };
//! use ipost_store::RecordStore;
//!
//! let store = RecordStore::open_in_memory()?;
//! let coordinator = StoreCoordinator::with_store(store, CoordinatorConfig::default())?;
//! let repository =
//!     FeedRepository::new(coordinator, InMemoryPreferences::new(), FeedConfig::default());
//!
//! let mut screen = FeedScreen::new(repository);
//! screen.load_initial().await?;
//! screen.create_post("Hello iPost", None).await?;
//! assert_eq!(screen.state().posts()[0].text, "Hello iPost");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod coordinator;
mod error;
mod generation;
mod preferences;
mod reconcile;
mod repository;
mod screen;
mod seed;
mod snapshot;

pub use config::{CoordinatorConfig, FeedConfig, DEFAULT_POST_LIMIT};
pub use coordinator::{Pending, StoreCoordinator, UserListing};
pub use error::{CoordinatorError, CoordinatorResult, FeedError, FeedResult, Operation};
pub use generation::{Generation, GenerationCounter};
pub use preferences::{
    InMemoryPreferences, JsonFilePreferences, PreferenceStore, PreferencesError,
    PreferencesResult, UserPreferences, SELECTED_USER_KEY,
};
pub use reconcile::{Delivery, FeedState, LoadPhase};
pub use repository::{CreatedPost, FeedRepository, PostsPage, PostsRequest, PostsResponse};
pub use screen::FeedScreen;
pub use seed::{SEED_POST_COUNT, SEED_USER_COUNT};
pub use snapshot::{PostSnapshot, UserSnapshot};
