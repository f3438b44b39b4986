//! Coordinator and client configuration.

use mockable::{Clock, DefaultClock};
use std::fmt;
use std::sync::Arc;

/// Number of posts a feed refresh asks for unless told otherwise.
pub const DEFAULT_POST_LIMIT: usize = 50;

/// Configuration for starting a [`crate::StoreCoordinator`].
#[derive(Clone)]
pub struct CoordinatorConfig {
    /// Name of the coordinator thread.
    pub thread_name: String,

    /// Source of post timestamps and seed times.
    pub clock: Arc<dyn Clock + Send + Sync>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            thread_name: "ipost-store".to_string(),
            clock: Arc::new(DefaultClock),
        }
    }
}

impl CoordinatorConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the coordinator thread name.
    #[must_use]
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Replaces the clock, typically with a controllable one in tests.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = clock;
        self
    }
}

impl fmt::Debug for CoordinatorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoordinatorConfig")
            .field("thread_name", &self.thread_name)
            .finish_non_exhaustive()
    }
}

/// Configuration for a [`crate::FeedRepository`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    /// Page size for refreshes that do not pass an explicit limit.
    pub default_post_limit: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            default_post_limit: DEFAULT_POST_LIMIT,
        }
    }
}

impl FeedConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default page size.
    #[must_use]
    pub const fn default_post_limit(mut self, limit: usize) -> Self {
        self.default_post_limit = limit;
        self
    }
}
