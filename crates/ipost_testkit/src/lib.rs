//! # iPost Testkit
//!
//! Test utilities for the iPost data layer.
//!
//! This crate provides:
//! - [`TestFeed`]: a running coordinator over an in-memory or temporary
//!   on-disk store, with a controllable clock
//! - [`FaultyBackend`]: a storage backend that fails writes on command
//! - [`MutableClock`]: a clock tests can set and advance
//! - proptest strategies for post content
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ipost_testkit::prelude::*;
//!
//! #[tokio::test]
//! async fn posts_newest_first() {
//!     let feed = TestFeed::memory();
//!     let repo = feed.repository();
//!     let users = repo.load_users().await.unwrap();
//!     // ...
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod clock;
pub mod faults;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::clock::*;
    pub use crate::faults::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use clock::*;
pub use faults::*;
pub use fixtures::*;
pub use generators::*;
