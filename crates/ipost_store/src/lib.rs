//! # iPost Store
//!
//! The embedded record store behind the iPost feed.
//!
//! This crate provides:
//! - Typed records ([`UserRecord`], [`PostRecord`]) owned by the store
//! - Staged inserts and cascading deletes committed by [`RecordStore::save`]
//! - Predicate/sort/limit queries via [`Query`]
//! - A CRC-framed CBOR commit log replayed on open
//! - An exclusive directory lock for on-disk stores
//!
//! ## Access model
//!
//! `RecordStore` is a plain `&mut self` value with no internal locking. It
//! is meant to be owned by exactly one execution context; reads hand out
//! borrows tied to the store, so a record can only leave that context as a
//! copy.
//!
//! ```rust
//! use ipost_store::{PostRecord, Query, RecordStore, UserRecord};
//!
//! let mut store = RecordStore::open_in_memory().unwrap();
//! let user = UserRecord::new("Jane Smith", "@janesmith", "person.fill");
//! let author = user.id;
//! store.insert_user(user).unwrap();
//! store.insert_post(PostRecord::new("hello", None, chrono::Utc::now(), author)).unwrap();
//! store.save().unwrap();
//!
//! let feed = store.select(&Query::<PostRecord>::all().newest_first().limit(10));
//! assert_eq!(feed.len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod dir;
mod error;
mod ids;
mod log;
mod query;
mod record;
mod store;

pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use ids::{PostId, UserId};
pub use query::{PostOrder, Query};
pub use record::{PostRecord, Record, UserRecord};
pub use store::RecordStore;
