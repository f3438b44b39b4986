//! Store-owned records.

use crate::ids::{PostId, UserId};
use crate::store::RecordStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user as held by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Identity.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Handle, e.g. `@janesmith`.
    pub handle: String,
    /// Icon reference.
    pub icon: String,
}

impl UserRecord {
    /// Creates a user with a fresh id.
    pub fn new(name: impl Into<String>, handle: impl Into<String>, icon: impl Into<String>) -> Self {
        Self {
            id: UserId::new(),
            name: name.into(),
            handle: handle.into(),
            icon: icon.into(),
        }
    }
}

/// A post as held by the store.
///
/// Posts are never mutated after they are committed. `author` is `None`
/// only for a post read back from a log written before its author was
/// removed; cascading deletes normally take the posts with the author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    /// Identity.
    pub id: PostId,
    /// Body text. Emptiness is not checked here.
    pub text: String,
    /// Optional image reference.
    pub image: Option<String>,
    /// Creation time, set once.
    pub timestamp: DateTime<Utc>,
    /// Authoring user.
    pub author: Option<UserId>,
}

impl PostRecord {
    /// Creates a post with a fresh id.
    pub fn new(
        text: impl Into<String>,
        image: Option<String>,
        timestamp: DateTime<Utc>,
        author: UserId,
    ) -> Self {
        Self {
            id: PostId::new(),
            text: text.into(),
            image,
            timestamp,
            author: Some(author),
        }
    }
}

/// A record kind that can be queried with [`crate::Query`].
pub trait Record: Sized {
    /// Returns the committed rows of this kind, in insertion order.
    fn rows(store: &RecordStore) -> &[Self];
}

impl Record for UserRecord {
    fn rows(store: &RecordStore) -> &[Self] {
        store.users()
    }
}

impl Record for PostRecord {
    fn rows(store: &RecordStore) -> &[Self] {
        store.posts()
    }
}
