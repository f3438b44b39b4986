//! Immutable copies of store records.
//!
//! Snapshots are built by the coordinator thread while it holds the store,
//! then handed to callers by value. They share nothing with the store, so
//! later writes never show through a snapshot that was already returned.

use chrono::{DateTime, Utc};
use ipost_store::{PostId, PostRecord, RecordStore, UserId, UserRecord};
use serde::{Deserialize, Serialize};

/// A user as seen by callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSnapshot {
    /// Identity.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Handle, e.g. `@johndoe`.
    pub handle: String,
    /// Icon reference.
    pub icon: String,
}

impl UserSnapshot {
    pub(crate) fn capture(record: &UserRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            handle: record.handle.clone(),
            icon: record.icon.clone(),
        }
    }
}

/// A post as seen by callers, with its author embedded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostSnapshot {
    /// Identity.
    pub id: PostId,
    /// Body text.
    pub text: String,
    /// Optional image reference.
    pub image: Option<String>,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
    /// The author, or `None` if the relationship did not resolve.
    pub author: Option<UserSnapshot>,
}

impl PostSnapshot {
    /// Copies `post` and resolves its author against `store`.
    pub(crate) fn capture(post: &PostRecord, store: &RecordStore) -> Self {
        Self::with_author(post, store.author_of(post))
    }

    pub(crate) fn with_author(post: &PostRecord, author: Option<&UserRecord>) -> Self {
        Self {
            id: post.id,
            text: post.text.clone(),
            image: post.image.clone(),
            timestamp: post.timestamp,
            author: author.map(UserSnapshot::capture),
        }
    }

    /// Id of the embedded author, if any.
    #[must_use]
    pub fn author_id(&self) -> Option<UserId> {
        self.author.as_ref().map(|a| a.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_outlives_store_changes() {
        let mut store = RecordStore::open_in_memory().unwrap();
        let user = UserRecord::new("John Doe", "@johndoe", "person.fill");
        let author = user.id;
        let post = PostRecord::new("hello", Some("book.fill".into()), Utc::now(), author);
        let post_id = post.id;
        store.insert_user(user).unwrap();
        store.insert_post(post).unwrap();
        store.save().unwrap();

        let snapshot = PostSnapshot::capture(store.post(post_id).unwrap(), &store);

        store.delete_user(author).unwrap();
        store.save().unwrap();
        assert!(store.post(post_id).is_none());

        assert_eq!(snapshot.text, "hello");
        assert_eq!(snapshot.image.as_deref(), Some("book.fill"));
        assert_eq!(snapshot.author_id(), Some(author));
        assert_eq!(snapshot.author.unwrap().handle, "@johndoe");
    }

    #[test]
    fn unresolved_author_is_none() {
        let post = PostRecord::new("orphan", None, Utc::now(), UserId::new());
        let snapshot = PostSnapshot::with_author(&post, None);
        assert!(snapshot.author.is_none());
        assert!(snapshot.author_id().is_none());
    }

    #[test]
    fn serializes_to_json() {
        let user = UserRecord::new("Jane Smith", "@janesmith", "person.crop.circle.fill");
        let snapshot = UserSnapshot::capture(&user);
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: UserSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }
}
