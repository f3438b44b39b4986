//! Error types for the feed data layer.
//!
//! Two layers: [`CoordinatorError`] is what the store coordinator reports,
//! [`FeedError`] is what the repository client and the screen hand to
//! presentation code. Only `FeedError` carries user-facing messages.

use crate::preferences::PreferencesError;
use ipost_store::{StoreError, UserId};
use std::fmt;
use thiserror::Error;

/// Result type for coordinator operations.
pub type CoordinatorResult<T> = Result<T, CoordinatorError>;

/// Result type for client-facing feed operations.
pub type FeedResult<T> = Result<T, FeedError>;

/// The coordinator operation an error or log line refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Attaching a record store.
    Attach,
    /// Detaching the record store.
    Detach,
    /// Listing users.
    FetchUsers,
    /// Looking up one user.
    FetchUser,
    /// Writing the default users and posts.
    SeedDefaults,
    /// Listing users, seeding first when there are none.
    LoadOrSeedUsers,
    /// Listing posts newest first.
    FetchPosts,
    /// Creating a post.
    CreatePost,
}

impl Operation {
    /// Whether the operation writes to the store.
    #[must_use]
    pub const fn is_write(self) -> bool {
        matches!(self, Self::SeedDefaults | Self::LoadOrSeedUsers | Self::CreatePost)
    }

    /// Short name used in logs and messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Attach => "attach",
            Self::Detach => "detach",
            Self::FetchUsers => "fetch users",
            Self::FetchUser => "fetch user",
            Self::SeedDefaults => "seed defaults",
            Self::LoadOrSeedUsers => "load users",
            Self::FetchPosts => "fetch posts",
            Self::CreatePost => "create post",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors reported by the store coordinator.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// An operation ran before a store was attached.
    #[error("no record store attached")]
    NotConfigured,

    /// `attach` was called while a store is already attached.
    #[error("a record store is already attached")]
    AlreadyConfigured,

    /// `create_post` named an author the store does not hold.
    #[error("author {author_id} not found")]
    AuthorNotFound {
        /// The requested author.
        author_id: UserId,
    },

    /// The record store failed to read or save.
    #[error("{operation} failed: {source}")]
    Persistence {
        /// The operation that failed.
        operation: Operation,
        /// Underlying store error.
        #[source]
        source: StoreError,
    },

    /// The coordinator thread is gone; nothing was or will be executed.
    #[error("store coordinator is not running")]
    Unavailable,

    /// The coordinator thread could not be started.
    #[error("failed to start store coordinator: {0}")]
    Spawn(#[from] std::io::Error),
}

impl CoordinatorError {
    /// Wraps a store error raised while running `operation`.
    pub fn persistence(operation: Operation, source: StoreError) -> Self {
        Self::Persistence { operation, source }
    }
}

/// Errors surfaced to presentation code.
///
/// Cloneable so the reconciliation state can hold on to the last failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    /// The post author does not exist.
    #[error("author {author_id} not found")]
    AuthorNotFound {
        /// The requested author.
        author_id: UserId,
    },

    /// A post was submitted with no current user.
    #[error("no user selected")]
    NoUserSelected,

    /// Reading or saving the store failed.
    #[error("{operation} failed: {message}")]
    PersistenceFailure {
        /// The operation that failed.
        operation: Operation,
        /// Underlying error text.
        message: String,
    },

    /// The user list could not be loaded or seeded. Retrying is safe.
    #[error("users unavailable: {message}")]
    UsersUnavailable {
        /// Underlying error text.
        message: String,
    },

    /// The data layer was used before a store was attached.
    #[error("data layer is not configured")]
    NotConfigured,

    /// A store was attached while another one already was.
    #[error("data layer is already configured")]
    AlreadyConfigured,

    /// The coordinator has shut down.
    #[error("data layer is not running")]
    Unavailable,

    /// The preference store failed.
    #[error("preferences error: {message}")]
    Preferences {
        /// Underlying error text.
        message: String,
    },
}

impl FeedError {
    /// Maps a coordinator failure of the user-loading path, where every
    /// persistence problem is reported as retriable.
    pub fn users_unavailable(err: CoordinatorError) -> Self {
        match err {
            CoordinatorError::Persistence { source, .. } => Self::UsersUnavailable {
                message: source.to_string(),
            },
            other => other.into(),
        }
    }

    /// Whether repeating the same call may succeed.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::UsersUnavailable { .. } | Self::Unavailable | Self::Preferences { .. } => true,
            Self::AuthorNotFound { .. }
            | Self::NoUserSelected
            | Self::PersistenceFailure { .. }
            | Self::NotConfigured
            | Self::AlreadyConfigured => false,
        }
    }

    /// Text suitable for an alert shown to the user.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::AuthorNotFound { .. } => "User not found. Please select a user first.",
            Self::NoUserSelected => "Please select a user first",
            Self::PersistenceFailure { operation, .. } if operation.is_write() => {
                "Failed to save data. Please try again."
            }
            Self::PersistenceFailure { .. } => "Failed to fetch data. Please try again.",
            Self::UsersUnavailable { .. } => "Failed to load users. Please try again.",
            Self::Preferences { .. } => "Failed to remember your selection.",
            Self::NotConfigured | Self::AlreadyConfigured | Self::Unavailable => {
                "Something went wrong. Please restart the app."
            }
        }
    }
}

impl From<CoordinatorError> for FeedError {
    fn from(err: CoordinatorError) -> Self {
        match err {
            CoordinatorError::AuthorNotFound { author_id } => Self::AuthorNotFound { author_id },
            CoordinatorError::Persistence { operation, source } => Self::PersistenceFailure {
                operation,
                message: source.to_string(),
            },
            CoordinatorError::NotConfigured => Self::NotConfigured,
            CoordinatorError::AlreadyConfigured => Self::AlreadyConfigured,
            CoordinatorError::Unavailable | CoordinatorError::Spawn(_) => Self::Unavailable,
        }
    }
}

impl From<PreferencesError> for FeedError {
    fn from(err: PreferencesError) -> Self {
        Self::Preferences {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persistence_maps_by_operation() {
        let err = CoordinatorError::persistence(
            Operation::CreatePost,
            StoreError::invalid_format("disk gone"),
        );
        let feed: FeedError = err.into();
        assert!(matches!(
            &feed,
            FeedError::PersistenceFailure { operation: Operation::CreatePost, message }
                if message.contains("disk gone")
        ));
        assert!(!feed.is_retriable());
        assert_eq!(feed.user_message(), "Failed to save data. Please try again.");

        let read: FeedError =
            CoordinatorError::persistence(Operation::FetchPosts, StoreError::Locked).into();
        assert!(!read.is_retriable());
        assert_eq!(read.user_message(), "Failed to fetch data. Please try again.");
    }

    #[test]
    fn seed_gate_failures_are_retriable() {
        let err = FeedError::users_unavailable(CoordinatorError::persistence(
            Operation::LoadOrSeedUsers,
            StoreError::Locked,
        ));
        assert!(matches!(err, FeedError::UsersUnavailable { .. }));
        assert!(err.is_retriable());

        let not_configured = FeedError::users_unavailable(CoordinatorError::NotConfigured);
        assert_eq!(not_configured, FeedError::NotConfigured);
        assert!(!not_configured.is_retriable());
    }

    #[test]
    fn configuration_errors_stay_distinct() {
        let already: FeedError = CoordinatorError::AlreadyConfigured.into();
        assert_eq!(already, FeedError::AlreadyConfigured);
        assert_ne!(already, FeedError::NotConfigured);
        assert!(!already.is_retriable());

        let missing: FeedError = CoordinatorError::NotConfigured.into();
        assert_eq!(missing, FeedError::NotConfigured);
    }

    #[test]
    fn no_user_selected_message() {
        assert_eq!(
            FeedError::NoUserSelected.user_message(),
            "Please select a user first"
        );
    }

    #[test]
    fn author_not_found_keeps_id() {
        let id = UserId::new();
        let feed: FeedError = CoordinatorError::AuthorNotFound { author_id: id }.into();
        assert_eq!(feed, FeedError::AuthorNotFound { author_id: id });
        assert!(feed.to_string().contains(&id.to_string()));
    }

    #[test]
    fn operation_names() {
        assert_eq!(Operation::FetchPosts.to_string(), "fetch posts");
        assert!(Operation::CreatePost.is_write());
        assert!(!Operation::FetchUser.is_write());
    }
}
