//! Messages accepted by the coordinator thread.

use crate::error::{CoordinatorResult, Operation};
use crate::snapshot::{PostSnapshot, UserSnapshot};
use ipost_store::{RecordStore, UserId};
use tokio::sync::oneshot;

pub(crate) type Reply<T> = oneshot::Sender<CoordinatorResult<T>>;

/// Users returned by the seed gate, and whether this call wrote them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserListing {
    /// Every user, in insertion order.
    pub users: Vec<UserSnapshot>,
    /// True if the store was empty and the defaults were written.
    pub seeded: bool,
}

/// Fields of a post the caller supplies; id and timestamp are assigned
/// on the coordinator thread.
#[derive(Debug, Clone)]
pub(crate) struct PostDraft {
    pub(crate) text: String,
    pub(crate) image: Option<String>,
    pub(crate) author_id: UserId,
}

pub(crate) enum Command {
    Attach {
        store: Box<RecordStore>,
        reply: Reply<()>,
    },
    Detach {
        reply: Reply<RecordStore>,
    },
    FetchUsers {
        reply: Reply<Vec<UserSnapshot>>,
    },
    FetchUser {
        id: UserId,
        reply: Reply<Option<UserSnapshot>>,
    },
    SeedDefaults {
        reply: Reply<Vec<UserSnapshot>>,
    },
    LoadOrSeedUsers {
        reply: Reply<UserListing>,
    },
    FetchPosts {
        limit: usize,
        reply: Reply<Vec<PostSnapshot>>,
    },
    CreatePost {
        draft: PostDraft,
        reply: Reply<PostSnapshot>,
    },
}

impl Command {
    pub(crate) const fn operation(&self) -> Operation {
        match self {
            Self::Attach { .. } => Operation::Attach,
            Self::Detach { .. } => Operation::Detach,
            Self::FetchUsers { .. } => Operation::FetchUsers,
            Self::FetchUser { .. } => Operation::FetchUser,
            Self::SeedDefaults { .. } => Operation::SeedDefaults,
            Self::LoadOrSeedUsers { .. } => Operation::LoadOrSeedUsers,
            Self::FetchPosts { .. } => Operation::FetchPosts,
            Self::CreatePost { .. } => Operation::CreatePost,
        }
    }
}
