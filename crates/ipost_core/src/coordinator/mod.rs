//! Single-writer access to the record store.
//!
//! A [`StoreCoordinator`] owns one background thread that owns the
//! [`RecordStore`]. Every operation is a message on an unbounded FIFO
//! channel, so operations run one at a time in submission order and each
//! one finishes (including its save) before the next begins. Callers never
//! see store records; they get [`crate::UserSnapshot`] and
//! [`crate::PostSnapshot`] values captured on the coordinator thread.
//!
//! Submitting is synchronous: the queue position is fixed when the method
//! returns its [`Pending`] handle, not when the handle is awaited. Dropping
//! a handle discards the result but never cancels the operation.
//!
//! ```no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use ipost_core::{CoordinatorConfig, StoreCoordinator};
//! use ipost_store::RecordStore;
//!
//! let coordinator = StoreCoordinator::spawn(CoordinatorConfig::default())?;
//! coordinator.attach(RecordStore::open_in_memory()?).await?;
//! let listing = coordinator.load_or_seed_users().await?;
//! let author = listing.users[0].id;
//! let post = coordinator.create_post("hello", None, author).await?;
//! assert_eq!(coordinator.fetch_posts(50).await?[0].id, post.id);
//! # Ok(())
//! # }
//! ```

mod command;
mod worker;

pub use command::UserListing;

use crate::config::CoordinatorConfig;
use crate::error::{CoordinatorError, CoordinatorResult, Operation};
use crate::snapshot::{PostSnapshot, UserSnapshot};
use command::{Command, PostDraft, Reply};
use ipost_store::{RecordStore, UserId};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;
use worker::Worker;

/// Handle to the coordinator thread. Cheap to clone; the thread stops once
/// every clone is dropped and the queue has drained.
#[derive(Clone)]
pub struct StoreCoordinator {
    commands: mpsc::UnboundedSender<Command>,
}

impl StoreCoordinator {
    /// Starts a coordinator with no store attached.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Spawn`] if the thread cannot be created.
    pub fn spawn(config: CoordinatorConfig) -> CoordinatorResult<Self> {
        let (commands, inbox) = mpsc::unbounded_channel();
        let worker = Worker::new(config.clock, inbox);
        std::thread::Builder::new()
            .name(config.thread_name)
            .spawn(move || worker.run())?;
        Ok(Self { commands })
    }

    /// Starts a coordinator and queues `store` for attachment. The attach
    /// is first in the queue, so every later operation sees the store.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Spawn`] if the thread cannot be created.
    pub fn with_store(store: RecordStore, config: CoordinatorConfig) -> CoordinatorResult<Self> {
        let coordinator = Self::spawn(config)?;
        drop(coordinator.attach(store));
        Ok(coordinator)
    }

    /// Installs the store. Fails with `AlreadyConfigured` if one is
    /// attached; the rejected store is dropped.
    pub fn attach(&self, store: RecordStore) -> Pending<()> {
        self.submit(Operation::Attach, |reply| Command::Attach {
            store: Box::new(store),
            reply,
        })
    }

    /// Removes and returns the store, releasing any directory lock once
    /// the caller drops it.
    pub fn detach(&self) -> Pending<RecordStore> {
        self.submit(Operation::Detach, |reply| Command::Detach { reply })
    }

    /// Every user, in insertion order.
    pub fn fetch_users(&self) -> Pending<Vec<UserSnapshot>> {
        self.submit(Operation::FetchUsers, |reply| Command::FetchUsers { reply })
    }

    /// One user by id.
    pub fn fetch_user(&self, id: UserId) -> Pending<Option<UserSnapshot>> {
        self.submit(Operation::FetchUser, |reply| Command::FetchUser { id, reply })
    }

    /// Writes the default users and posts as one batch and returns the new
    /// users. Does not check whether the store is empty.
    pub fn seed_defaults(&self) -> Pending<Vec<UserSnapshot>> {
        self.submit(Operation::SeedDefaults, |reply| Command::SeedDefaults { reply })
    }

    /// Returns the users, seeding first if there are none. The emptiness
    /// check and the seed run as a single queued operation, so concurrent
    /// callers seed at most once.
    pub fn load_or_seed_users(&self) -> Pending<UserListing> {
        self.submit(Operation::LoadOrSeedUsers, |reply| {
            Command::LoadOrSeedUsers { reply }
        })
    }

    /// Up to `limit` posts, newest first, with authors resolved.
    pub fn fetch_posts(&self, limit: usize) -> Pending<Vec<PostSnapshot>> {
        self.submit(Operation::FetchPosts, |reply| Command::FetchPosts { limit, reply })
    }

    /// Creates and saves a post stamped with the coordinator clock.
    ///
    /// Fails with `AuthorNotFound` if `author_id` is not a stored user, or
    /// `Persistence` if the save fails; in both cases nothing is kept.
    pub fn create_post(
        &self,
        text: impl Into<String>,
        image: Option<String>,
        author_id: UserId,
    ) -> Pending<PostSnapshot> {
        let draft = PostDraft {
            text: text.into(),
            image,
            author_id,
        };
        self.submit(Operation::CreatePost, |reply| Command::CreatePost { draft, reply })
    }

    /// Whether the coordinator thread is still accepting work.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    fn submit<T>(
        &self,
        operation: Operation,
        build: impl FnOnce(Reply<T>) -> Command,
    ) -> Pending<T> {
        let (reply, receiver) = oneshot::channel();
        if self.commands.send(build(reply)).is_err() {
            debug!(%operation, "coordinator stopped, request dropped");
        }
        Pending {
            operation,
            receiver,
        }
    }
}

impl std::fmt::Debug for StoreCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreCoordinator")
            .field("running", &self.is_running())
            .finish()
    }
}

/// The eventual result of a submitted operation.
#[must_use = "the operation runs either way; await the handle to see its result"]
pub struct Pending<T> {
    operation: Operation,
    receiver: oneshot::Receiver<CoordinatorResult<T>>,
}

impl<T> Pending<T> {
    /// The operation this handle waits on.
    pub const fn operation(&self) -> Operation {
        self.operation
    }
}

impl<T> std::fmt::Debug for Pending<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pending")
            .field("operation", &self.operation)
            .finish_non_exhaustive()
    }
}

impl<T> Future for Pending<T> {
    type Output = CoordinatorResult<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.receiver).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(CoordinatorError::Unavailable)),
            Poll::Pending => Poll::Pending,
        }
    }
}
