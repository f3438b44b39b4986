//! The record store.

use crate::config::StoreConfig;
use crate::dir::StoreDir;
use crate::error::{StoreError, StoreResult};
use crate::ids::{PostId, UserId};
use crate::log::{CommitBatch, CommitLog, Mutation};
use crate::query::Query;
use crate::record::{PostRecord, Record, UserRecord};
use ipost_storage::{FileBackend, InMemoryBackend, StorageBackend};
use std::path::Path;
use tracing::{debug, info, warn};

/// An embedded store of users and posts.
///
/// Writes are staged with `insert_*` / `delete_user` and become visible to
/// reads only after [`save`](Self::save) commits them. `save` is
/// all-or-nothing: if the commit log write fails, every staged mutation is
/// discarded and the committed state is exactly what it was before.
///
/// The store takes `&mut self` for writes and has no internal locking;
/// callers that share it across threads must serialize access themselves.
///
/// # Opening a Store
///
/// ```rust,ignore
/// use ipost_store::RecordStore;
/// use std::path::Path;
///
/// let store = RecordStore::open(Path::new("feed_data"))?;
/// ```
pub struct RecordStore {
    config: StoreConfig,
    dir: Option<StoreDir>,
    log: CommitLog,
    users: Vec<UserRecord>,
    posts: Vec<PostRecord>,
    pending: Vec<Mutation>,
    committed_seq: u64,
}

impl RecordStore {
    /// Opens a store directory with default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Locked`] if another handle has the directory
    /// open, or an error if the log cannot be read.
    pub fn open(path: &Path) -> StoreResult<Self> {
        Self::open_with_config(path, StoreConfig::default())
    }

    /// Opens a store directory.
    ///
    /// # Errors
    ///
    /// See [`open`](Self::open).
    pub fn open_with_config(path: &Path, config: StoreConfig) -> StoreResult<Self> {
        let dir = StoreDir::open(path, config.create_if_missing)?;
        let backend = FileBackend::open(&dir.log_path())?;
        let mut store = Self::open_with_backend(config, Box::new(backend))?;
        info!(
            path = %dir.path().display(),
            users = store.users.len(),
            posts = store.posts.len(),
            "opened record store"
        );
        store.dir = Some(dir);
        Ok(store)
    }

    /// Opens a fresh, non-persistent store.
    ///
    /// # Errors
    ///
    /// Infallible in practice; the signature matches the other constructors.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::open_with_backend(StoreConfig::default(), Box::new(InMemoryBackend::new()))
    }

    /// Opens a store over an existing backend, replaying its log.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be read or holds frames of an
    /// unsupported version.
    pub fn open_with_backend(
        config: StoreConfig,
        backend: Box<dyn StorageBackend>,
    ) -> StoreResult<Self> {
        let (log, batches) = CommitLog::open(backend, config.sync_on_save)?;
        let mut store = Self {
            config,
            dir: None,
            log,
            users: Vec::new(),
            posts: Vec::new(),
            pending: Vec::new(),
            committed_seq: 0,
        };
        for batch in batches {
            for mutation in batch.mutations {
                store.apply(mutation);
            }
            store.committed_seq = batch.sequence;
        }
        Ok(store)
    }

    /// Stages a new user.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateId`] if the id is already used.
    pub fn insert_user(&mut self, user: UserRecord) -> StoreResult<()> {
        if self.user_visible_to_txn(user.id) {
            return Err(StoreError::DuplicateId {
                kind: "user",
                id: user.id.as_uuid(),
            });
        }
        self.pending.push(Mutation::InsertUser(user));
        Ok(())
    }

    /// Stages a new post.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingAuthor`] if the author is neither
    /// committed nor staged, or [`StoreError::DuplicateId`].
    pub fn insert_post(&mut self, post: PostRecord) -> StoreResult<()> {
        if let Some(author) = post.author {
            if !self.user_visible_to_txn(author) {
                return Err(StoreError::MissingAuthor { author_id: author });
            }
        }
        let duplicate = self.post(post.id).is_some()
            || self
                .pending
                .iter()
                .any(|m| matches!(m, Mutation::InsertPost(p) if p.id == post.id));
        if duplicate {
            return Err(StoreError::DuplicateId {
                kind: "post",
                id: post.id.as_uuid(),
            });
        }
        self.pending.push(Mutation::InsertPost(post));
        Ok(())
    }

    /// Stages deletion of a user and, on save, every post they wrote.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UserNotFound`] if the user does not exist.
    pub fn delete_user(&mut self, user_id: UserId) -> StoreResult<()> {
        if !self.user_visible_to_txn(user_id) {
            return Err(StoreError::UserNotFound { user_id });
        }
        self.pending.push(Mutation::DeleteUser(user_id));
        Ok(())
    }

    /// Commits every staged mutation as one batch.
    ///
    /// Returns the commit sequence number. With nothing staged this is a
    /// no-op that returns the current sequence.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit log write fails; the staged mutations
    /// are discarded and committed state is untouched.
    pub fn save(&mut self) -> StoreResult<u64> {
        if self.pending.is_empty() {
            return Ok(self.committed_seq);
        }

        let batch = CommitBatch {
            sequence: self.committed_seq + 1,
            mutations: std::mem::take(&mut self.pending),
        };
        if let Err(err) = self.log.append(&batch) {
            warn!(
                error = %err,
                discarded = batch.mutations.len(),
                "save failed, staged changes discarded"
            );
            return Err(err);
        }

        debug!(
            sequence = batch.sequence,
            mutations = batch.mutations.len(),
            "committed batch"
        );
        self.committed_seq = batch.sequence;
        for mutation in batch.mutations {
            self.apply(mutation);
        }
        Ok(self.committed_seq)
    }

    /// Stages mutations through `f` and saves them as one batch.
    ///
    /// If `f` fails, whatever it staged is discarded and nothing is
    /// written. Mutations staged before the call commit with the batch.
    ///
    /// # Errors
    ///
    /// Returns the error from `f`, or from [`save`](Self::save).
    pub fn transaction<F, T>(&mut self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Self) -> StoreResult<T>,
    {
        match f(self) {
            Ok(value) => {
                self.save()?;
                Ok(value)
            }
            Err(err) => {
                let dropped = self.discard();
                debug!(error = %err, dropped, "transaction aborted");
                Err(err)
            }
        }
    }

    /// Drops every staged mutation. Returns how many were dropped.
    pub fn discard(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }

    /// Returns true if mutations are staged but not yet saved.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Runs a query over committed records.
    pub fn select<'s, R: Record>(&'s self, query: &Query<'_, R>) -> Vec<&'s R> {
        query.run(R::rows(self))
    }

    /// Looks up a committed user.
    #[must_use]
    pub fn user(&self, id: UserId) -> Option<&UserRecord> {
        self.users.iter().find(|u| u.id == id)
    }

    /// Looks up a committed post.
    #[must_use]
    pub fn post(&self, id: PostId) -> Option<&PostRecord> {
        self.posts.iter().find(|p| p.id == id)
    }

    /// Resolves the author relationship of a post.
    #[must_use]
    pub fn author_of(&self, post: &PostRecord) -> Option<&UserRecord> {
        post.author.and_then(|id| self.user(id))
    }

    /// Committed users in insertion order.
    #[must_use]
    pub fn users(&self) -> &[UserRecord] {
        &self.users
    }

    /// Committed posts in insertion order.
    #[must_use]
    pub fn posts(&self) -> &[PostRecord] {
        &self.posts
    }

    /// Sequence number of the last committed batch (0 for an empty log).
    #[must_use]
    pub fn committed_seq(&self) -> u64 {
        self.committed_seq
    }

    /// Returns the configuration the store was opened with.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Returns the directory for on-disk stores.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.dir.as_ref().map(StoreDir::path)
    }

    /// Whether `id` exists once the staged mutations are applied.
    fn user_visible_to_txn(&self, id: UserId) -> bool {
        let mut visible = self.user(id).is_some();
        for mutation in &self.pending {
            match mutation {
                Mutation::InsertUser(u) if u.id == id => visible = true,
                Mutation::DeleteUser(deleted) if *deleted == id => visible = false,
                _ => {}
            }
        }
        visible
    }

    fn apply(&mut self, mutation: Mutation) {
        match mutation {
            Mutation::InsertUser(user) => self.users.push(user),
            Mutation::InsertPost(post) => self.posts.push(post),
            Mutation::DeleteUser(id) => {
                self.users.retain(|u| u.id != id);
                self.posts.retain(|p| p.author != Some(id));
            }
        }
    }
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("path", &self.path())
            .field("users", &self.users.len())
            .field("posts", &self.posts.len())
            .field("pending", &self.pending.len())
            .field("committed_seq", &self.committed_seq)
            .finish_non_exhaustive()
    }
}
