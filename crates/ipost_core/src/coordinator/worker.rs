//! The coordinator thread: sole owner of the record store.

use super::command::{Command, PostDraft, Reply, UserListing};
use crate::error::{CoordinatorError, CoordinatorResult, Operation};
use crate::seed::default_seed;
use crate::snapshot::{PostSnapshot, UserSnapshot};
use ipost_store::{PostRecord, Query, RecordStore, StoreError, UserId, UserRecord};
use mockable::Clock;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

pub(crate) struct Worker {
    store: Option<RecordStore>,
    clock: Arc<dyn Clock + Send + Sync>,
    commands: mpsc::UnboundedReceiver<Command>,
}

impl Worker {
    pub(crate) fn new(
        clock: Arc<dyn Clock + Send + Sync>,
        commands: mpsc::UnboundedReceiver<Command>,
    ) -> Self {
        Self {
            store: None,
            clock,
            commands,
        }
    }

    /// Runs commands one at a time, in arrival order, until every sender
    /// is dropped.
    pub(crate) fn run(mut self) {
        info!("store coordinator started");
        while let Some(command) = self.commands.blocking_recv() {
            self.process(command);
        }
        if let Some(store) = self.store.take() {
            debug!(?store, "releasing attached store");
        }
        info!("store coordinator shutting down");
    }

    fn process(&mut self, command: Command) {
        let operation = command.operation();
        trace!(%operation, "running");
        match command {
            Command::Attach { store, reply } => respond(reply, operation, self.attach(*store)),
            Command::Detach { reply } => respond(reply, operation, self.detach()),
            Command::FetchUsers { reply } => respond(reply, operation, self.fetch_users()),
            Command::FetchUser { id, reply } => respond(reply, operation, self.fetch_user(id)),
            Command::SeedDefaults { reply } => respond(reply, operation, self.seed_defaults()),
            Command::LoadOrSeedUsers { reply } => {
                respond(reply, operation, self.load_or_seed_users());
            }
            Command::FetchPosts { limit, reply } => {
                respond(reply, operation, self.fetch_posts(limit));
            }
            Command::CreatePost { draft, reply } => {
                respond(reply, operation, self.create_post(draft));
            }
        }
    }

    fn store(&self) -> CoordinatorResult<&RecordStore> {
        self.store.as_ref().ok_or(CoordinatorError::NotConfigured)
    }

    fn store_mut(&mut self) -> CoordinatorResult<&mut RecordStore> {
        self.store.as_mut().ok_or(CoordinatorError::NotConfigured)
    }

    fn attach(&mut self, store: RecordStore) -> CoordinatorResult<()> {
        if self.store.is_some() {
            warn!(rejected = ?store, "store already attached");
            return Err(CoordinatorError::AlreadyConfigured);
        }
        info!(
            path = ?store.path(),
            users = store.users().len(),
            posts = store.posts().len(),
            "store attached"
        );
        self.store = Some(store);
        Ok(())
    }

    fn detach(&mut self) -> CoordinatorResult<RecordStore> {
        let store = self.store.take().ok_or(CoordinatorError::NotConfigured)?;
        info!(path = ?store.path(), "store detached");
        Ok(store)
    }

    fn fetch_users(&self) -> CoordinatorResult<Vec<UserSnapshot>> {
        let store = self.store()?;
        Ok(store.users().iter().map(UserSnapshot::capture).collect())
    }

    fn fetch_user(&self, id: UserId) -> CoordinatorResult<Option<UserSnapshot>> {
        let store = self.store()?;
        Ok(store
            .select(&Query::<UserRecord>::by_id(id))
            .first()
            .map(|user| UserSnapshot::capture(user)))
    }

    fn seed_defaults(&mut self) -> CoordinatorResult<Vec<UserSnapshot>> {
        let now = self.clock.utc();
        let store = self.store_mut()?;
        let seed = default_seed(now);
        let ids: Vec<UserId> = seed.users.iter().map(|u| u.id).collect();
        let post_count = seed.posts.len();

        store
            .transaction(|s| {
                for user in seed.users {
                    s.insert_user(user)?;
                }
                for post in seed.posts {
                    s.insert_post(post)?;
                }
                Ok(())
            })
            .map_err(|source| CoordinatorError::persistence(Operation::SeedDefaults, source))?;

        info!(users = ids.len(), posts = post_count, "seeded default data");
        Ok(ids
            .into_iter()
            .filter_map(|id| store.user(id))
            .map(UserSnapshot::capture)
            .collect())
    }

    fn load_or_seed_users(&mut self) -> CoordinatorResult<UserListing> {
        if !self.store()?.users().is_empty() {
            return Ok(UserListing {
                users: self.fetch_users()?,
                seeded: false,
            });
        }
        let users = self.seed_defaults().map_err(|err| match err {
            CoordinatorError::Persistence { source, .. } => {
                CoordinatorError::persistence(Operation::LoadOrSeedUsers, source)
            }
            other => other,
        })?;
        Ok(UserListing {
            users,
            seeded: true,
        })
    }

    fn fetch_posts(&self, limit: usize) -> CoordinatorResult<Vec<PostSnapshot>> {
        let store = self.store()?;
        let query = Query::<PostRecord>::all().newest_first().limit(limit);
        Ok(store
            .select(&query)
            .into_iter()
            .map(|post| PostSnapshot::capture(post, store))
            .collect())
    }

    fn create_post(&mut self, draft: PostDraft) -> CoordinatorResult<PostSnapshot> {
        let now = self.clock.utc();
        let store = self.store_mut()?;
        let PostDraft {
            text,
            image,
            author_id,
        } = draft;

        if store.user(author_id).is_none() {
            debug!(%author_id, "create post rejected: unknown author");
            return Err(CoordinatorError::AuthorNotFound { author_id });
        }

        let record = PostRecord::new(text, image, now, author_id);
        let staged = record.clone();
        store
            .transaction(move |s| s.insert_post(staged))
            .map_err(|source| match source {
                StoreError::MissingAuthor { author_id } => {
                    CoordinatorError::AuthorNotFound { author_id }
                }
                source => CoordinatorError::persistence(Operation::CreatePost, source),
            })?;

        debug!(post_id = %record.id, %author_id, "post created");
        Ok(PostSnapshot::with_author(&record, store.user(author_id)))
    }
}

/// Delivers a result. A caller that stopped waiting does not undo the work.
fn respond<T>(reply: Reply<T>, operation: Operation, result: CoordinatorResult<T>) {
    if let Err(err) = &result {
        debug!(%operation, error = %err, "operation failed");
    }
    if reply.send(result).is_err() {
        trace!(%operation, "caller went away before the result was delivered");
    }
}
