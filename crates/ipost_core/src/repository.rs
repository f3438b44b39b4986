//! Client-side facade over the coordinator.
//!
//! [`FeedRepository`] turns coordinator results into [`FeedError`]s, keeps
//! the selected user in a [`PreferenceStore`], and tags every post-list
//! request with a [`Generation`] so that [`crate::FeedState`] can drop
//! responses that were overtaken by a newer request.

use crate::config::FeedConfig;
use crate::coordinator::{Pending, StoreCoordinator};
use crate::error::{FeedError, FeedResult};
use crate::generation::{Generation, GenerationCounter};
use crate::preferences::{PreferenceStore, UserPreferences};
use crate::snapshot::{PostSnapshot, UserSnapshot};
use ipost_store::UserId;
use tracing::{debug, info};

/// A page of posts and the generation of the request that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostsPage {
    /// Tag of the originating request.
    pub generation: Generation,
    /// Posts, newest first.
    pub posts: Vec<PostSnapshot>,
}

/// Outcome of a post-list request, success or not, with its tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostsResponse {
    /// Tag of the originating request.
    pub generation: Generation,
    /// The posts, or why they could not be read.
    pub result: FeedResult<Vec<PostSnapshot>>,
}

impl PostsResponse {
    /// Splits the response into a page or its error.
    ///
    /// # Errors
    ///
    /// Returns the error the request failed with.
    pub fn into_page(self) -> FeedResult<PostsPage> {
        let posts = self.result?;
        Ok(PostsPage {
            generation: self.generation,
            posts,
        })
    }
}

/// A post-list request already queued on the coordinator.
#[derive(Debug)]
#[must_use = "the fetch is queued either way; await `response` to read it"]
pub struct PostsRequest {
    generation: Generation,
    pending: Pending<Vec<PostSnapshot>>,
}

impl PostsRequest {
    /// Tag of this request.
    #[must_use]
    pub const fn generation(&self) -> Generation {
        self.generation
    }

    /// Waits for the posts.
    pub async fn response(self) -> PostsResponse {
        PostsResponse {
            generation: self.generation,
            result: self.pending.await.map_err(FeedError::from),
        }
    }
}

/// A saved post and the refresh that was queued right behind it.
#[derive(Debug)]
pub struct CreatedPost {
    /// The new post as saved.
    pub post: PostSnapshot,
    /// Refresh issued after the save; its response includes `post`.
    pub refresh: PostsRequest,
}

/// Repository client used by presentation code.
#[derive(Debug)]
pub struct FeedRepository<P> {
    coordinator: StoreCoordinator,
    preferences: UserPreferences<P>,
    generations: GenerationCounter,
    config: FeedConfig,
}

impl<P: PreferenceStore> FeedRepository<P> {
    /// Creates a client over a running coordinator.
    pub fn new(coordinator: StoreCoordinator, preferences: P, config: FeedConfig) -> Self {
        Self {
            coordinator,
            preferences: UserPreferences::new(preferences),
            generations: GenerationCounter::new(),
            config,
        }
    }

    /// Returns every user, writing the default data set first if the store
    /// holds none. Safe to call repeatedly and concurrently.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::UsersUnavailable`] if the read or the seed
    /// fails; nothing partial is left behind and the call can be retried.
    pub async fn load_users(&self) -> FeedResult<Vec<UserSnapshot>> {
        let listing = self
            .coordinator
            .load_or_seed_users()
            .await
            .map_err(FeedError::users_unavailable)?;
        if listing.seeded {
            info!(users = listing.users.len(), "store was empty, default data written");
        }
        Ok(listing.users)
    }

    /// Looks up one user.
    ///
    /// # Errors
    ///
    /// Returns an error if the coordinator is unavailable or unconfigured.
    pub async fn user(&self, id: UserId) -> FeedResult<Option<UserSnapshot>> {
        Ok(self.coordinator.fetch_user(id).await?)
    }

    /// Queues a post-list fetch of the configured default size.
    pub fn request_posts(&self) -> PostsRequest {
        self.request_posts_limited(self.config.default_post_limit)
    }

    /// Queues a post-list fetch of at most `limit` posts under a fresh
    /// generation.
    pub fn request_posts_limited(&self, limit: usize) -> PostsRequest {
        let generation = self.generations.next();
        debug!(%generation, limit, "requesting posts");
        PostsRequest {
            generation,
            pending: self.coordinator.fetch_posts(limit),
        }
    }

    /// Fetches the default page of posts.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::PersistenceFailure`] if the store read fails.
    pub async fn load_posts(&self) -> FeedResult<PostsPage> {
        self.request_posts().response().await.into_page()
    }

    /// Fetches at most `limit` posts.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::PersistenceFailure`] if the store read fails.
    pub async fn load_posts_limited(&self, limit: usize) -> FeedResult<PostsPage> {
        self.request_posts_limited(limit).response().await.into_page()
    }

    /// Creates a post by `author_id`.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::AuthorNotFound`] for an unknown author or
    /// [`FeedError::PersistenceFailure`] if the save fails.
    pub async fn create_post(
        &self,
        text: impl Into<String>,
        image: Option<String>,
        author_id: UserId,
    ) -> FeedResult<PostSnapshot> {
        Ok(self.coordinator.create_post(text, image, author_id).await?)
    }

    /// Creates a post and, once it is saved, queues a refresh under a fresh
    /// generation. The refresh is submitted after the write completed, so
    /// its response contains the new post. A failed write issues no fetch.
    ///
    /// # Errors
    ///
    /// Same as [`create_post`](Self::create_post).
    pub async fn create_post_and_refresh(
        &self,
        text: impl Into<String>,
        image: Option<String>,
        author_id: UserId,
    ) -> FeedResult<CreatedPost> {
        let post = self.coordinator.create_post(text, image, author_id).await?;
        Ok(CreatedPost {
            post,
            refresh: self.request_posts(),
        })
    }

    /// Creates a post authored by the persisted selection.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::NoUserSelected`] if there is no selection,
    /// otherwise the same as [`create_post`](Self::create_post).
    pub async fn create_post_for_selected_user(
        &self,
        text: impl Into<String>,
        image: Option<String>,
    ) -> FeedResult<PostSnapshot> {
        let author = self.selected_user_id().ok_or(FeedError::NoUserSelected)?;
        self.create_post(text, image, author).await
    }

    /// Persists `id` as the selected user. Does not touch the record store.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Preferences`] if the preference store fails.
    pub fn select_user(&self, id: UserId) -> FeedResult<()> {
        self.preferences.set_selected_user_id(Some(id))?;
        debug!(user_id = %id, "selected user");
        Ok(())
    }

    /// Forgets the selected user.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Preferences`] if the preference store fails.
    pub fn clear_selection(&self) -> FeedResult<()> {
        Ok(self.preferences.set_selected_user_id(None)?)
    }

    /// The persisted selection, if any.
    pub fn selected_user_id(&self) -> Option<UserId> {
        self.preferences.selected_user_id()
    }

    /// Reconciles the persisted selection with `users`.
    ///
    /// Keeps a saved selection that still names one of `users`; otherwise
    /// selects and persists the first user. Returns `None` only when
    /// `users` is empty.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Preferences`] if persisting the fallback fails.
    pub fn restore_selection(&self, users: &[UserSnapshot]) -> FeedResult<Option<UserId>> {
        if let Some(saved) = self.selected_user_id() {
            if users.iter().any(|u| u.id == saved) {
                return Ok(Some(saved));
            }
            debug!(user_id = %saved, "saved selection no longer exists");
        }
        match users.first() {
            Some(first) => {
                self.select_user(first.id)?;
                Ok(Some(first.id))
            }
            None => Ok(None),
        }
    }

    /// The most recent generation handed out.
    pub fn latest_generation(&self) -> Option<Generation> {
        self.generations.latest()
    }

    /// Client configuration.
    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// The coordinator this client submits to.
    pub fn coordinator(&self) -> &StoreCoordinator {
        &self.coordinator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoordinatorConfig;
    use crate::preferences::InMemoryPreferences;
    use crate::seed::SEED_USER_COUNT;
    use ipost_store::RecordStore;

    fn repository() -> FeedRepository<InMemoryPreferences> {
        let store = RecordStore::open_in_memory().unwrap();
        let coordinator =
            StoreCoordinator::with_store(store, CoordinatorConfig::default()).unwrap();
        FeedRepository::new(coordinator, InMemoryPreferences::new(), FeedConfig::default())
    }

    #[tokio::test]
    async fn requests_get_increasing_generations() {
        let repo = repository();
        repo.load_users().await.unwrap();
        let first = repo.request_posts();
        let second = repo.request_posts_limited(2);
        assert!(second.generation() > first.generation());
        assert_eq!(repo.latest_generation(), Some(second.generation()));

        let page = second.response().await.into_page().unwrap();
        assert_eq!(page.posts.len(), 2);
        let page = first.response().await.into_page().unwrap();
        assert_eq!(page.posts.len(), 5);
    }

    #[tokio::test]
    async fn restore_selection_prefers_saved_user() {
        let repo = repository();
        let users = repo.load_users().await.unwrap();
        assert_eq!(users.len(), SEED_USER_COUNT);

        assert_eq!(repo.restore_selection(&users).unwrap(), Some(users[0].id));
        repo.select_user(users[2].id).unwrap();
        assert_eq!(repo.restore_selection(&users).unwrap(), Some(users[2].id));
    }

    #[tokio::test]
    async fn restore_selection_replaces_stale_id() {
        let repo = repository();
        let users = repo.load_users().await.unwrap();
        repo.select_user(UserId::new()).unwrap();
        assert_eq!(repo.restore_selection(&users).unwrap(), Some(users[0].id));
        assert_eq!(repo.selected_user_id(), Some(users[0].id));
        assert_eq!(repo.restore_selection(&[]).unwrap(), None);
    }

    #[tokio::test]
    async fn create_for_selected_user() {
        let repo = repository();
        let users = repo.load_users().await.unwrap();
        assert_eq!(
            repo.create_post_for_selected_user("hi", None).await,
            Err(FeedError::NoUserSelected)
        );

        repo.select_user(users[1].id).unwrap();
        let post = repo.create_post_for_selected_user("hi", None).await.unwrap();
        assert_eq!(post.author_id(), Some(users[1].id));

        repo.clear_selection().unwrap();
        assert_eq!(repo.selected_user_id(), None);
    }

    #[tokio::test]
    async fn refresh_after_create_sees_the_post() {
        let repo = repository();
        let users = repo.load_users().await.unwrap();
        let created = repo
            .create_post_and_refresh("fresh", Some("book.fill".into()), users[0].id)
            .await
            .unwrap();
        let page = created.refresh.response().await.into_page().unwrap();
        assert_eq!(page.posts[0], created.post);
    }

    #[tokio::test]
    async fn failed_create_issues_no_refresh() {
        let repo = repository();
        repo.load_users().await.unwrap();
        let before = repo.latest_generation();
        let err = repo
            .create_post_and_refresh("hi", None, UserId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FeedError::AuthorNotFound { .. }));
        assert_eq!(repo.latest_generation(), before);
    }

    #[tokio::test]
    async fn user_lookup() {
        let repo = repository();
        let users = repo.load_users().await.unwrap();
        assert_eq!(repo.user(users[0].id).await.unwrap(), Some(users[0].clone()));
        assert_eq!(repo.user(UserId::new()).await.unwrap(), None);
    }
}
