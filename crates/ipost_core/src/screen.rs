//! Screen-level driver tying the repository to a [`FeedState`].

use crate::error::{FeedError, FeedResult};
use crate::preferences::PreferenceStore;
use crate::reconcile::{Delivery, FeedState};
use crate::repository::{FeedRepository, PostsRequest, PostsResponse};
use crate::snapshot::{PostSnapshot, UserSnapshot};
use ipost_store::UserId;
use tracing::debug;

/// Users, selection, and the reconciled feed for one screen.
#[derive(Debug)]
pub struct FeedScreen<P> {
    repository: FeedRepository<P>,
    state: FeedState,
    users: Vec<UserSnapshot>,
    selected: Option<UserId>,
}

impl<P: PreferenceStore> FeedScreen<P> {
    /// Creates a screen with nothing loaded.
    pub fn new(repository: FeedRepository<P>) -> Self {
        Self {
            repository,
            state: FeedState::new(),
            users: Vec::new(),
            selected: None,
        }
    }

    /// Loads users (seeding an empty store), restores the selection and
    /// fetches the first page of posts.
    ///
    /// # Errors
    ///
    /// Returns the user-loading or preference error. A failed post fetch is
    /// recorded in [`state`](Self::state) instead.
    pub async fn load_initial(&mut self) -> FeedResult<Delivery> {
        let users = self.repository.load_users().await?;
        self.selected = self.repository.restore_selection(&users)?;
        self.users = users;
        Ok(self.refresh().await)
    }

    /// Issues a refresh and waits for it.
    pub async fn refresh(&mut self) -> Delivery {
        let request = self.issue_refresh();
        let response = request.response().await;
        self.deliver(response)
    }

    /// Issues a refresh without waiting. Pair with [`deliver`](Self::deliver).
    pub fn issue_refresh(&mut self) -> PostsRequest {
        let request = self.repository.request_posts();
        self.state.begin_loading(request.generation());
        request
    }

    /// Hands a response to the feed state.
    pub fn deliver(&mut self, response: PostsResponse) -> Delivery {
        self.state.deliver(response)
    }

    /// Makes `id` the current user and persists the choice.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::AuthorNotFound`] if `id` is not a loaded user.
    pub fn select_user(&mut self, id: UserId) -> FeedResult<()> {
        if !self.users.iter().any(|u| u.id == id) {
            return Err(FeedError::AuthorNotFound { author_id: id });
        }
        self.repository.select_user(id)?;
        self.selected = Some(id);
        Ok(())
    }

    /// Creates a post as the current user and shows it at once. Returns the
    /// refresh queued behind the write; deliver its response to confirm
    /// the post.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::NoUserSelected`] without a current user, or the
    /// write error. Failures are also recorded in the state.
    pub async fn submit_post(
        &mut self,
        text: impl Into<String>,
        image: Option<String>,
    ) -> FeedResult<(PostSnapshot, PostsRequest)> {
        let result = match self.selected {
            Some(author) => {
                self.repository
                    .create_post_and_refresh(text, image, author)
                    .await
            }
            None => Err(FeedError::NoUserSelected),
        };
        match result {
            Ok(created) => {
                self.state
                    .apply_created(created.post.clone(), created.refresh.generation());
                Ok((created.post, created.refresh))
            }
            Err(err) => {
                debug!(error = %err, "post not created");
                self.state.apply_create_failure(err.clone());
                Err(err)
            }
        }
    }

    /// [`submit_post`](Self::submit_post), then waits for the refresh.
    ///
    /// # Errors
    ///
    /// Same as `submit_post`.
    pub async fn create_post(
        &mut self,
        text: impl Into<String>,
        image: Option<String>,
    ) -> FeedResult<PostSnapshot> {
        let (post, refresh) = self.submit_post(text, image).await?;
        let response = refresh.response().await;
        self.deliver(response);
        Ok(post)
    }

    /// Reconciled feed state.
    pub fn state(&self) -> &FeedState {
        &self.state
    }

    /// Mutable feed state, e.g. to take a shown error.
    pub fn state_mut(&mut self) -> &mut FeedState {
        &mut self.state
    }

    /// Loaded users.
    pub fn users(&self) -> &[UserSnapshot] {
        &self.users
    }

    /// The current user.
    pub fn selected_user(&self) -> Option<&UserSnapshot> {
        let id = self.selected?;
        self.users.iter().find(|u| u.id == id)
    }

    /// The underlying repository.
    pub fn repository(&self) -> &FeedRepository<P> {
        &self.repository
    }
}
