//! Presentation-side feed state.
//!
//! [`FeedState`] holds the visible post list and decides what to do with
//! each response:
//!
//! - only the response to the most recently issued request is applied;
//!   anything older is reported as [`Delivery::Stale`] and ignored;
//! - posts created locally are shown immediately and stay merged into
//!   every applied list until a response contains them;
//! - a failed fetch keeps the current list and records the error.

use crate::error::FeedError;
use crate::generation::Generation;
use crate::repository::PostsResponse;
use crate::snapshot::PostSnapshot;
use ipost_store::PostId;
use tracing::{debug, trace};

/// Loading status of the feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LoadPhase {
    /// Nothing requested yet.
    #[default]
    Idle,
    /// Waiting on the latest request.
    Loading,
    /// The latest request was applied.
    Loaded,
    /// The latest request failed; the list shows older data.
    Failed(FeedError),
}

/// What happened to a delivered response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The response was the latest and now drives the state.
    Applied,
    /// A newer request was issued, or this one was already applied.
    Stale,
}

/// Visible feed plus the bookkeeping needed to reconcile responses.
#[derive(Debug, Clone, Default)]
pub struct FeedState {
    phase: LoadPhase,
    latest: Option<Generation>,
    applied: Option<Generation>,
    posts: Vec<PostSnapshot>,
    optimistic: Vec<PostSnapshot>,
    last_error: Option<FeedError>,
}

impl FeedState {
    /// Creates an empty, idle state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that a request tagged `generation` was issued. Responses to
    /// earlier requests become stale. A generation older than the latest is
    /// ignored.
    pub fn begin_loading(&mut self, generation: Generation) {
        if self.latest.is_some_and(|latest| generation <= latest) {
            trace!(%generation, latest = ?self.latest, "ignoring out-of-order request tag");
            return;
        }
        self.latest = Some(generation);
        self.phase = LoadPhase::Loading;
    }

    /// Applies `response` if it answers the latest request.
    pub fn deliver(&mut self, response: PostsResponse) -> Delivery {
        let generation = response.generation;
        if self.latest != Some(generation) || self.applied == Some(generation) {
            debug!(%generation, latest = ?self.latest, "discarding stale posts response");
            return Delivery::Stale;
        }
        self.applied = Some(generation);
        match response.result {
            Ok(posts) => {
                self.replace(posts);
                self.phase = LoadPhase::Loaded;
            }
            Err(err) => {
                debug!(%generation, error = %err, "posts request failed");
                self.phase = LoadPhase::Failed(err.clone());
                self.last_error = Some(err);
            }
        }
        Delivery::Applied
    }

    /// Shows a post that was just saved and records the refresh issued
    /// behind it.
    ///
    /// The post is placed by timestamp, newest first. If a post with the
    /// same id is already visible, nothing is added.
    pub fn apply_created(&mut self, post: PostSnapshot, refresh: Generation) {
        self.last_error = None;
        if !self.posts.iter().any(|p| p.id == post.id) {
            insert_by_time(&mut self.posts, post.clone());
            self.optimistic.push(post);
        }
        self.begin_loading(refresh);
    }

    /// Records a failed write. The list and any in-flight request are left
    /// alone.
    pub fn apply_create_failure(&mut self, error: FeedError) {
        self.last_error = Some(error);
    }

    /// The visible posts, newest first.
    #[must_use]
    pub fn posts(&self) -> &[PostSnapshot] {
        &self.posts
    }

    /// Whether `id` is shown only because it was created locally.
    #[must_use]
    pub fn is_optimistic(&self, id: PostId) -> bool {
        self.optimistic.iter().any(|p| p.id == id)
    }

    /// Number of locally created posts not yet confirmed by a response.
    #[must_use]
    pub fn optimistic_count(&self) -> usize {
        self.optimistic.len()
    }

    /// Current loading status.
    #[must_use]
    pub fn phase(&self) -> &LoadPhase {
        &self.phase
    }

    /// Whether a request is outstanding.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.phase == LoadPhase::Loading
    }

    /// Tag of the latest issued request.
    #[must_use]
    pub fn latest_generation(&self) -> Option<Generation> {
        self.latest
    }

    /// Most recent failure, read or write.
    #[must_use]
    pub fn last_error(&self) -> Option<&FeedError> {
        self.last_error.as_ref()
    }

    /// Takes the most recent failure, e.g. once an alert was shown.
    pub fn take_error(&mut self) -> Option<FeedError> {
        self.last_error.take()
    }

    fn replace(&mut self, authoritative: Vec<PostSnapshot>) {
        self.optimistic
            .retain(|local| !authoritative.iter().any(|p| p.id == local.id));
        self.posts = authoritative;
        for local in &self.optimistic {
            insert_by_time(&mut self.posts, local.clone());
        }
    }
}

/// Inserts after every post at least as new, keeping newest-first order
/// and placing ties after existing entries.
fn insert_by_time(posts: &mut Vec<PostSnapshot>, post: PostSnapshot) {
    let at = posts.partition_point(|p| p.timestamp >= post.timestamp);
    posts.insert(at, post);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Operation;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn post(text: &str, minutes: i64) -> PostSnapshot {
        PostSnapshot {
            id: PostId::new(),
            text: text.to_string(),
            image: None,
            timestamp: base() + Duration::minutes(minutes),
            author: None,
        }
    }

    fn ok(generation: u64, posts: Vec<PostSnapshot>) -> PostsResponse {
        PostsResponse {
            generation: Generation::new(generation),
            result: Ok(posts),
        }
    }

    fn texts(state: &FeedState) -> Vec<&str> {
        state.posts().iter().map(|p| p.text.as_str()).collect()
    }

    #[test]
    fn applies_latest_and_drops_older() {
        let mut state = FeedState::new();
        state.begin_loading(Generation::new(1));
        state.begin_loading(Generation::new(2));
        assert!(state.is_loading());

        let newer = vec![post("b", 2), post("a", 1)];
        assert_eq!(state.deliver(ok(2, newer)), Delivery::Applied);
        assert_eq!(state.phase(), &LoadPhase::Loaded);

        assert_eq!(state.deliver(ok(1, vec![post("old", 0)])), Delivery::Stale);
        assert_eq!(texts(&state), ["b", "a"]);
    }

    #[test]
    fn repeated_delivery_is_stale() {
        let mut state = FeedState::new();
        state.begin_loading(Generation::new(1));
        let page = vec![post("a", 0)];
        assert_eq!(state.deliver(ok(1, page.clone())), Delivery::Applied);
        assert_eq!(state.deliver(ok(1, page)), Delivery::Stale);
    }

    #[test]
    fn unrequested_generation_is_stale() {
        let mut state = FeedState::new();
        assert_eq!(state.deliver(ok(7, vec![post("x", 0)])), Delivery::Stale);
        assert!(state.posts().is_empty());
        assert_eq!(state.phase(), &LoadPhase::Idle);
    }

    #[test]
    fn optimistic_post_shown_then_confirmed() {
        let mut state = FeedState::new();
        state.begin_loading(Generation::new(1));
        state.deliver(ok(1, vec![post("b", 2), post("a", 1)]));

        let mine = post("mine", 3);
        state.apply_created(mine.clone(), Generation::new(2));
        assert_eq!(texts(&state), ["mine", "b", "a"]);
        assert!(state.is_optimistic(mine.id));

        let confirmed = vec![mine.clone(), post("b", 2), post("a", 1)];
        assert_eq!(state.deliver(ok(2, confirmed)), Delivery::Applied);
        assert_eq!(texts(&state), ["mine", "b", "a"]);
        assert!(!state.is_optimistic(mine.id));
        assert_eq!(state.optimistic_count(), 0);
    }

    #[test]
    fn optimistic_post_survives_response_without_it() {
        let mut state = FeedState::new();
        let mine = post("mine", 5);
        state.apply_created(mine.clone(), Generation::new(1));

        state.deliver(ok(1, vec![post("b", 2)]));
        assert_eq!(texts(&state), ["mine", "b"]);
        assert!(state.is_optimistic(mine.id));
    }

    #[test]
    fn optimistic_post_placed_by_timestamp() {
        let mut state = FeedState::new();
        state.begin_loading(Generation::new(1));
        state.deliver(ok(1, vec![post("c", 3), post("a", 1)]));

        state.apply_created(post("b", 2), Generation::new(2));
        assert_eq!(texts(&state), ["c", "b", "a"]);
    }

    #[test]
    fn duplicate_create_not_shown_twice() {
        let mut state = FeedState::new();
        let mine = post("mine", 1);
        state.apply_created(mine.clone(), Generation::new(1));
        state.apply_created(mine.clone(), Generation::new(2));
        assert_eq!(texts(&state), ["mine"]);
        assert_eq!(state.optimistic_count(), 1);
    }

    #[test]
    fn failed_fetch_keeps_list() {
        let mut state = FeedState::new();
        state.begin_loading(Generation::new(1));
        state.deliver(ok(1, vec![post("a", 1)]));

        state.begin_loading(Generation::new(2));
        let failure = FeedError::PersistenceFailure {
            operation: Operation::FetchPosts,
            message: "read failed".into(),
        };
        let response = PostsResponse {
            generation: Generation::new(2),
            result: Err(failure.clone()),
        };
        assert_eq!(state.deliver(response), Delivery::Applied);
        assert_eq!(state.phase(), &LoadPhase::Failed(failure.clone()));
        assert_eq!(texts(&state), ["a"]);
        assert_eq!(state.take_error(), Some(failure));
        assert_eq!(state.last_error(), None);
    }

    #[test]
    fn create_failure_changes_nothing_but_error() {
        let mut state = FeedState::new();
        state.begin_loading(Generation::new(1));
        state.deliver(ok(1, vec![post("a", 1)]));

        state.apply_create_failure(FeedError::NoUserSelected);
        assert_eq!(texts(&state), ["a"]);
        assert_eq!(state.phase(), &LoadPhase::Loaded);
        assert_eq!(state.latest_generation(), Some(Generation::new(1)));
        assert_eq!(state.last_error(), Some(&FeedError::NoUserSelected));
    }

    #[test]
    fn older_request_tag_ignored() {
        let mut state = FeedState::new();
        state.begin_loading(Generation::new(3));
        state.begin_loading(Generation::new(2));
        assert_eq!(state.latest_generation(), Some(Generation::new(3)));
    }
}
