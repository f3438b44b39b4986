//! Predicate, ordering and limit queries.

use crate::ids::UserId;
use crate::record::{PostRecord, Record, UserRecord};
use std::cmp::Ordering;

type Predicate<'a, R> = Box<dyn Fn(&R) -> bool + 'a>;
type Comparator<'a, R> = Box<dyn Fn(&R, &R) -> Ordering + 'a>;

/// Ordering for post queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostOrder {
    /// Latest timestamp first.
    NewestFirst,
    /// Earliest timestamp first.
    OldestFirst,
}

/// A query over one record kind.
///
/// Evaluation is filter, then a *stable* sort, then limit. Rows that compare
/// equal keep their insertion order.
///
/// Filtering uses ordinary closures:
///
/// ```rust,ignore
/// let mine = store.select(
///     &Query::<PostRecord>::all()
///         .filter(|p| p.author == Some(author))
///         .newest_first(),
/// );
/// ```
pub struct Query<'a, R> {
    predicate: Option<Predicate<'a, R>>,
    order: Option<Comparator<'a, R>>,
    limit: Option<usize>,
}

impl<'a, R: Record + 'a> Query<'a, R> {
    /// Matches every row, in insertion order.
    #[must_use]
    pub fn all() -> Self {
        Self {
            predicate: None,
            order: None,
            limit: None,
        }
    }

    /// Keeps only rows for which `predicate` holds.
    ///
    /// Calling `filter` twice requires both predicates to hold.
    #[must_use]
    pub fn filter(mut self, predicate: impl Fn(&R) -> bool + 'a) -> Self {
        self.predicate = Some(match self.predicate.take() {
            Some(existing) => Box::new(move |row: &R| existing(row) && predicate(row)),
            None => Box::new(predicate),
        });
        self
    }

    /// Sorts matching rows with `compare`.
    #[must_use]
    pub fn sort_by(mut self, compare: impl Fn(&R, &R) -> Ordering + 'a) -> Self {
        self.order = Some(Box::new(compare));
        self
    }

    /// Returns at most `limit` rows.
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub(crate) fn run<'s>(&self, rows: &'s [R]) -> Vec<&'s R> {
        let mut matched: Vec<&'s R> = match &self.predicate {
            Some(predicate) => rows.iter().filter(|row| predicate(row)).collect(),
            None => rows.iter().collect(),
        };
        if let Some(compare) = &self.order {
            matched.sort_by(|a, b| compare(a, b));
        }
        if let Some(limit) = self.limit {
            matched.truncate(limit);
        }
        matched
    }
}

impl<'a> Query<'a, PostRecord> {
    /// Orders posts by timestamp.
    #[must_use]
    pub fn ordered(self, order: PostOrder) -> Self {
        match order {
            PostOrder::NewestFirst => self.sort_by(|a, b| b.timestamp.cmp(&a.timestamp)),
            PostOrder::OldestFirst => self.sort_by(|a, b| a.timestamp.cmp(&b.timestamp)),
        }
    }

    /// Shorthand for `ordered(PostOrder::NewestFirst)`.
    #[must_use]
    pub fn newest_first(self) -> Self {
        self.ordered(PostOrder::NewestFirst)
    }

    /// Keeps posts written by `author`.
    #[must_use]
    pub fn by_author(self, author: UserId) -> Self {
        self.filter(move |post| post.author == Some(author))
    }
}

impl<'a> Query<'a, UserRecord> {
    /// Matches the user with `id`.
    #[must_use]
    pub fn by_id(id: UserId) -> Self {
        Self::all().filter(move |user| user.id == id).limit(1)
    }
}

impl<R> std::fmt::Debug for Query<'_, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("filtered", &self.predicate.is_some())
            .field("sorted", &self.order.is_some())
            .field("limit", &self.limit)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn post_at(text: &str, secs: i64, author: UserId) -> PostRecord {
        let at = Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap();
        PostRecord::new(text, None, at, author)
    }

    #[test]
    fn all_keeps_insertion_order() {
        let author = UserId::new();
        let rows = vec![post_at("a", 3, author), post_at("b", 1, author)];
        let texts: Vec<_> = Query::<PostRecord>::all()
            .run(&rows)
            .iter()
            .map(|p| p.text.as_str())
            .collect();
        assert_eq!(texts, ["a", "b"]);
    }

    #[test]
    fn newest_first_is_stable_on_ties() {
        let author = UserId::new();
        let rows = vec![
            post_at("old", 0, author),
            post_at("tie-1", 5, author),
            post_at("tie-2", 5, author),
            post_at("new", 9, author),
        ];
        let texts: Vec<_> = Query::<PostRecord>::all()
            .newest_first()
            .run(&rows)
            .iter()
            .map(|p| p.text.as_str())
            .collect();
        assert_eq!(texts, ["new", "tie-1", "tie-2", "old"]);
    }

    #[test]
    fn oldest_first_reverses_timestamps_not_ties() {
        let author = UserId::new();
        let rows = vec![
            post_at("new", 9, author),
            post_at("tie-1", 5, author),
            post_at("tie-2", 5, author),
            post_at("old", 0, author),
        ];
        let texts: Vec<_> = Query::<PostRecord>::all()
            .ordered(PostOrder::OldestFirst)
            .run(&rows)
            .iter()
            .map(|p| p.text.as_str())
            .collect();
        assert_eq!(texts, ["old", "tie-1", "tie-2", "new"]);
    }

    #[test]
    fn limit_applies_after_sort() {
        let author = UserId::new();
        let rows: Vec<_> = (0..5).map(|i| post_at(&i.to_string(), i, author)).collect();
        let texts: Vec<_> = Query::<PostRecord>::all()
            .newest_first()
            .limit(2)
            .run(&rows)
            .iter()
            .map(|p| p.text.as_str())
            .collect();
        assert_eq!(texts, ["4", "3"]);
    }

    #[test]
    fn zero_limit_is_empty() {
        let rows = vec![post_at("a", 0, UserId::new())];
        assert!(Query::<PostRecord>::all().limit(0).run(&rows).is_empty());
    }

    #[test]
    fn filters_compose() {
        let alice = UserId::new();
        let bob = UserId::new();
        let rows = vec![
            post_at("a1", 0, alice),
            post_at("b1", 1, bob),
            post_at("a2", 30, alice),
        ];
        let matched = Query::<PostRecord>::all()
            .by_author(alice)
            .filter(|p| p.text.ends_with('2'))
            .run(&rows);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].text, "a2");
    }

    #[test]
    fn user_by_id() {
        let users = vec![
            UserRecord::new("John Doe", "@johndoe", "person.fill"),
            UserRecord::new("Jane Smith", "@janesmith", "person.crop.circle.fill"),
        ];
        let found = Query::<UserRecord>::by_id(users[1].id).run(&users);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].handle, "@janesmith");
    }

    proptest::proptest! {
        #[test]
        fn newest_first_sorted_and_stable(offsets in proptest::collection::vec(0i64..5, 0..40)) {
            let author = UserId::new();
            let rows: Vec<_> = offsets
                .iter()
                .enumerate()
                .map(|(i, secs)| post_at(&i.to_string(), *secs, author))
                .collect();
            let sorted = Query::<PostRecord>::all().newest_first().run(&rows);
            proptest::prop_assert_eq!(sorted.len(), rows.len());
            for pair in sorted.windows(2) {
                proptest::prop_assert!(pair[0].timestamp >= pair[1].timestamp);
                if pair[0].timestamp == pair[1].timestamp {
                    let a: usize = pair[0].text.parse().unwrap();
                    let b: usize = pair[1].text.parse().unwrap();
                    proptest::prop_assert!(a < b);
                }
            }
        }
    }
}
