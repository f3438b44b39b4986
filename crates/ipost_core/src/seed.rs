//! Default users and posts written into an empty store.

use chrono::{DateTime, Duration, Utc};
use ipost_store::{PostRecord, UserRecord};

/// Number of users in the default data set.
pub const SEED_USER_COUNT: usize = 3;

/// Number of posts in the default data set.
pub const SEED_POST_COUNT: usize = 5;

const USERS: [(&str, &str, &str); SEED_USER_COUNT] = [
    ("John Doe", "@johndoe", "person.fill"),
    ("Jane Smith", "@janesmith", "person.crop.circle.fill"),
    ("Robert Johnson", "@robertj", "person.2.fill"),
];

/// (text, image, index into `USERS`)
const POSTS: [(&str, Option<&str>, usize); SEED_POST_COUNT] = [
    ("Just started using iPost! Loving it so far!", None, 0),
    ("Working on a new project today #coding", None, 1),
    ("Beautiful weather for a hike!", Some("figure.hiking"), 2),
    ("Check out this cool app I'm building", Some("laptopcomputer"), 0),
    ("Just finished reading an amazing book!", Some("book.fill"), 1),
];

/// The default data set, ready to insert in order.
#[derive(Debug)]
pub(crate) struct SeedData {
    pub(crate) users: Vec<UserRecord>,
    pub(crate) posts: Vec<PostRecord>,
}

/// Builds the default data set from a single clock reading.
///
/// Posts are a minute apart and the last one carries `now`, so the
/// newest-first listing is the reverse of `POSTS`.
pub(crate) fn default_seed(now: DateTime<Utc>) -> SeedData {
    let users: Vec<UserRecord> = USERS
        .iter()
        .map(|(name, handle, icon)| UserRecord::new(*name, *handle, *icon))
        .collect();

    let last = SEED_POST_COUNT as i64 - 1;
    let posts = POSTS
        .iter()
        .enumerate()
        .map(|(i, (text, image, author))| {
            let at = now - Duration::minutes(last - i as i64);
            PostRecord::new(*text, image.map(str::to_string), at, users[*author].id)
        })
        .collect();

    SeedData { users, posts }
}
