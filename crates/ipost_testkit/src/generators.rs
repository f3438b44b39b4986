//! Property-based test generators using proptest.

use proptest::prelude::*;

/// Strategy for post bodies, including empty and non-ASCII text.
pub fn post_text_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        "[a-zA-Z0-9 #!?.,']{1,80}",
        "\\PC{1,40}",
    ]
}

/// Strategy for optional image references.
pub fn image_strategy() -> impl Strategy<Value = Option<String>> {
    prop::option::of(prop_oneof![
        Just("figure.hiking".to_string()),
        Just("laptopcomputer".to_string()),
        Just("book.fill".to_string()),
        "[a-z]{1,12}(\\.[a-z]{1,8})?",
    ])
}

/// Strategy for a batch of posts: (text, image, author index, seconds
/// after a base instant). Author indices are below `authors`.
pub fn post_batch_strategy(
    authors: usize,
    max_len: usize,
) -> impl Strategy<Value = Vec<(String, Option<String>, usize, i64)>> {
    prop::collection::vec(
        (
            post_text_strategy(),
            image_strategy(),
            0..authors.max(1),
            0i64..3_600,
        ),
        0..=max_len,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn batch_respects_bounds(batch in post_batch_strategy(3, 10)) {
            prop_assert!(batch.len() <= 10);
            for (_, _, author, offset) in &batch {
                prop_assert!(*author < 3);
                prop_assert!((0..3_600).contains(offset));
            }
        }
    }
}
