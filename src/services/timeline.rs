//! Merges legacy analysis messages and forum posts into one chronological feed.

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use crate::db::PostRow;
use crate::entities::messages;

/// Role posts take in the merged feed.
pub const POST_ROLE: &str = "user";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineEntry {
    pub role: String,
    pub content: String,
    pub created_at: String,
}

impl From<messages::Model> for TimelineEntry {
    fn from(message: messages::Model) -> Self {
        Self {
            role: message.role,
            content: message.content,
            created_at: message.created_at,
        }
    }
}

impl From<PostRow> for TimelineEntry {
    fn from(post: PostRow) -> Self {
        Self {
            role: POST_ROLE.to_string(),
            content: post.content,
            created_at: post.created_at,
        }
    }
}

/// Concatenates `messages` then `posts` and stable-sorts by parsed timestamp.
///
/// Timestamps are compared as instants, so `Z` and `+00:00` spellings (or any
/// other offset) order correctly. Entries whose timestamp does not parse sort
/// first, in their original order.
#[must_use]
pub fn merge_timeline(
    messages: impl IntoIterator<Item = TimelineEntry>,
    posts: impl IntoIterator<Item = TimelineEntry>,
) -> Vec<TimelineEntry> {
    let mut keyed: Vec<(Option<DateTime<FixedOffset>>, TimelineEntry)> = messages
        .into_iter()
        .chain(posts)
        .map(|entry| (DateTime::parse_from_rfc3339(entry.created_at.trim()).ok(), entry))
        .collect();

    // Vec::sort_by_key is stable; None < Some(_).
    keyed.sort_by_key(|(at, _)| *at);

    keyed.into_iter().map(|(_, entry)| entry).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(role: &str, content: &str, at: &str) -> TimelineEntry {
        TimelineEntry {
            role: role.to_string(),
            content: content.to_string(),
            created_at: at.to_string(),
        }
    }

    fn contents(entries: &[TimelineEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.content.as_str()).collect()
    }

    #[test]
    fn interleaves_by_time() {
        let messages = vec![entry("user", "m1", "2024-01-01T00:00:02Z")];
        let posts = vec![
            entry("user", "p1", "2024-01-01T00:00:01Z"),
            entry("user", "p2", "2024-01-01T00:00:03Z"),
        ];

        let merged = merge_timeline(messages, posts);
        assert_eq!(contents(&merged), ["p1", "m1", "p2"]);
    }

    #[test]
    fn mixed_offset_spellings_compare_as_instants() {
        let messages = vec![entry("assistant", "later", "2024-01-01T00:00:01.500000+00:00")];
        let posts = vec![entry("user", "earlier", "2024-01-01T00:00:01.250000Z")];

        let merged = merge_timeline(messages, posts);
        assert_eq!(contents(&merged), ["earlier", "later"]);
    }

    #[test]
    fn non_utc_offsets_are_normalized() {
        let messages = vec![entry("user", "tokyo", "2024-01-01T09:00:00+09:00")];
        let posts = vec![entry("user", "utc", "2024-01-01T00:00:01Z")];

        let merged = merge_timeline(messages, posts);
        assert_eq!(contents(&merged), ["tokyo", "utc"]);
    }

    #[test]
    fn ties_keep_messages_before_posts() {
        let at = "2024-01-01T00:00:00Z";
        let merged = merge_timeline(
            vec![entry("user", "m", at)],
            vec![entry("user", "p", at)],
        );
        assert_eq!(contents(&merged), ["m", "p"]);
    }

    #[test]
    fn unparseable_timestamps_sort_first_in_source_order() {
        let merged = merge_timeline(
            vec![entry("user", "ok", "2024-01-01T00:00:00Z"), entry("user", "bad1", "yesterday")],
            vec![entry("user", "bad2", "")],
        );
        assert_eq!(contents(&merged), ["bad1", "bad2", "ok"]);
    }

    #[test]
    fn output_is_monotonic() {
        let merged = merge_timeline(
            vec![
                entry("user", "a", "2024-03-01T00:00:00Z"),
                entry("user", "b", "2024-01-01T00:00:00Z"),
            ],
            vec![entry("user", "c", "2024-02-01T00:00:00+00:00")],
        );

        let instants: Vec<_> = merged
            .iter()
            .map(|e| DateTime::parse_from_rfc3339(&e.created_at).unwrap())
            .collect();
        assert!(instants.windows(2).all(|w| w[0] <= w[1]));
    }
}
