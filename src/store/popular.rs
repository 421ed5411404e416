use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::FeedConfig;
use crate::store::store::PostRecord;
use crate::types::identifiers::{PostId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteDirection {
    Up,
    Down,
}

/// A single timestamped vote, as kept in the vote collections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub post_id: PostId,
    pub voter: UserId,
    pub direction: VoteDirection,
    pub interaction_date: DateTime<Utc>,
}

/// The globally popular list backing the `~popular` sector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopularPosts {
    pub last_updated: DateTime<Utc>,
    /// Best first.
    pub post_ids: Vec<PostId>,
}

impl PopularPosts {
    /// Whole hours since the last rebuild, compared against the refresh interval.
    pub fn is_stale(&self, now: DateTime<Utc>, refresh_hours: i64) -> bool {
        (now - self.last_updated).num_hours() >= refresh_hours
    }
}

/// True when there is no list yet or the existing one is stale.
pub fn needs_refresh(current: Option<&PopularPosts>, now: DateTime<Utc>, refresh_hours: i64) -> bool {
    match current {
        None => true,
        Some(popular) => popular.is_stale(now, refresh_hours),
    }
}

/// Rank posts by net votes cast inside the popularity window.
///
/// Order is (windowed score desc, post id asc); only the first
/// `popular_limit` ids are kept. A window too large to represent counts
/// every vote.
pub fn build_popular_list(
    posts: &[PostRecord],
    votes: &[VoteRecord],
    now: DateTime<Utc>,
    config: &FeedConfig,
) -> PopularPosts {
    let window_start = Duration::try_hours(config.popular_window_hours)
        .and_then(|window| now.checked_sub_signed(window));

    let mut scores: BTreeMap<&PostId, i64> = posts.iter().map(|p| (&p.id, 0)).collect();
    for vote in votes {
        if window_start.is_some_and(|start| vote.interaction_date < start) {
            continue;
        }
        // Votes on posts that no longer exist are ignored
        if let Some(score) = scores.get_mut(&vote.post_id) {
            match vote.direction {
                VoteDirection::Up => *score += 1,
                VoteDirection::Down => *score -= 1,
            }
        }
    }

    let mut ranked: Vec<(&PostId, i64)> = scores.into_iter().collect();
    ranked.sort_by(|a, b| match b.1.cmp(&a.1) {
        Ordering::Equal => a.0.cmp(b.0),
        other => other,
    });

    PopularPosts {
        last_updated: now,
        post_ids: ranked
            .into_iter()
            .take(config.popular_limit)
            .map(|(id, _)| id.clone())
            .collect(),
    }
}
