use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::types::identifiers::PostId;

/// A post that passed the eligibility filter, reduced to its ranking keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub post_id: PostId,
    /// How often the requester has opened the post.
    pub view_count: u32,
    /// Upvotes minus downvotes.
    pub net_votes: i64,
    pub posted_at: DateTime<Utc>,
}

pub trait Ranker {
    /// `Less` means `a` ranks ahead of `b`. Must be a total order.
    fn compare(&self, a: &Candidate, b: &Candidate) -> Ordering;

    fn top(&self, mut candidates: Vec<Candidate>) -> Option<Candidate> {
        candidates.sort_by(|a, b| self.compare(a, b));

        debug_assert!(candidates
            .windows(2)
            .all(|w| self.compare(&w[0], &w[1]) != Ordering::Greater));

        candidates.into_iter().next()
    }
}

/// Tag sectors: net votes desc, views desc, newest first, then id asc.
#[derive(Debug, Default, Clone, Copy)]
pub struct TagRanking;

impl Ranker for TagRanking {
    fn compare(&self, a: &Candidate, b: &Candidate) -> Ordering {
        b.net_votes
            .cmp(&a.net_votes)
            .then_with(|| b.view_count.cmp(&a.view_count))
            .then_with(|| b.posted_at.cmp(&a.posted_at))
            .then_with(|| a.post_id.cmp(&b.post_id))
    }
}

/// Creator sectors: least viewed first, newest first, then id asc.
#[derive(Debug, Default, Clone, Copy)]
pub struct CreatorRanking;

impl Ranker for CreatorRanking {
    fn compare(&self, a: &Candidate, b: &Candidate) -> Ordering {
        a.view_count
            .cmp(&b.view_count)
            .then_with(|| b.posted_at.cmp(&a.posted_at))
            .then_with(|| a.post_id.cmp(&b.post_id))
    }
}
