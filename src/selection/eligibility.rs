use std::collections::BTreeSet;

use crate::profile::UserProfile;
use crate::store::PostRecord;
use crate::types::identifiers::{PostId, UserId};

use super::ranking::Candidate;

/// The requesting user, as far as filtering and expansion need to know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    pub id: UserId,
    pub secondary_id: String,
    pub followed_creator_ids: Vec<UserId>,
}

impl Requester {
    pub fn from_profile(profile: &UserProfile) -> Self {
        Self {
            id: profile.id.clone(),
            secondary_id: profile.secondary_id.clone(),
            followed_creator_ids: profile.followed_creator_ids.clone(),
        }
    }
}

/// Why a post was kept off the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    AlreadyVoted,
    AlreadySelected,
    SeenTooMuch,
}

/// Checks shared by every resolver, applied in a fixed order.
#[derive(Debug, Clone, Copy)]
pub struct EligibilityFilter<'a> {
    pub requester: &'a Requester,
    pub already_selected: &'a BTreeSet<PostId>,
    pub max_views: u32,
}

impl<'a> EligibilityFilter<'a> {
    pub fn check(&self, post: &PostRecord) -> Result<Candidate, Rejection> {
        if post.has_voted(&self.requester.id) {
            return Err(Rejection::AlreadyVoted);
        }
        if self.already_selected.contains(&post.id) {
            return Err(Rejection::AlreadySelected);
        }
        let view_count = post.views_by(&self.requester.secondary_id);
        if view_count > self.max_views {
            return Err(Rejection::SeenTooMuch);
        }

        Ok(Candidate {
            post_id: post.id.clone(),
            view_count,
            net_votes: post.net_votes(),
            posted_at: post.posted_at,
        })
    }

    /// Candidates for every post that passes, in input order.
    pub fn retain(&self, posts: &[PostRecord]) -> Vec<Candidate> {
        posts.iter().filter_map(|post| self.check(post).ok()).collect()
    }
}
