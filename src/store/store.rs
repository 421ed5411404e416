use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::profile::UserProfile;
use crate::types::identifiers::{PostId, UserId};

#[derive(Debug, Error)]
pub enum StoreError {
    /// Transport-level failure. Fatal for the whole feed request.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error("User not found: {0}")]
    UserNotFound(UserId),
    /// A record could not be decoded or is missing a required field.
    #[error("Malformed record: {0}")]
    Malformed(String),
}

/// How many times one viewer has opened a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewRecord {
    /// The viewer's secondary (public) id.
    pub viewer: String,
    pub amount: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: PostId,
    pub creator_id: UserId,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub up_voters: Vec<UserId>,
    #[serde(default)]
    pub down_voters: Vec<UserId>,
    #[serde(default)]
    pub viewed_by: Vec<ViewRecord>,
    pub posted_at: DateTime<Utc>,
}

impl PostRecord {
    pub fn new(id: PostId, creator_id: UserId, posted_at: DateTime<Utc>) -> Self {
        Self {
            id,
            creator_id,
            tags: Vec::new(),
            up_voters: Vec::new(),
            down_voters: Vec::new(),
            viewed_by: Vec::new(),
            posted_at,
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_votes(mut self, up: Vec<UserId>, down: Vec<UserId>) -> Self {
        self.up_voters = up;
        self.down_voters = down;
        self
    }

    pub fn with_view(mut self, viewer: impl Into<String>, amount: u32) -> Self {
        self.viewed_by.push(ViewRecord {
            viewer: viewer.into(),
            amount,
        });
        self
    }

    /// Upvotes minus downvotes.
    pub fn net_votes(&self) -> i64 {
        self.up_voters.len() as i64 - self.down_voters.len() as i64
    }

    pub fn has_voted(&self, user: &UserId) -> bool {
        self.up_voters.contains(user) || self.down_voters.contains(user)
    }

    /// Recorded view count for a viewer; zero when they never opened the post.
    pub fn views_by(&self, viewer: &str) -> u32 {
        self.viewed_by
            .iter()
            .find(|v| v.viewer == viewer)
            .map(|v| v.amount)
            .unwrap_or(0)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatorRecord {
    pub id: UserId,
    pub secondary_id: String,
}

/// Post fields a query must return. Stores are free to return more.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostProjection {
    pub votes: bool,
    pub views: bool,
    pub posted_at: bool,
}

impl PostProjection {
    /// Everything the eligibility filter and the rankers read.
    pub const RANKING: PostProjection = PostProjection {
        votes: true,
        views: true,
        posted_at: true,
    };
}

/// Read access to users and posts, handed to the engine per request.
pub trait FeedStore {
    fn fetch_user_profile(&self, id: &UserId) -> Result<UserProfile, StoreError>;

    /// The precomputed popular list in rank order, `None` if it was never built.
    fn fetch_popular_posts(&self) -> Result<Option<Vec<PostRecord>>, StoreError>;

    fn fetch_posts_by_tag(
        &self,
        tag: &str,
        projection: PostProjection,
    ) -> Result<Vec<PostRecord>, StoreError>;

    fn fetch_posts_by_creator_set(
        &self,
        creator_ids: &[UserId],
        projection: PostProjection,
    ) -> Result<Vec<PostRecord>, StoreError>;

    fn fetch_creator(&self, id: &UserId) -> Result<Option<CreatorRecord>, StoreError>;
}
