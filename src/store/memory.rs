use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::FeedConfig;
use crate::profile::{SignalLists, UserProfile};
use crate::store::popular::{build_popular_list, needs_refresh, PopularPosts, VoteRecord};
use crate::store::store::{CreatorRecord, FeedStore, PostProjection, PostRecord, StoreError};
use crate::types::identifiers::UserId;

/// Everything a store holds, in one serializable value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub users: Vec<UserProfile>,
    pub posts: Vec<PostRecord>,
    pub popular: Option<PopularPosts>,
}

/// One call made against a [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreQuery {
    UserProfile(UserId),
    PopularPosts,
    PostsByTag(String, PostProjection),
    PostsByCreatorSet(Vec<UserId>, PostProjection),
    Creator(UserId),
}

/// In-memory store. Posts keep insertion order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: BTreeMap<UserId, UserProfile>,
    posts: Vec<PostRecord>,
    popular: Option<PopularPosts>,

    unavailable: Option<String>,
    malformed: BTreeSet<String>,
    queries: Mutex<Vec<StoreQuery>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let mut store = Self::new();
        for user in snapshot.users {
            store.add_user(user);
        }
        store.posts = snapshot.posts;
        store.popular = snapshot.popular;
        store
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            users: self.users.values().cloned().collect(),
            posts: self.posts.clone(),
            popular: self.popular.clone(),
        }
    }

    pub fn add_user(&mut self, profile: UserProfile) {
        self.users.insert(profile.id.clone(), profile);
    }

    /// A user who only needs to exist as a post author.
    pub fn add_creator(&mut self, id: UserId) {
        let secondary = format!("pub-{}", id.as_str());
        self.add_user(UserProfile::new(id, secondary, SignalLists::default()));
    }

    pub fn add_post(&mut self, post: PostRecord) {
        self.posts.push(post);
    }

    pub fn set_popular(&mut self, popular: PopularPosts) {
        self.popular = Some(popular);
    }

    /// Rebuild the popular list from `votes` if it is missing or stale.
    /// Returns whether a rebuild happened.
    pub fn refresh_popular(
        &mut self,
        votes: &[VoteRecord],
        now: DateTime<Utc>,
        config: &FeedConfig,
    ) -> bool {
        if !needs_refresh(self.popular.as_ref(), now, config.popular_refresh_hours) {
            return false;
        }
        self.popular = Some(build_popular_list(&self.posts, votes, now, config));
        true
    }

    /// Every subsequent call fails as if the backing connection dropped.
    pub fn fail_with_unavailable(&mut self, reason: impl Into<String>) {
        self.unavailable = Some(reason.into());
    }

    /// Queries for this tag or creator id return a decode failure.
    pub fn mark_malformed(&mut self, label: impl Into<String>) {
        self.malformed.insert(label.into());
    }

    pub fn queries(&self) -> Vec<StoreQuery> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }

    fn record(&self, query: StoreQuery) -> Result<(), StoreError> {
        if let Ok(mut log) = self.queries.lock() {
            log.push(query);
        }
        match &self.unavailable {
            Some(reason) => Err(StoreError::Unavailable(reason.clone())),
            None => Ok(()),
        }
    }

    fn check_malformed(&self, label: &str) -> Result<(), StoreError> {
        if self.malformed.contains(label) {
            return Err(StoreError::Malformed(format!("record for {label} failed to decode")));
        }
        Ok(())
    }
}

impl FeedStore for MemoryStore {
    fn fetch_user_profile(&self, id: &UserId) -> Result<UserProfile, StoreError> {
        self.record(StoreQuery::UserProfile(id.clone()))?;
        self.users
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::UserNotFound(id.clone()))
    }

    fn fetch_popular_posts(&self) -> Result<Option<Vec<PostRecord>>, StoreError> {
        self.record(StoreQuery::PopularPosts)?;
        Ok(self.popular.as_ref().map(|popular| {
            popular
                .post_ids
                .iter()
                .filter_map(|id| self.posts.iter().find(|p| &p.id == id).cloned())
                .collect()
        }))
    }

    fn fetch_posts_by_tag(
        &self,
        tag: &str,
        projection: PostProjection,
    ) -> Result<Vec<PostRecord>, StoreError> {
        self.record(StoreQuery::PostsByTag(tag.to_string(), projection))?;
        self.check_malformed(tag)?;
        Ok(self.posts.iter().filter(|p| p.has_tag(tag)).cloned().collect())
    }

    fn fetch_posts_by_creator_set(
        &self,
        creator_ids: &[UserId],
        projection: PostProjection,
    ) -> Result<Vec<PostRecord>, StoreError> {
        self.record(StoreQuery::PostsByCreatorSet(creator_ids.to_vec(), projection))?;
        for id in creator_ids {
            self.check_malformed(id.as_str())?;
        }
        Ok(self
            .posts
            .iter()
            .filter(|p| creator_ids.contains(&p.creator_id))
            .cloned()
            .collect())
    }

    fn fetch_creator(&self, id: &UserId) -> Result<Option<CreatorRecord>, StoreError> {
        self.record(StoreQuery::Creator(id.clone()))?;
        self.check_malformed(id.as_str())?;
        Ok(self.users.get(id).map(|user| CreatorRecord {
            id: user.id.clone(),
            secondary_id: user.secondary_id.clone(),
        }))
    }
}
