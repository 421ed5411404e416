use std::collections::BTreeSet;

use rand::Rng;
use tracing::{debug, warn};

use crate::config::FeedConfig;
use crate::profile::{FOLLOWING_LABEL, POPULAR_LABEL};
use crate::store::{FeedStore, PostProjection, PostRecord, StoreError};
use crate::types::feed_bundle::FeedError;
use crate::types::identifiers::{PostId, UserId};

use super::eligibility::{EligibilityFilter, Requester};
use super::ranking::{CreatorRanking, Ranker, TagRanking};
use super::weights::SectorEntry;

/// Outcome of resolving one drawn sector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(PostId),
    /// Posts were fetched but none is eligible. The sector gets blacklisted.
    Exhausted,
    /// Nothing could be fetched for the label.
    NotFound,
}

/// Per-draw view of the request handed to a resolver.
#[derive(Debug, Clone, Copy)]
pub struct ResolveContext<'a> {
    pub requester: &'a Requester,
    /// Pre-selected ids plus everything selected so far in this request.
    pub already_selected: &'a BTreeSet<PostId>,
    pub config: &'a FeedConfig,
}

impl<'a> ResolveContext<'a> {
    pub fn filter(&self) -> EligibilityFilter<'a> {
        EligibilityFilter {
            requester: self.requester,
            already_selected: self.already_selected,
            max_views: self.config.max_views_per_post,
        }
    }
}

pub trait CandidateResolver {
    fn try_resolve<S, R>(
        &self,
        store: &S,
        entry: &SectorEntry,
        ctx: &ResolveContext<'_>,
        rng: &mut R,
    ) -> Result<Resolution, StoreError>
    where
        S: FeedStore + ?Sized,
        R: Rng + ?Sized;

    /// Resolve with store failures sorted out: only an unavailable store
    /// aborts the request, a bad record just costs this draw.
    fn resolve<S, R>(
        &self,
        store: &S,
        entry: &SectorEntry,
        ctx: &ResolveContext<'_>,
        rng: &mut R,
    ) -> Result<Resolution, FeedError>
    where
        S: FeedStore + ?Sized,
        R: Rng + ?Sized,
    {
        match self.try_resolve(store, entry, ctx, rng) {
            Ok(resolution) => Ok(resolution),
            Err(StoreError::Unavailable(reason)) => Err(FeedError::StoreUnavailable(reason)),
            Err(err) => {
                warn!(label = %entry.label, error = %err, "sector resolution failed, treating as not found");
                Ok(Resolution::NotFound)
            }
        }
    }
}

/// Filter then rank a fetched batch.
fn best_of<K: Ranker>(posts: &[PostRecord], ctx: &ResolveContext<'_>, ranker: &K) -> Resolution {
    if posts.is_empty() {
        return Resolution::NotFound;
    }
    let survivors = ctx.filter().retain(posts);
    debug!(fetched = posts.len(), eligible = survivors.len(), "filtered candidates");

    match ranker.top(survivors) {
        Some(best) => Resolution::Found(best.post_id),
        None => Resolution::Exhausted,
    }
}

/// Resolves tag sectors, including the popular-list sentinel.
#[derive(Debug, Default, Clone, Copy)]
pub struct TagResolver;

impl TagResolver {
    /// Random picks from the popular list until one is eligible.
    fn from_popular<S, R>(
        &self,
        store: &S,
        ctx: &ResolveContext<'_>,
        rng: &mut R,
    ) -> Result<Resolution, StoreError>
    where
        S: FeedStore + ?Sized,
        R: Rng + ?Sized,
    {
        let mut remaining = match store.fetch_popular_posts()? {
            Some(posts) if !posts.is_empty() => posts,
            _ => return Ok(Resolution::NotFound),
        };

        let filter = ctx.filter();
        while !remaining.is_empty() {
            let index = rng.gen_range(0..remaining.len());
            let post = remaining.swap_remove(index);
            match filter.check(&post) {
                Ok(candidate) => return Ok(Resolution::Found(candidate.post_id)),
                Err(rejection) => debug!(post = %post.id, ?rejection, "popular post rejected"),
            }
        }

        Ok(Resolution::Exhausted)
    }
}

impl CandidateResolver for TagResolver {
    fn try_resolve<S, R>(
        &self,
        store: &S,
        entry: &SectorEntry,
        ctx: &ResolveContext<'_>,
        rng: &mut R,
    ) -> Result<Resolution, StoreError>
    where
        S: FeedStore + ?Sized,
        R: Rng + ?Sized,
    {
        if entry.label == POPULAR_LABEL {
            return self.from_popular(store, ctx, rng);
        }

        let posts = store.fetch_posts_by_tag(&entry.label, PostProjection::RANKING)?;
        Ok(best_of(&posts, ctx, &TagRanking))
    }
}

/// Resolves creator sectors, including the followed-creators sentinel.
#[derive(Debug, Default, Clone, Copy)]
pub struct CreatorResolver;

impl CandidateResolver for CreatorResolver {
    fn try_resolve<S, R>(
        &self,
        store: &S,
        entry: &SectorEntry,
        ctx: &ResolveContext<'_>,
        _rng: &mut R,
    ) -> Result<Resolution, StoreError>
    where
        S: FeedStore + ?Sized,
        R: Rng + ?Sized,
    {
        let creators = if entry.label == FOLLOWING_LABEL {
            if ctx.requester.followed_creator_ids.is_empty() {
                return Ok(Resolution::Exhausted);
            }
            ctx.requester.followed_creator_ids.clone()
        } else {
            match store.fetch_creator(&UserId::new(entry.label.as_str()))? {
                Some(creator) => vec![creator.id],
                None => {
                    debug!(creator = %entry.label, "unknown creator");
                    return Ok(Resolution::NotFound);
                }
            }
        };

        let posts = store.fetch_posts_by_creator_set(&creators, PostProjection::RANKING)?;
        Ok(best_of(&posts, ctx, &CreatorRanking))
    }
}
