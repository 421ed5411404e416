use serde::{Deserialize, Serialize};

/// Tunables for feed assembly and the popular list. `v0()` holds the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedConfig {
    /// A post the requester has opened more often than this is skipped.
    pub max_views_per_post: u32,
    /// NotFound outcomes allowed per requested item before giving up.
    pub retry_multiplier: usize,
    pub default_requested_count: usize,
    /// Votes older than this do not count towards popularity.
    pub popular_window_hours: i64,
    pub popular_limit: usize,
    pub popular_refresh_hours: i64,
}

impl FeedConfig {
    pub fn v0() -> Self {
        Self {
            max_views_per_post: 5,
            retry_multiplier: 3,
            default_requested_count: 10,
            popular_window_hours: 24,
            popular_limit: 100,
            popular_refresh_hours: 1,
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Upper bound on NotFound outcomes for one request.
    pub fn retry_bound(&self, requested_count: usize) -> usize {
        self.retry_multiplier.saturating_mul(requested_count)
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self::v0()
    }
}
