use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::config::FeedConfig;
use crate::types::identifiers::{PostId, UserId};

/// Caller-owned cancellation signal, cheap to clone across threads.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One feed request.
#[derive(Debug, Clone)]
pub struct FeedRequest {
    pub requester_id: UserId,
    pub requested_count: usize,
    /// Ids treated as already on the feed, e.g. shown earlier in the session.
    pub already_selected: Vec<PostId>,
    pub deadline: Option<Instant>,
    pub cancellation: Option<CancellationFlag>,
}

impl FeedRequest {
    pub fn new(requester_id: UserId, requested_count: usize) -> Self {
        Self {
            requester_id,
            requested_count,
            already_selected: Vec::new(),
            deadline: None,
            cancellation: None,
        }
    }

    /// A request for the configured default number of posts.
    pub fn with_default_count(requester_id: UserId, config: &FeedConfig) -> Self {
        Self::new(requester_id, config.default_requested_count)
    }

    pub fn with_already_selected(mut self, ids: impl IntoIterator<Item = PostId>) -> Self {
        self.already_selected = ids.into_iter().collect();
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_cancellation(mut self, flag: CancellationFlag) -> Self {
        self.cancellation = Some(flag);
        self
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation.as_ref().is_some_and(CancellationFlag::is_cancelled)
    }

    pub(crate) fn is_past_deadline(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// Parse the comma-separated "already on feed" list clients send.
///
/// Whitespace and surrounding double quotes are stripped; empty items dropped.
pub fn parse_already_selected(raw: &str) -> Vec<PostId> {
    raw.split(',')
        .map(|item| item.trim().trim_matches('"').trim())
        .filter(|item| !item.is_empty())
        .map(PostId::new)
        .collect()
}
