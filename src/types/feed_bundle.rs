use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::identifiers::{PostId, ProfileVersion, UserId};

/// Why the assembly loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The requested count was reached.
    Filled,
    /// Every sector with weight was blacklisted.
    SectorsExhausted,
    /// Too many NotFound outcomes for this request.
    RetryBoundReached,
    DeadlineExceeded,
    Cancelled,
}

/// Counters describing one run of the assembly loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyStats {
    pub draws: usize,
    pub not_found: usize,
    pub termination: Termination,
}

/// The final result of a feed request.
///
/// `truncated` is set whenever fewer ids than requested were selected; a
/// truncated result is still a successful one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedResult {
    pub selected_post_ids: Vec<PostId>,
    pub blacklist: BTreeSet<String>,
    pub truncated: bool,

    pub profile_version: ProfileVersion,
    pub stats: AssemblyStats,
}

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("Profile has no sampling weight")]
    EmptyProfile,

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseStatus {
    Success,
    Failed,
}

/// Status/message/data envelope handed to the enclosing service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedResponse {
    pub status: ResponseStatus,
    pub message: String,
    pub data: Vec<PostId>,
}

impl FeedResponse {
    pub fn from_outcome(outcome: Result<FeedResult, FeedError>) -> Self {
        match outcome {
            Ok(result) => FeedResponse {
                status: ResponseStatus::Success,
                message: "Done".to_string(),
                data: result.selected_post_ids,
            },
            Err(err) => FeedResponse {
                status: ResponseStatus::Failed,
                message: err.to_string(),
                data: Vec::new(),
            },
        }
    }
}
