pub mod feed_bundle;
pub mod identifiers;

pub use feed_bundle::{
    AssemblyStats, FeedError, FeedResponse, FeedResult, ResponseStatus, Termination,
};
pub use identifiers::{PostId, ProfileVersion, UserId};
