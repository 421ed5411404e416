//! Personalized feed selection engine.
//!
//! `feed-core` turns a user's weighted personalization signals into a short
//! list of distinct posts: sectors are drawn in proportion to their weight,
//! candidate posts for the drawn sector are filtered and ranked, and sectors
//! with nothing left to offer are blacklisted for the rest of the request.
//! The store is passed in per request; the engine keeps no global state.

pub mod config;
pub mod profile;
pub mod selection;
pub mod store;
pub mod types;

pub use config::FeedConfig;
pub use selection::{FeedAssembler, FeedRequest};
pub use types::{FeedError, FeedResult};
