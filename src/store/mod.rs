pub mod file;
pub mod memory;
pub mod popular;
pub mod store;

pub use file::{FileStore, SnapshotWriteError};
pub use memory::{MemoryStore, StoreQuery, StoreSnapshot};
pub use popular::{build_popular_list, needs_refresh, PopularPosts, VoteDirection, VoteRecord};
pub use store::{CreatorRecord, FeedStore, PostProjection, PostRecord, StoreError, ViewRecord};
