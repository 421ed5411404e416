pub mod profile;
pub mod signals;

pub use profile::UserProfile;
pub use signals::{
    SectorKind, SignalEntry, SignalKind, SignalLists, FOLLOWING_LABEL, NONE_LABEL, POPULAR_LABEL,
};
