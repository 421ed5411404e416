use serde::{Deserialize, Serialize};

/// Label of the sector backed by the precomputed popular-posts list.
pub const POPULAR_LABEL: &str = "~popular";
/// Label of the sector that expands to every creator the requester follows.
pub const FOLLOWING_LABEL: &str = "~following";
/// Placeholder entry in the frequently-positive-reactions list. Never sampled.
pub const NONE_LABEL: &str = "~none";

/// How a sector label is turned into candidate posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectorKind {
    /// Label is a post tag (or the popular sentinel).
    Tag,
    /// Label is a creator's user id (or the following sentinel).
    Creator,
}

/// The personalization signal lists stored on a user profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Recommendation,
    UpcomingRecommendation,
    FrequentlyPositiveReactions,
    UpcomingFrequentlyPositiveReactions,
    FrequentlyNegativeReactions,
    PostNegativeReactions,
}

impl SignalKind {
    /// Table build order.
    pub const ALL: [SignalKind; 6] = [
        SignalKind::Recommendation,
        SignalKind::UpcomingRecommendation,
        SignalKind::FrequentlyPositiveReactions,
        SignalKind::UpcomingFrequentlyPositiveReactions,
        SignalKind::FrequentlyNegativeReactions,
        SignalKind::PostNegativeReactions,
    ];

    /// Importance multiplier applied to every entry of the list.
    pub fn multiplier(self) -> u64 {
        match self {
            SignalKind::Recommendation => 3,
            SignalKind::UpcomingRecommendation => 2,
            SignalKind::FrequentlyPositiveReactions => 3,
            SignalKind::UpcomingFrequentlyPositiveReactions => 2,
            SignalKind::FrequentlyNegativeReactions => 0,
            SignalKind::PostNegativeReactions => 0,
        }
    }

    /// Sector kind the list feeds, or `None` for lists that are recorded on
    /// the profile but not wired into sampling yet.
    pub fn sector_kind(self) -> Option<SectorKind> {
        match self {
            SignalKind::Recommendation | SignalKind::UpcomingRecommendation => {
                Some(SectorKind::Tag)
            }
            SignalKind::FrequentlyPositiveReactions
            | SignalKind::UpcomingFrequentlyPositiveReactions => Some(SectorKind::Creator),
            SignalKind::FrequentlyNegativeReactions | SignalKind::PostNegativeReactions => None,
        }
    }

    /// Whether an entry of this list takes part in sampling at all.
    pub fn admits(self, entry: &SignalEntry) -> bool {
        !(self == SignalKind::FrequentlyPositiveReactions && entry.label == NONE_LABEL)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalEntry {
    pub value: u64,
    pub label: String,
}

impl SignalEntry {
    pub fn new(label: impl Into<String>, value: u64) -> Self {
        Self {
            value,
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SignalLists {
    #[serde(default)]
    pub recommendation: Vec<SignalEntry>,
    #[serde(default)]
    pub upcoming_recommendation: Vec<SignalEntry>,
    #[serde(default)]
    pub frequently_positive_reactions: Vec<SignalEntry>,
    #[serde(default)]
    pub upcoming_frequently_positive_reactions: Vec<SignalEntry>,
    #[serde(default)]
    pub frequently_negative_reactions: Vec<SignalEntry>,
    #[serde(default)]
    pub post_negative_reactions: Vec<SignalEntry>,
}

impl SignalLists {
    /// Lists a freshly created account starts with.
    pub fn new_user_defaults() -> Self {
        Self {
            recommendation: vec![SignalEntry::new(POPULAR_LABEL, 1000)],
            frequently_positive_reactions: vec![
                SignalEntry::new(FOLLOWING_LABEL, 400),
                SignalEntry::new(NONE_LABEL, 600),
            ],
            ..Self::default()
        }
    }

    pub fn get(&self, kind: SignalKind) -> &[SignalEntry] {
        match kind {
            SignalKind::Recommendation => &self.recommendation,
            SignalKind::UpcomingRecommendation => &self.upcoming_recommendation,
            SignalKind::FrequentlyPositiveReactions => &self.frequently_positive_reactions,
            SignalKind::UpcomingFrequentlyPositiveReactions => {
                &self.upcoming_frequently_positive_reactions
            }
            SignalKind::FrequentlyNegativeReactions => &self.frequently_negative_reactions,
            SignalKind::PostNegativeReactions => &self.post_negative_reactions,
        }
    }

    pub fn get_mut(&mut self, kind: SignalKind) -> &mut Vec<SignalEntry> {
        match kind {
            SignalKind::Recommendation => &mut self.recommendation,
            SignalKind::UpcomingRecommendation => &mut self.upcoming_recommendation,
            SignalKind::FrequentlyPositiveReactions => &mut self.frequently_positive_reactions,
            SignalKind::UpcomingFrequentlyPositiveReactions => {
                &mut self.upcoming_frequently_positive_reactions
            }
            SignalKind::FrequentlyNegativeReactions => &mut self.frequently_negative_reactions,
            SignalKind::PostNegativeReactions => &mut self.post_negative_reactions,
        }
    }

    /// Every list paired with its kind, in table build order.
    pub fn iter(&self) -> impl Iterator<Item = (SignalKind, &[SignalEntry])> {
        SignalKind::ALL.into_iter().map(move |kind| (kind, self.get(kind)))
    }
}
