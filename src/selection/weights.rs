use std::collections::BTreeSet;

use crate::profile::{SectorKind, SignalLists};
use crate::types::feed_bundle::FeedError;

/// One drawable sector: a tag, a creator id or a sentinel label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectorEntry {
    /// Contribution to the table: signal value times list multiplier.
    pub weight: u64,
    pub label: String,
    pub kind: SectorKind,
}

/// Sector entries paired with the running sum of their weights.
///
/// Entry `i` owns the draws in `(cumulative[i-1], cumulative[i]]`, so a
/// zero-weight entry owns nothing and every draw in `[1, total]` resolves to
/// exactly one entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CumulativeWeightTable {
    entries: Vec<(u64, SectorEntry)>,
}

impl CumulativeWeightTable {
    /// Build the table from a profile's signal lists, in list-then-entry order.
    ///
    /// Lists without a sector kind (the negative-reaction signals) are left
    /// out here, not at deserialization.
    pub fn from_profile(signals: &SignalLists) -> Result<Self, FeedError> {
        let mut sectors = Vec::new();
        for (kind, entries) in signals.iter() {
            let Some(sector_kind) = kind.sector_kind() else {
                continue;
            };
            let multiplier = kind.multiplier();
            for entry in entries.iter().filter(|e| kind.admits(e)) {
                sectors.push(SectorEntry {
                    weight: entry.value.saturating_mul(multiplier),
                    label: entry.label.clone(),
                    kind: sector_kind,
                });
            }
        }

        let table = Self::from_entries(sectors);
        if table.total() == 0 {
            return Err(FeedError::EmptyProfile);
        }
        Ok(table)
    }

    pub fn from_entries(sectors: impl IntoIterator<Item = SectorEntry>) -> Self {
        let mut running: u64 = 0;
        let entries = sectors
            .into_iter()
            .map(|sector| {
                running = running.saturating_add(sector.weight);
                (running, sector)
            })
            .collect();

        Self { entries }
    }

    /// A fresh table over the entries whose label is not in `excluding`.
    pub fn without(&self, excluding: &BTreeSet<String>) -> Self {
        Self::from_entries(
            self.entries
                .iter()
                .filter(|(_, sector)| !excluding.contains(&sector.label))
                .map(|(_, sector)| sector.clone()),
        )
    }

    pub fn total(&self) -> u64 {
        self.entries.last().map(|(cumulative, _)| *cumulative).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, &SectorEntry)> {
        self.entries.iter().map(|(cumulative, sector)| (*cumulative, sector))
    }

    /// The entry owning `draw`, or `None` outside `[1, total]`.
    pub fn locate(&self, draw: u64) -> Option<&SectorEntry> {
        if draw == 0 || draw > self.total() {
            return None;
        }
        let index = self.entries.partition_point(|(cumulative, _)| *cumulative < draw);
        self.entries.get(index).map(|(_, sector)| sector)
    }
}
