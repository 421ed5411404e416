use std::collections::BTreeSet;

use rand::Rng;

use super::weights::{CumulativeWeightTable, SectorEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Exhausted {
    #[error("No drawable sector weight left")]
    NoWeight,
}

/// Weighted draws over a profile's sectors.
///
/// Keeps the table rebuilt for the last excluded set and only rebuilds when
/// that set changes.
#[derive(Debug, Clone)]
pub struct SectorSampler {
    base: CumulativeWeightTable,
    current: CumulativeWeightTable,
    excluded: BTreeSet<String>,
}

impl SectorSampler {
    pub fn new(table: CumulativeWeightTable) -> Self {
        Self {
            current: table.clone(),
            base: table,
            excluded: BTreeSet::new(),
        }
    }

    /// Total weight left after the most recent exclusion.
    pub fn remaining_total(&self) -> u64 {
        self.current.total()
    }

    pub fn draw<R: Rng + ?Sized>(
        &mut self,
        excluding: &BTreeSet<String>,
        rng: &mut R,
    ) -> Result<SectorEntry, Exhausted> {
        if excluding != &self.excluded {
            self.current = self.base.without(excluding);
            self.excluded = excluding.clone();
        }

        let total = self.current.total();
        if total == 0 {
            return Err(Exhausted::NoWeight);
        }

        let pick = rng.gen_range(1..=total);
        self.current.locate(pick).cloned().ok_or(Exhausted::NoWeight)
    }
}
