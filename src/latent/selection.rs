//! SelectionRecord — what the witness picked in one round

use super::{LatentId, Population};
use crate::error::{IdkitError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionRecord {
    pub round: u32,
    /// Picked candidates, in the order they were picked
    pub selected: Vec<LatentId>,
    /// Everything else shown in the round, in display order
    pub rejected: Vec<LatentId>,
    /// The witness declared the (single) pick a final match
    pub satisfied: bool,
}

impl SelectionRecord {
    /// Build a record against `population`. Duplicate ids collapse to their
    /// first occurrence; ids outside the population are rejected.
    pub fn new(population: &Population, selected_ids: &[LatentId], satisfied: bool) -> Result<Self> {
        let mut selected: Vec<LatentId> = Vec::with_capacity(selected_ids.len());
        for id in selected_ids {
            if !population.contains(*id) {
                return Err(IdkitError::UnknownCandidate(id.to_string()));
            }
            if !selected.contains(id) {
                selected.push(*id);
            }
        }
        let rejected = population
            .ids()
            .into_iter()
            .filter(|id| !selected.contains(id))
            .collect();
        Ok(Self {
            round: population.round(),
            selected,
            rejected,
            satisfied,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_selected(&self, id: LatentId) -> bool {
        self.selected.contains(&id)
    }
}
