//! HistoryLog — ordered ledger of rounds for replay, audit, and undo
//!
//! One entry per round: the population shown and, once the witness has
//! answered, their selection. The population an entry led to is the next
//! entry's population. Entries only ever close in round order; undo cuts
//! the tail off and reopens the last remaining round.

use crate::error::{IdkitError, Result};
use crate::latent::{LatentId, Population, SelectionRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub round: u32,
    pub population: Population,
    /// `None` while the round is still awaiting the witness
    pub selection: Option<SelectionRecord>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryLog {
    entries: Vec<HistoryEntry>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the entry for the next round. Cached images are not kept.
    pub fn append(
        &mut self,
        mut population: Population,
        selection: Option<SelectionRecord>,
    ) -> Result<()> {
        let expected = self.entries.len() as u32;
        if population.round() != expected {
            return Err(IdkitError::OrderViolation {
                expected,
                got: population.round(),
            });
        }
        if let Some(open) = self.entries.last().filter(|e| e.selection.is_none()) {
            return Err(IdkitError::OrderViolation {
                expected: open.round,
                got: population.round(),
            });
        }
        if let Some(record) = &selection {
            if record.round != population.round() {
                return Err(IdkitError::OrderViolation {
                    expected: population.round(),
                    got: record.round,
                });
            }
        }
        population.evict_images();
        self.entries.push(HistoryEntry {
            round: population.round(),
            population,
            selection,
            recorded_at: Utc::now(),
        });
        Ok(())
    }

    /// Close the open round with the witness's selection
    pub fn record_selection(&mut self, selection: SelectionRecord) -> Result<()> {
        let expected = self.entries.len().saturating_sub(1) as u32;
        match self.entries.last_mut() {
            Some(entry) if entry.selection.is_none() && entry.round == selection.round => {
                entry.selection = Some(selection);
                entry.recorded_at = Utc::now();
                Ok(())
            }
            _ => Err(IdkitError::OrderViolation {
                expected,
                got: selection.round,
            }),
        }
    }

    /// Take the selection back out of the last entry, if it is `round`
    pub fn reopen(&mut self, round: u32) -> Result<SelectionRecord> {
        let expected = self.entries.len().saturating_sub(1) as u32;
        match self.entries.last_mut() {
            Some(entry) if entry.round == round => entry.selection.take().ok_or_else(|| {
                IdkitError::InvalidState(format!("round {} has no selection to reopen", round))
            }),
            _ => Err(IdkitError::OrderViolation {
                expected,
                got: round,
            }),
        }
    }

    /// Remove every entry after `round`; returns how many were dropped
    pub fn truncate_after(&mut self, round: u32) -> usize {
        let keep = self
            .entries
            .iter()
            .position(|e| e.round > round)
            .unwrap_or(self.entries.len());
        let removed = self.entries.len() - keep;
        self.entries.truncate(keep);
        removed
    }

    /// Entries in round order; cheap to call again for another pass
    pub fn entries(&self) -> std::slice::Iter<'_, HistoryEntry> {
        self.entries.iter()
    }

    pub fn get(&self, round: u32) -> Option<&HistoryEntry> {
        self.entries.get(round as usize)
    }

    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The population a round's selection produced
    pub fn resulting_population(&self, round: u32) -> Option<&Population> {
        self.get(round + 1).map(|e| &e.population)
    }

    /// Number of rounds in which `id` was picked
    pub fn times_selected(&self, id: LatentId) -> usize {
        self.entries
            .iter()
            .filter_map(|e| e.selection.as_ref())
            .filter(|s| s.is_selected(id))
            .count()
    }

    /// The candidate that best reflects the witness's memory so far: among
    /// the picks of the most recent answered round, the one picked in the most
    /// rounds overall; ties go to the earlier pick of that round.
    pub fn best_match(&self) -> Option<LatentId> {
        let latest = self
            .entries
            .iter()
            .rev()
            .find_map(|e| e.selection.as_ref().filter(|s| !s.is_empty()))?;

        let mut best: Option<(LatentId, usize)> = None;
        for id in &latest.selected {
            let count = self.times_selected(*id);
            if best.map_or(true, |(_, c)| count > c) {
                best = Some((*id, count));
            }
        }
        best.map(|(id, _)| id)
    }
}
