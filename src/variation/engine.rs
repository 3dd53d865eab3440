//! VariationEngine — computes the next population from the witness's picks
//!
//! One pick: the pick survives unchanged (elitism) and the remaining slots
//! are filled with bounded perturbations of it. Several picks: the engine
//! first interpolates them into blend vectors (the equal-weight centroid,
//! then blends leaning towards each pick in turn) and treats each blend as an
//! elite of its own group, sharing the N slots evenly between groups.
//!
//! Each elite gets up to `k_per_elite` direct perturbations; further slots
//! are filled by perturbing already produced offspring again. With pruning
//! enabled one extra offspring is produced and the farthest outlier dropped.

use super::crossover::{blend, cross, farthest_outlier, nearest};
use super::RadiusSchedule;
use crate::config::VariationConfig;
use crate::error::{IdkitError, Result};
use crate::latent::{LatentId, LatentVector, Population, SelectionRecord};
use log::debug;
use rand::Rng;
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct VariationEngine {
    config: VariationConfig,
    population_size: usize,
}

/// Hands out ids that collide with nothing produced or shown this round
struct IdAllocator {
    used: HashSet<LatentId>,
}

impl IdAllocator {
    fn new(population: &Population) -> Self {
        Self {
            used: population.ids().into_iter().collect(),
        }
    }

    fn next<R: Rng + ?Sized>(&mut self, rng: &mut R) -> LatentId {
        loop {
            let id = LatentId::generate(rng);
            if self.used.insert(id) {
                return id;
            }
        }
    }
}

impl VariationEngine {
    pub fn new(config: VariationConfig, population_size: usize) -> Self {
        Self {
            config,
            population_size,
        }
    }

    pub fn config(&self) -> &VariationConfig {
        &self.config
    }

    pub fn schedule(&self) -> RadiusSchedule {
        self.config.schedule()
    }

    /// Perturbation radius used when advancing from `round`
    pub fn radius(&self, round: u32) -> f64 {
        self.schedule().radius(round)
    }

    /// Compute the next population. Fully determined by the inputs and the
    /// state of `rng`.
    pub fn advance<R: Rng + ?Sized>(
        &self,
        population: &Population,
        selection: &SelectionRecord,
        round_index: u32,
        rng: &mut R,
    ) -> Result<Population> {
        if selection.is_empty() {
            return Err(IdkitError::EmptySelection);
        }
        if selection.round != population.round() {
            return Err(IdkitError::InvariantViolation(format!(
                "selection for round {} applied to population of round {}",
                selection.round,
                population.round()
            )));
        }
        let selected = selection
            .selected
            .iter()
            .map(|id| {
                population
                    .get(*id)
                    .map(|c| &c.vector)
                    .ok_or_else(|| IdkitError::UnknownCandidate(id.to_string()))
            })
            .collect::<Result<Vec<&LatentVector>>>()?;

        let radius = self.radius(round_index);
        let mut ids = IdAllocator::new(population);

        let elites = if selected.len() == 1 {
            vec![selected[0].clone()]
        } else {
            self.blends(&selected, &mut ids, rng)
        };
        let shares = distribute(self.population_size, elites.len());
        let surplus = usize::from(self.config.prune_outliers);

        let mut next: Vec<LatentVector> = Vec::with_capacity(self.population_size + surplus);
        let mut offspring_slots: Vec<usize> = Vec::new();
        for (group, (elite, share)) in elites.iter().zip(shares).enumerate() {
            let extra = if group == 0 { surplus } else { 0 };
            next.push(elite.clone());
            for child in self.offspring(elite, &selected, share - 1, extra, radius, &mut ids, rng) {
                offspring_slots.push(next.len());
                next.push(child);
            }
        }

        if surplus > 0 {
            if let Some(dropped) = prune_outlier(&mut next, &offspring_slots) {
                debug!("Pruned outlier {}", dropped.id().short());
            }
        }

        debug!(
            "Advanced round {}: {} selected, {} elites, radius {:.4}",
            round_index,
            selected.len(),
            elites.len(),
            radius
        );

        let result = Population::new(population.round() + 1, next);
        result.validate(self.population_size)?;
        Ok(result)
    }

    /// Equal-weight centroid first, then blends leaning towards each pick,
    /// as many as the population has room for
    fn blends<R: Rng + ?Sized>(
        &self,
        selected: &[&LatentVector],
        ids: &mut IdAllocator,
        rng: &mut R,
    ) -> Vec<LatentVector> {
        let m = selected.len();
        let room = (self.population_size / (self.config.k_per_elite + 1)).max(1);
        let count = (m + 1).min(room);

        let mut out = Vec::with_capacity(count);
        out.push(blend(selected, &vec![1.0; m], ids.next(rng)));
        for lean in 0..count - 1 {
            let weights: Vec<f64> = (0..m).map(|j| if j == lean { 2.0 } else { 1.0 }).collect();
            out.push(blend(selected, &weights, ids.next(rng)));
        }
        out
    }

    /// `count` offspring plus `surplus` extra direct perturbations destined
    /// for outlier pruning
    #[allow(clippy::too_many_arguments)]
    fn offspring<R: Rng + ?Sized>(
        &self,
        elite: &LatentVector,
        partners: &[&LatentVector],
        count: usize,
        surplus: usize,
        radius: f64,
        ids: &mut IdAllocator,
        rng: &mut R,
    ) -> Vec<LatentVector> {
        let mutation = self.config.mutation;
        let crossing = self.config.crossover_rate > 0.0 && partners.len() > 1;
        let count = count + surplus;
        let mut children: Vec<LatentVector> = Vec::with_capacity(count);

        let direct = count.min(self.config.k_per_elite + surplus);
        for i in 0..direct {
            let id = ids.next(rng);
            let partner = if crossing && i % 2 == 1 {
                nearest(elite, partners)
            } else {
                None
            };
            let child = match partner {
                Some(partner) => {
                    let crossed = cross(elite, partner, self.config.crossover_rate, id, rng);
                    let lineage = crossed.lineage().clone();
                    mutation.apply(&crossed, id, radius, rng).with_lineage(lineage)
                }
                None => mutation.apply(elite, id, radius, rng),
            };
            children.push(child);
        }

        let mut cursor = 0;
        while children.len() < count {
            let id = ids.next(rng);
            let child = mutation.apply(&children[cursor], id, radius, rng);
            children.push(child);
            cursor += 1;
        }
        children
    }
}

/// Remove the offspring farthest from the other offspring. Only positions
/// listed in `offspring_slots` are candidates, so elites always survive.
fn prune_outlier(next: &mut Vec<LatentVector>, offspring_slots: &[usize]) -> Option<LatentVector> {
    let last = *offspring_slots.last()?;
    let offspring: Vec<&LatentVector> = offspring_slots.iter().map(|&i| &next[i]).collect();
    let outlier = farthest_outlier(&offspring)
        .map(|i| offspring_slots[i])
        .unwrap_or(last);
    Some(next.remove(outlier))
}

/// Split `total` slots evenly across `groups`, remainder to the first groups
fn distribute(total: usize, groups: usize) -> Vec<usize> {
    let base = total / groups;
    let remainder = total % groups;
    (0..groups).map(|g| base + usize::from(g < remainder)).collect()
}
