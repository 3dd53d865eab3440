//! LatentStore — holds the active population
//!
//! Commits are all-or-nothing: a population that fails validation leaves
//! the previously committed one in place.

use super::{Lineage, LatentVector, Population};
use crate::error::{IdkitError, Result};
use crate::generative::{GenerativeAdapter, ReferenceImage};
use log::{debug, info, warn};
use nalgebra::DVector;
use rand::RngCore;

#[derive(Debug, Clone)]
pub struct LatentStore {
    population_size: usize,
    active: Option<Population>,
    /// Incremented on every successful commit
    version: u64,
}

impl LatentStore {
    pub fn new(population_size: usize) -> Self {
        Self {
            population_size,
            active: None,
            version: 0,
        }
    }

    pub fn population_size(&self) -> usize {
        self.population_size
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Sample the round-0 population from the model prior and commit it
    pub fn create_initial_population(
        &mut self,
        adapter: &dyn GenerativeAdapter,
        rng: &mut dyn RngCore,
    ) -> Result<&Population> {
        self.create_population_from_references(adapter, &[], rng)
    }

    /// Build the round-0 population from encoded reference images, topped up
    /// with prior samples when there are fewer references than slots. With
    /// more references than slots a random subset is used, in gallery order.
    pub fn create_population_from_references(
        &mut self,
        adapter: &dyn GenerativeAdapter,
        references: &[&ReferenceImage],
        rng: &mut dyn RngCore,
    ) -> Result<&Population> {
        if self.population_size < 2 {
            return Err(IdkitError::Initialization(format!(
                "population size must be at least 2, got {}",
                self.population_size
            )));
        }

        let dimension = adapter.dimension();
        let chosen: Vec<&ReferenceImage> = if references.len() > self.population_size {
            let mut picked =
                rand::seq::index::sample(rng, references.len(), self.population_size).into_vec();
            picked.sort_unstable();
            picked.into_iter().map(|i| references[i]).collect()
        } else {
            references.to_vec()
        };

        let mut vectors = Vec::with_capacity(self.population_size);
        for reference in &chosen {
            let components = adapter.encode(&reference.image).map_err(|e| {
                IdkitError::Initialization(format!(
                    "encoding reference '{}' failed: {}",
                    reference.label, e
                ))
            })?;
            check_components(&components, dimension, "encoded reference")?;
            vectors.push(LatentVector::with_fresh_id(
                rng,
                components,
                Lineage::reference(reference.label.as_str()),
            ));
        }
        while vectors.len() < self.population_size {
            let components = adapter
                .sample_prior(rng)
                .map_err(|e| IdkitError::Initialization(format!("prior sampling failed: {}", e)))?;
            check_components(&components, dimension, "prior sample")?;
            vectors.push(LatentVector::with_fresh_id(rng, components, Lineage::genesis()));
        }

        let population = Population::new(0, vectors);
        self.commit(population)?;
        if !references.is_empty() && chosen.len() < self.population_size {
            warn!(
                "Only {} references for {} slots, topped up from the prior",
                chosen.len(),
                self.population_size
            );
        }
        info!(
            "Initial population: {} candidates ({} from references), dimension {}",
            self.population_size,
            chosen.len(),
            dimension
        );
        self.current()
    }

    /// The active population
    pub fn current(&self) -> Result<&Population> {
        self.active
            .as_ref()
            .ok_or_else(|| IdkitError::InvalidState("no population has been committed".into()))
    }

    pub(crate) fn current_mut(&mut self) -> Result<&mut Population> {
        self.active
            .as_mut()
            .ok_or_else(|| IdkitError::InvalidState("no population has been committed".into()))
    }

    /// Replace the active population after validating it
    pub fn commit(&mut self, next: Population) -> Result<()> {
        next.validate(self.population_size)?;
        if let Some(current) = &self.active {
            let expected = current.vectors().next().map(LatentVector::dimension);
            let got = next.vectors().next().map(LatentVector::dimension);
            if expected != got {
                return Err(IdkitError::InvariantViolation(format!(
                    "dimension changed from {:?} to {:?}",
                    expected, got
                )));
            }
        }
        debug!(
            "Committing population for round {} (store v{})",
            next.round(),
            self.version + 1
        );
        self.active = Some(next);
        self.version += 1;
        Ok(())
    }
}

fn check_components(components: &DVector<f64>, dimension: usize, what: &str) -> Result<()> {
    if components.len() != dimension || components.iter().any(|v| !v.is_finite()) {
        return Err(IdkitError::Initialization(format!(
            "model produced an invalid {} (dimension {}, expected {})",
            what,
            components.len(),
            dimension
        )));
    }
    Ok(())
}
