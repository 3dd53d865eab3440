//! Population — the ordered set of candidates shown in one round

use super::{LatentId, LatentVector};
use crate::error::{IdkitError, Result};
use crate::generative::ImageHandle;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A latent vector paired with its (lazily decoded) image
///
/// The image is a cache entry: it is never persisted and can always be
/// regenerated from the vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub vector: LatentVector,
    #[serde(skip)]
    pub image: Option<ImageHandle>,
}

impl Candidate {
    pub fn new(vector: LatentVector) -> Self {
        Self {
            vector,
            image: None,
        }
    }

    pub fn id(&self) -> LatentId {
        self.vector.id()
    }

    pub fn is_decoded(&self) -> bool {
        self.image.is_some()
    }
}

/// Ordered, fixed-size collection of candidates for one round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Population {
    round: u32,
    candidates: Vec<Candidate>,
}

impl Population {
    pub fn new(round: u32, vectors: Vec<LatentVector>) -> Self {
        Self {
            round,
            candidates: vectors.into_iter().map(Candidate::new).collect(),
        }
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter()
    }

    pub fn vectors(&self) -> impl Iterator<Item = &LatentVector> {
        self.candidates.iter().map(|c| &c.vector)
    }

    /// Ids in display order
    pub fn ids(&self) -> Vec<LatentId> {
        self.candidates.iter().map(Candidate::id).collect()
    }

    pub fn get(&self, id: LatentId) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.id() == id)
    }

    pub fn contains(&self, id: LatentId) -> bool {
        self.get(id).is_some()
    }

    /// Display position of a candidate
    pub fn position(&self, id: LatentId) -> Option<usize> {
        self.candidates.iter().position(|c| c.id() == id)
    }

    /// Resolve a textual id prefix to a unique candidate
    pub fn find_by_prefix(&self, prefix: &str) -> Result<LatentId> {
        let matches: Vec<LatentId> = self
            .candidates
            .iter()
            .map(Candidate::id)
            .filter(|id| id.matches_prefix(prefix))
            .collect();
        match matches.as_slice() {
            [id] => Ok(*id),
            [] => Err(IdkitError::UnknownCandidate(prefix.to_string())),
            _ => Err(IdkitError::UnknownCandidate(format!(
                "{} (ambiguous prefix, {} matches)",
                prefix,
                matches.len()
            ))),
        }
    }

    /// Check size and the distinct-id invariant
    pub fn validate(&self, expected_size: usize) -> Result<()> {
        if self.candidates.len() != expected_size {
            return Err(IdkitError::InvariantViolation(format!(
                "population has {} candidates, expected {}",
                self.candidates.len(),
                expected_size
            )));
        }
        let mut seen = HashSet::with_capacity(self.candidates.len());
        for candidate in &self.candidates {
            if !seen.insert(candidate.id()) {
                return Err(IdkitError::InvariantViolation(format!(
                    "duplicate latent id {} in population",
                    candidate.id()
                )));
            }
        }
        if let Some(first) = self.candidates.first() {
            let dim = first.vector.dimension();
            if let Some(bad) = self.candidates.iter().find(|c| c.vector.dimension() != dim) {
                return Err(IdkitError::InvariantViolation(format!(
                    "latent {} has dimension {}, expected {}",
                    bad.id(),
                    bad.vector.dimension(),
                    dim
                )));
            }
        }
        Ok(())
    }

    /// Attach decoded images, given in population order
    pub fn attach_images(&mut self, images: Vec<ImageHandle>) -> Result<()> {
        if images.len() != self.candidates.len() {
            return Err(IdkitError::InvariantViolation(format!(
                "{} images for {} candidates",
                images.len(),
                self.candidates.len()
            )));
        }
        for (candidate, image) in self.candidates.iter_mut().zip(images) {
            candidate.image = Some(image);
        }
        Ok(())
    }

    /// Drop cached images
    pub fn evict_images(&mut self) {
        for candidate in &mut self.candidates {
            candidate.image = None;
        }
    }

    pub fn is_fully_decoded(&self) -> bool {
        self.candidates.iter().all(Candidate::is_decoded)
    }

    /// Same ids in the same order, ignoring cached images
    pub fn same_vectors(&self, other: &Population) -> bool {
        self.candidates.len() == other.candidates.len()
            && self
                .vectors()
                .zip(other.vectors())
                .all(|(a, b)| a == b)
    }
}
