//! Lineage — ancestry tracking for latent vectors
//!
//! Every latent vector knows where it came from: a prior sample, an encoded
//! reference photo, a perturbation of a parent, a blend of several selected
//! parents, or a crossing-over between two of them. Following the chain back
//! from a final portrait leads to the candidates shown in round 0.

use super::LatentId;
use serde::{Deserialize, Serialize};

/// How a latent vector was produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Origin {
    /// Drawn from the model's prior distribution
    Prior,
    /// Encoded from a labelled reference image
    Reference { label: String },
    /// Bounded random offset applied to a parent
    Perturbation { parent: LatentId },
    /// Weighted interpolation of several selected parents
    Blend { parents: Vec<LatentId> },
    /// Components swapped in from the nearest selected partner
    Crossover { parent: LatentId, partner: LatentId },
}

/// Ancestry record of a latent vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lineage {
    /// Generation number (0 = prior sample, increments with each derivation)
    pub generation: u32,
    pub origin: Origin,
}

impl Lineage {
    /// Lineage of a vector sampled from the prior
    pub fn genesis() -> Self {
        Self {
            generation: 0,
            origin: Origin::Prior,
        }
    }

    pub fn reference(label: impl Into<String>) -> Self {
        Self {
            generation: 0,
            origin: Origin::Reference {
                label: label.into(),
            },
        }
    }

    /// Child lineage for a perturbation of `parent`
    pub fn perturbation(parent: LatentId, parent_generation: u32) -> Self {
        Self {
            generation: parent_generation + 1,
            origin: Origin::Perturbation { parent },
        }
    }

    /// Lineage for a blend; the generation follows the youngest parent
    pub fn blend(parents: &[(LatentId, u32)]) -> Self {
        let generation = parents.iter().map(|(_, g)| *g).max().unwrap_or(0) + 1;
        Self {
            generation,
            origin: Origin::Blend {
                parents: parents.iter().map(|(id, _)| *id).collect(),
            },
        }
    }

    pub fn crossover(parent: (LatentId, u32), partner: (LatentId, u32)) -> Self {
        Self {
            generation: parent.1.max(partner.1) + 1,
            origin: Origin::Crossover {
                parent: parent.0,
                partner: partner.0,
            },
        }
    }

    /// Direct parent ids (empty for round-0 vectors)
    pub fn parent_ids(&self) -> Vec<LatentId> {
        match &self.origin {
            Origin::Prior | Origin::Reference { .. } => Vec::new(),
            Origin::Perturbation { parent } => vec![*parent],
            Origin::Blend { parents } => parents.clone(),
            Origin::Crossover { parent, partner } => vec![*parent, *partner],
        }
    }

    pub fn is_prior(&self) -> bool {
        matches!(self.origin, Origin::Prior)
    }
}
