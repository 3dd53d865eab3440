//! LatentVector — one candidate face in the model's input space
//!
//! Vectors are immutable: a "changed" vector is always a new `LatentVector`
//! with a fresh id. Ids are drawn from the caller's random source so that a
//! seeded session produces byte-identical populations.

use super::Lineage;
use nalgebra::DVector;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use uuid::Uuid;

/// Unique identifier of a latent vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LatentId(Uuid);

impl LatentId {
    /// Draw a fresh id from the given random source
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let bytes: [u8; 16] = rng.gen();
        Self(uuid::Builder::from_random_bytes(bytes).into_uuid())
    }

    /// First eight hex characters, used as a display id
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }

    /// Whether the id's textual form starts with `prefix` (dashes ignored)
    pub fn matches_prefix(&self, prefix: &str) -> bool {
        let wanted: String = prefix.chars().filter(|c| *c != '-').collect();
        !wanted.is_empty() && self.0.simple().to_string().starts_with(&wanted.to_lowercase())
    }
}

impl fmt::Display for LatentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An immutable latent vector with identity and ancestry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatentVector {
    id: LatentId,
    components: DVector<f64>,
    lineage: Lineage,
}

impl LatentVector {
    pub fn new(id: LatentId, components: DVector<f64>, lineage: Lineage) -> Self {
        Self {
            id,
            components,
            lineage,
        }
    }

    /// Wrap `components` with a freshly drawn id
    pub fn with_fresh_id<R: Rng + ?Sized>(
        rng: &mut R,
        components: DVector<f64>,
        lineage: Lineage,
    ) -> Self {
        Self::new(LatentId::generate(rng), components, lineage)
    }

    /// Same id and components under a different ancestry record
    pub fn with_lineage(self, lineage: Lineage) -> Self {
        Self { lineage, ..self }
    }

    pub fn id(&self) -> LatentId {
        self.id
    }

    pub fn components(&self) -> &DVector<f64> {
        &self.components
    }

    pub fn lineage(&self) -> &Lineage {
        &self.lineage
    }

    pub fn dimension(&self) -> usize {
        self.components.len()
    }

    pub fn generation(&self) -> u32 {
        self.lineage.generation
    }

    /// Euclidean distance to another vector of the same dimension
    pub fn distance(&self, other: &LatentVector) -> f64 {
        (&self.components - &other.components).norm()
    }

    /// SHA256 over the components; equal fingerprints mean equal content
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for val in self.components.iter() {
            hasher.update(val.to_le_bytes());
        }
        hex::encode(hasher.finalize())
    }

    pub fn is_finite(&self) -> bool {
        self.components.iter().all(|v| v.is_finite())
    }
}
