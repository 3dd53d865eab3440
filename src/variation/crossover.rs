//! Recombination of selected vectors: blending, crossing-over, and pruning
//! of offspring that drifted away from the rest of the brood.

use crate::latent::{Lineage, LatentId, LatentVector};
use nalgebra::DVector;
use rand::Rng;

/// Weighted interpolation of `parents`. Weights are normalised; an all-zero
/// weight vector falls back to equal weights.
pub fn blend(parents: &[&LatentVector], weights: &[f64], id: LatentId) -> LatentVector {
    debug_assert_eq!(parents.len(), weights.len());
    let dim = parents.first().map(|p| p.dimension()).unwrap_or(0);
    let total: f64 = weights.iter().sum();
    let normalised: Vec<f64> = if total > 0.0 {
        weights.iter().map(|w| w / total).collect()
    } else {
        vec![1.0 / parents.len() as f64; parents.len()]
    };

    let mut components = DVector::zeros(dim);
    for (parent, w) in parents.iter().zip(&normalised) {
        components += parent.components() * *w;
    }

    let ancestry: Vec<(LatentId, u32)> = parents.iter().map(|p| (p.id(), p.generation())).collect();
    LatentVector::new(id, components, Lineage::blend(&ancestry))
}

/// The candidate closest to `target` by Euclidean distance, skipping `target` itself
pub fn nearest<'a>(target: &LatentVector, others: &[&'a LatentVector]) -> Option<&'a LatentVector> {
    others
        .iter()
        .filter(|o| o.id() != target.id())
        .min_by(|a, b| {
            target
                .distance(a)
                .partial_cmp(&target.distance(b))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .copied()
}

/// Take each component from `partner` with probability `rate`
pub fn cross<R: Rng + ?Sized>(
    parent: &LatentVector,
    partner: &LatentVector,
    rate: f64,
    id: LatentId,
    rng: &mut R,
) -> LatentVector {
    let rate = rate.clamp(0.0, 1.0);
    let components = DVector::from_fn(parent.dimension(), |i, _| {
        if rng.gen_bool(rate) {
            partner.components()[i]
        } else {
            parent.components()[i]
        }
    });
    LatentVector::new(
        id,
        components,
        Lineage::crossover(
            (parent.id(), parent.generation()),
            (partner.id(), partner.generation()),
        ),
    )
}

/// Index of the vector with the greatest summed distance to all the others
pub fn farthest_outlier(vectors: &[&LatentVector]) -> Option<usize> {
    if vectors.len() < 2 {
        return None;
    }
    let spread: Vec<f64> = vectors
        .iter()
        .map(|v| vectors.iter().map(|o| v.distance(o)).sum::<f64>())
        .collect();
    spread
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
}
