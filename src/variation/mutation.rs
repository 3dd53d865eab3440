//! Mutation operators on latent vectors

use crate::latent::{Lineage, LatentId, LatentVector};
use nalgebra::DVector;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Which components a mutation touches
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MutationScope {
    /// Every component changes
    Total,
    /// Each component changes independently with probability `rate`
    Partial { rate: f64 },
}

/// How a touched component changes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MutationMode {
    /// Add a uniform offset in [-radius, radius]
    Additive { scope: MutationScope },
    /// Move towards a resample inside mean ± std of the parent's components,
    /// by at most `radius` per component
    Reconstruct { scope: MutationScope },
}

impl Default for MutationMode {
    fn default() -> Self {
        MutationMode::Additive {
            scope: MutationScope::Total,
        }
    }
}

impl MutationMode {
    pub fn scope(&self) -> MutationScope {
        match self {
            MutationMode::Additive { scope } | MutationMode::Reconstruct { scope } => *scope,
        }
    }

    /// Produce a mutated child of `parent` with a fresh id
    pub fn apply<R: Rng + ?Sized>(
        &self,
        parent: &LatentVector,
        id: LatentId,
        radius: f64,
        rng: &mut R,
    ) -> LatentVector {
        let dim = parent.dimension();
        let mask = touched_components(self.scope(), dim, rng);
        let source = parent.components();

        let components = match self {
            MutationMode::Additive { .. } => DVector::from_fn(dim, |i, _| {
                if mask[i] {
                    source[i] + rng.gen_range(-radius..=radius)
                } else {
                    source[i]
                }
            }),
            MutationMode::Reconstruct { .. } => {
                let mean = source.mean();
                let std = if dim > 1 { source.variance().sqrt() } else { 0.0 };
                // Step towards a draw from the parent's own distribution, at most `radius`
                DVector::from_fn(dim, |i, _| {
                    if mask[i] {
                        let target = mean + rng.gen_range(-std..=std);
                        source[i] + (target - source[i]).clamp(-radius, radius)
                    } else {
                        source[i]
                    }
                })
            }
        };

        LatentVector::new(
            id,
            components,
            Lineage::perturbation(parent.id(), parent.generation()),
        )
    }
}

/// Decide which components mutate; a partial scope always touches at least one
fn touched_components<R: Rng + ?Sized>(scope: MutationScope, dim: usize, rng: &mut R) -> Vec<bool> {
    match scope {
        MutationScope::Total => vec![true; dim],
        MutationScope::Partial { rate } => {
            let rate = rate.clamp(0.0, 1.0);
            let mut mask: Vec<bool> = (0..dim).map(|_| rng.gen_bool(rate)).collect();
            if dim > 0 && !mask.iter().any(|m| *m) {
                mask[rng.gen_range(0..dim)] = true;
            }
            mask
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn parent(rng: &mut StdRng) -> LatentVector {
        LatentVector::with_fresh_id(
            rng,
            DVector::from_vec(vec![0.5, -1.0, 2.0, 0.0, 1.5, -0.5]),
            Lineage::genesis(),
        )
    }

    #[test]
    fn test_additive_offsets_bounded() {
        let mut rng = StdRng::seed_from_u64(1);
        let p = parent(&mut rng);
        for _ in 0..50 {
            let id = LatentId::generate(&mut rng);
            let child = MutationMode::default().apply(&p, id, 0.25, &mut rng);
            let diff = child.components() - p.components();
            assert!(diff.iter().all(|d| d.abs() <= 0.25 + 1e-12));
            assert_eq!(child.lineage().parent_ids(), vec![p.id()]);
            assert_eq!(child.generation(), 1);
        }
    }

    #[test]
    fn test_partial_touches_at_least_one() {
        let mut rng = StdRng::seed_from_u64(2);
        let p = parent(&mut rng);
        let mode = MutationMode::Additive {
            scope: MutationScope::Partial { rate: 0.0 },
        };
        let id = LatentId::generate(&mut rng);
        let child = mode.apply(&p, id, 1.0, &mut rng);
        let changed = child
            .components()
            .iter()
            .zip(p.components().iter())
            .filter(|(a, b)| a != b)
            .count();
        assert!(changed <= 1);
        let mask = touched_components(MutationScope::Partial { rate: 0.0 }, 6, &mut rng);
        assert_eq!(mask.iter().filter(|m| **m).count(), 1);
    }

    #[test]
    fn test_reconstruct_moves_towards_parent_distribution() {
        let mut rng = StdRng::seed_from_u64(3);
        let p = parent(&mut rng);
        let mode = MutationMode::Reconstruct {
            scope: MutationScope::Total,
        };
        let mean = p.components().mean();
        let std = p.components().variance().sqrt();
        // wide enough to reach any draw in mean ± std
        let id = LatentId::generate(&mut rng);
        let child = mode.apply(&p, id, 100.0, &mut rng);
        assert!(child
            .components()
            .iter()
            .all(|v| (v - mean).abs() <= std + 1e-12));
    }

    #[test]
    fn test_every_mode_and_scope_bounded_by_radius() {
        let scopes = [MutationScope::Total, MutationScope::Partial { rate: 0.4 }];
        let mut rng = StdRng::seed_from_u64(5);
        // components far from their own mean, so reconstruction wants large jumps
        let p = LatentVector::with_fresh_id(
            &mut rng,
            DVector::from_vec(vec![3.0, -3.0, 2.9, -2.8, 0.1, 3.0]),
            Lineage::genesis(),
        );
        for scope in scopes {
            let modes = [MutationMode::Additive { scope }, MutationMode::Reconstruct { scope }];
            for mode in modes {
                for radius in [0.05, 0.3, 1.0] {
                    for _ in 0..20 {
                        let id = LatentId::generate(&mut rng);
                        let child = mode.apply(&p, id, radius, &mut rng);
                        let offset = (child.components() - p.components()).amax();
                        assert!(
                            offset <= radius + 1e-12,
                            "{:?} radius {} moved {}",
                            mode,
                            radius,
                            offset
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_same_rng_state_same_child() {
        let mut setup = StdRng::seed_from_u64(4);
        let p = parent(&mut setup);
        let id = LatentId::generate(&mut setup);
        let a = MutationMode::default().apply(&p, id, 0.5, &mut StdRng::seed_from_u64(99));
        let b = MutationMode::default().apply(&p, id, 0.5, &mut StdRng::seed_from_u64(99));
        assert_eq!(a, b);
    }
}
