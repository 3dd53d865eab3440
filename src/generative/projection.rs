//! ProjectionDecoder — a small deterministic stand-in for a trained decoder
//!
//! pixels = 255 · sigmoid(W·z + b), with W and b drawn once from a seed.
//! Nearby latent vectors produce nearby images, which is all the search loop
//! relies on. Encoding inverts the sigmoid and applies the pseudo-inverse of
//! W, the least-squares latent for an image. Used by the demo CLI, the
//! benchmarks, and as a test double.

use super::{DecodeError, GenerativeAdapter, ImageHandle, ModelInfo};
use crate::latent::LatentVector;
use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

#[derive(Debug, Clone)]
pub struct ProjectionDecoder {
    weights: DMatrix<f64>,
    bias: DVector<f64>,
    /// Pseudo-inverse of `weights`; `None` if the decomposition failed
    encoder: Option<DMatrix<f64>>,
    width: u32,
    height: u32,
    /// Half-width of the uniform prior over each latent component
    prior_scale: f64,
}

impl ProjectionDecoder {
    pub fn new(dimension: usize, width: u32, height: u32, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let pixels = width as usize * height as usize;
        let scale = 1.0 / (dimension.max(1) as f64).sqrt();
        let weights = DMatrix::from_fn(pixels, dimension, |_, _| rng.gen_range(-1.0..1.0) * scale);
        let bias = DVector::from_fn(pixels, |_, _| rng.gen_range(-0.5..0.5));
        let encoder = weights.clone().pseudo_inverse(1e-10).ok();
        Self {
            weights,
            bias,
            encoder,
            width,
            height,
            prior_scale: 1.0,
        }
    }

    pub fn with_prior_scale(mut self, prior_scale: f64) -> Self {
        self.prior_scale = prior_scale;
        self
    }
}

impl GenerativeAdapter for ProjectionDecoder {
    fn info(&self) -> ModelInfo {
        ModelInfo {
            name: "projection".to_string(),
            latent_dimension: self.weights.ncols(),
            image_width: self.width,
            image_height: self.height,
        }
    }

    fn dimension(&self) -> usize {
        self.weights.ncols()
    }

    fn decode(&self, vector: &LatentVector) -> Result<ImageHandle, DecodeError> {
        if vector.dimension() != self.weights.ncols() {
            return Err(DecodeError::DimensionMismatch {
                expected: self.weights.ncols(),
                got: vector.dimension(),
            });
        }
        if !vector.is_finite() {
            return Err(DecodeError::ModelFailure(format!(
                "latent {} has non-finite components",
                vector.id()
            )));
        }
        let activation = &self.weights * vector.components() + &self.bias;
        let pixels = activation
            .iter()
            .map(|a| (255.0 / (1.0 + (-a).exp())).round() as u8)
            .collect();
        Ok(ImageHandle::from_pixels(self.width, self.height, pixels))
    }

    fn encode(&self, image: &ImageHandle) -> Result<DVector<f64>, DecodeError> {
        if image.width() != self.width || image.height() != self.height {
            return Err(DecodeError::DimensionMismatch {
                expected: self.bias.len(),
                got: image.pixels().len(),
            });
        }
        let encoder = self
            .encoder
            .as_ref()
            .ok_or_else(|| DecodeError::ModelFailure("projection is not invertible".into()))?;
        // Saturated pixels would map to infinite activations
        let activation = DVector::from_iterator(
            self.bias.len(),
            image.pixels().iter().map(|&p| {
                let level = (p as f64).clamp(0.5, 254.5) / 255.0;
                (level / (1.0 - level)).ln()
            }),
        );
        Ok(encoder * (activation - &self.bias))
    }

    fn sample_prior(&self, rng: &mut dyn RngCore) -> Result<DVector<f64>, DecodeError> {
        let scale = self.prior_scale;
        Ok(DVector::from_fn(self.weights.ncols(), |_, _| {
            rng.gen_range(-scale..=scale)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::latent::Lineage;

    #[test]
    fn test_decode_is_deterministic() {
        let decoder = ProjectionDecoder::new(16, 8, 8, 3);
        let mut rng = StdRng::seed_from_u64(1);
        let z = decoder.sample_prior(&mut rng).unwrap();
        let v = LatentVector::with_fresh_id(&mut rng, z, Lineage::genesis());
        let a = decoder.decode(&v).unwrap();
        let b = decoder.decode(&v).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.digest(), b.digest());
        assert_eq!(a.pixels().len(), 64);
    }

    #[test]
    fn test_same_seed_same_model() {
        let a = ProjectionDecoder::new(4, 2, 2, 9);
        let b = ProjectionDecoder::new(4, 2, 2, 9);
        let mut rng = StdRng::seed_from_u64(2);
        let v = LatentVector::with_fresh_id(&mut rng, DVector::from_element(4, 0.3), Lineage::genesis());
        assert_eq!(a.decode(&v).unwrap(), b.decode(&v).unwrap());
    }

    #[test]
    fn test_dimension_mismatch() {
        let decoder = ProjectionDecoder::new(4, 2, 2, 9);
        let mut rng = StdRng::seed_from_u64(3);
        let v = LatentVector::with_fresh_id(&mut rng, DVector::zeros(5), Lineage::genesis());
        assert_eq!(
            decoder.decode(&v),
            Err(DecodeError::DimensionMismatch { expected: 4, got: 5 })
        );
    }

    #[test]
    fn test_prior_within_scale() {
        let decoder = ProjectionDecoder::new(32, 2, 2, 9).with_prior_scale(0.5);
        let mut rng = StdRng::seed_from_u64(4);
        let z = decoder.sample_prior(&mut rng).unwrap();
        assert_eq!(z.len(), 32);
        assert!(z.iter().all(|v| v.abs() <= 0.5));
    }

    #[test]
    fn test_encode_recovers_latent() {
        let decoder = ProjectionDecoder::new(8, 8, 8, 21);
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..5 {
            let z = decoder.sample_prior(&mut rng).unwrap();
            let v = LatentVector::with_fresh_id(&mut rng, z.clone(), Lineage::genesis());
            let image = decoder.decode(&v).unwrap();
            let encoded = decoder.encode(&image).unwrap();
            assert_eq!(encoded.len(), 8);
            // only pixel quantisation separates the two
            assert!((encoded - z).amax() < 0.25);
        }
    }

    #[test]
    fn test_encode_rejects_wrong_size() {
        let decoder = ProjectionDecoder::new(4, 3, 2, 9);
        let image = ImageHandle::from_pixels(4, 4, vec![128; 16]);
        assert_eq!(
            decoder.encode(&image),
            Err(DecodeError::DimensionMismatch { expected: 6, got: 16 })
        );
    }

    #[test]
    fn test_non_square_pixel_count() {
        let decoder = ProjectionDecoder::new(3, 300, 7, 1);
        assert_eq!(decoder.weights.nrows(), 2100);
        let mut rng = StdRng::seed_from_u64(6);
        let v = LatentVector::with_fresh_id(&mut rng, DVector::zeros(3), Lineage::genesis());
        let image = decoder.decode(&v).unwrap();
        assert_eq!((image.width(), image.height()), (300, 7));
        assert_eq!(image.pixels().len(), 2100);
    }

    #[test]
    fn test_write_pgm() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("face.pgm");
        let image = ImageHandle::from_pixels(2, 2, vec![0, 64, 128, 255]);
        image.write_pgm(&path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"P5\n2 2\n255\n"));
        assert_eq!(&bytes[bytes.len() - 4..], &[0, 64, 128, 255]);
        assert_eq!(ImageHandle::read_pgm(&path).unwrap(), image);
    }

    #[test]
    fn test_read_pgm_with_comment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.pgm");
        let mut bytes = b"P5\n# scanner output\n3 1\n255\n".to_vec();
        bytes.extend_from_slice(&[10, 20, 30]);
        std::fs::write(&path, bytes).unwrap();
        let image = ImageHandle::read_pgm(&path).unwrap();
        assert_eq!((image.width(), image.height()), (3, 1));
        assert_eq!(image.pixels(), &[10, 20, 30]);

        std::fs::write(&path, b"P2\n1 1\n255\n7").unwrap();
        assert!(ImageHandle::read_pgm(&path).is_err());
        std::fs::write(&path, b"P5\n2 2\n255\n\x01").unwrap();
        assert!(ImageHandle::read_pgm(&path).is_err());
    }
}
