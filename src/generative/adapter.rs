//! Generative model boundary
//!
//! The model is an opaque capability: it maps a latent vector to pixels,
//! maps a reference photo back into its latent space, and can draw fresh
//! vectors from its prior. Implementations keep no cache; the population
//! caches decoded images per round.

use crate::latent::LatentVector;
use nalgebra::DVector;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;
use std::sync::Arc;

/// Failures at the model boundary
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("latent dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("model call timed out after {0} ms")]
    Timeout(u64),

    #[error("model failure: {0}")]
    ModelFailure(String),

    #[error("decoding cancelled")]
    Cancelled,
}

impl DecodeError {
    /// Dimension mismatches are deterministic and never worth retrying
    pub fn is_retryable(&self) -> bool {
        matches!(self, DecodeError::Timeout(_) | DecodeError::ModelFailure(_))
    }
}

/// Opaque decoded image (8-bit grayscale)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageHandle {
    width: u32,
    height: u32,
    pixels: Arc<[u8]>,
}

impl ImageHandle {
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels: pixels.into(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// SHA256 of dimensions and pixel data
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.width.to_le_bytes());
        hasher.update(self.height.to_le_bytes());
        hasher.update(&self.pixels[..]);
        hex::encode(hasher.finalize())
    }

    /// Write the image as a binary PGM (P5) file
    pub fn write_pgm(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let mut file = std::fs::File::create(path)?;
        write!(file, "P5\n{} {}\n255\n", self.width, self.height)?;
        file.write_all(&self.pixels)?;
        Ok(())
    }

    /// Read a binary PGM (P5) file with a maximum grey value of 255
    pub fn read_pgm(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let mut reader = BufReader::new(std::fs::File::open(path)?);
        let magic = pgm_token(&mut reader)?;
        if magic != "P5" {
            return Err(invalid_pgm(format!("unsupported magic number {:?}", magic)));
        }
        let width = pgm_number(&mut reader)?;
        let height = pgm_number(&mut reader)?;
        let max_value = pgm_number(&mut reader)?;
        if max_value == 0 || max_value > 255 {
            return Err(invalid_pgm(format!("unsupported maximum value {}", max_value)));
        }
        let mut pixels = vec![0u8; width as usize * height as usize];
        reader.read_exact(&mut pixels)?;
        Ok(Self::from_pixels(width, height, pixels))
    }
}

fn invalid_pgm(msg: String) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, msg)
}

/// Next header token; `#` comments run to the end of the line. Consumes the
/// single whitespace byte that ends the token.
fn pgm_token(reader: &mut impl BufRead) -> std::io::Result<String> {
    let mut token = String::new();
    let mut byte = [0u8; 1];
    loop {
        reader.read_exact(&mut byte)?;
        match byte[0] {
            b'#' if token.is_empty() => {
                let mut comment = Vec::new();
                reader.read_until(b'\n', &mut comment)?;
            }
            b if b.is_ascii_whitespace() => {
                if !token.is_empty() {
                    return Ok(token);
                }
            }
            b => token.push(b as char),
        }
    }
}

fn pgm_number(reader: &mut impl BufRead) -> std::io::Result<u32> {
    let token = pgm_token(reader)?;
    token
        .parse()
        .map_err(|_| invalid_pgm(format!("bad header field {:?}", token)))
}

/// Description of the model behind an adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub latent_dimension: usize,
    pub image_width: u32,
    pub image_height: u32,
}

/// The encode/decode capability of a pretrained generative model
pub trait GenerativeAdapter: Send + Sync {
    fn info(&self) -> ModelInfo;

    fn dimension(&self) -> usize {
        self.info().latent_dimension
    }

    /// Decode a latent vector into an image. Must be deterministic for a given
    /// vector and must fail rather than return blank output.
    fn decode(&self, vector: &LatentVector) -> Result<ImageHandle, DecodeError>;

    /// Map an image back to the latent vector that best reproduces it
    fn encode(&self, image: &ImageHandle) -> Result<DVector<f64>, DecodeError>;

    /// Draw a fresh point from the model's input distribution
    fn sample_prior(&self, rng: &mut dyn RngCore) -> Result<DVector<f64>, DecodeError>;
}
