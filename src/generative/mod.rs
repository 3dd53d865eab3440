//! Generative model boundary — latent vectors in, pixels out

mod adapter;
mod gallery;
mod projection;
mod render;

pub use adapter::{DecodeError, GenerativeAdapter, ImageHandle, ModelInfo};
pub use gallery::{AgeGroup, Attributes, Gallery, Gender, Hair, ReferenceImage};
pub use projection::ProjectionDecoder;
pub use render::{AbortHandle, Renderer};
