//! IDKIT — interactive portrait reconstruction in a generative latent space
//!
//! A witness is shown a small population of faces decoded from latent
//! vectors, picks the ones closest to their memory, and the variation engine
//! breeds the next population from those picks with a shrinking mutation
//! radius until the witness is satisfied or the round budget runs out.

pub mod config;
pub mod error;
pub mod generative;
pub mod latent;
pub mod session;
pub mod variation;

pub use config::SessionConfig;
pub use error::{IdkitError, Result};
pub use generative::{GenerativeAdapter, ImageHandle, ProjectionDecoder, Renderer};
pub use latent::{Candidate, LatentId, LatentVector, Population, SelectionRecord};
pub use session::{RoundOutcome, Session, SessionState};
pub use variation::VariationEngine;
