//! Latent space — candidate vectors, their ancestry, and the active population
//!
//! A candidate face is a point in the generative model's input space. The
//! store holds the population currently on display; vectors themselves are
//! immutable and identified by id.

mod lineage;
mod population;
mod selection;
mod store;
mod vector;

pub use lineage::{Lineage, Origin};
pub use population::{Candidate, Population};
pub use selection::SelectionRecord;
pub use store::LatentStore;
pub use vector::{LatentId, LatentVector};
