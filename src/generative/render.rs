//! Renderer — decodes a population through the model boundary
//!
//! Each candidate is decoded on the blocking pool, bounded by a timeout and
//! retried a fixed number of times. Results come back in population order
//! because selection ids refer to display positions.

use super::{DecodeError, GenerativeAdapter, ImageHandle};
use crate::config::DecodeConfig;
use crate::latent::{Candidate, LatentVector, Population};
use futures::future::join_all;
use log::{debug, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Shared flag used to abort a session while a decode is in flight
#[derive(Debug, Clone, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
pub struct Renderer {
    adapter: Arc<dyn GenerativeAdapter>,
    config: DecodeConfig,
}

impl Renderer {
    pub fn new(adapter: Arc<dyn GenerativeAdapter>, config: DecodeConfig) -> Self {
        Self { adapter, config }
    }

    pub fn adapter(&self) -> &Arc<dyn GenerativeAdapter> {
        &self.adapter
    }

    pub fn config(&self) -> &DecodeConfig {
        &self.config
    }

    /// Decode one vector, retrying timeouts and model failures
    pub async fn decode(&self, vector: &LatentVector) -> Result<ImageHandle, DecodeError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.decode_once(vector.clone()).await {
                Err(err) if err.is_retryable() && attempt <= self.config.max_retries => {
                    warn!(
                        "Decode of {} failed (attempt {}/{}): {}",
                        vector.id().short(),
                        attempt,
                        self.config.max_retries + 1,
                        err
                    );
                }
                other => return other,
            }
        }
    }

    async fn decode_once(&self, vector: LatentVector) -> Result<ImageHandle, DecodeError> {
        let adapter = Arc::clone(&self.adapter);
        let task = tokio::task::spawn_blocking(move || adapter.decode(&vector));
        match tokio::time::timeout(Duration::from_millis(self.config.timeout_ms), task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(DecodeError::ModelFailure(format!(
                "decode task failed: {}",
                join_err
            ))),
            Err(_) => Err(DecodeError::Timeout(self.config.timeout_ms)),
        }
    }

    async fn decode_candidate(&self, candidate: &Candidate) -> Result<ImageHandle, DecodeError> {
        match &candidate.image {
            Some(image) => Ok(image.clone()),
            None => self.decode(&candidate.vector).await,
        }
    }

    /// Decode every candidate, reusing images already cached for the round
    pub async fn render(
        &self,
        population: &Population,
        abort: &AbortHandle,
    ) -> Result<Vec<ImageHandle>, DecodeError> {
        if abort.is_aborted() {
            return Err(DecodeError::Cancelled);
        }

        let results = if self.config.parallel {
            join_all(population.iter().map(|c| self.decode_candidate(c))).await
        } else {
            let mut results = Vec::with_capacity(population.len());
            for candidate in population.iter() {
                if abort.is_aborted() {
                    return Err(DecodeError::Cancelled);
                }
                results.push(self.decode_candidate(candidate).await);
            }
            results
        };

        if abort.is_aborted() {
            debug!("Discarding {} decoded images: session aborted", results.len());
            return Err(DecodeError::Cancelled);
        }
        results.into_iter().collect()
    }
}
