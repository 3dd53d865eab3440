//! Session — the interactive selection loop as an explicit state machine
//!
//! A driver (CLI, GUI) calls `submit_selection`, `undo` and `abort` and
//! shows whatever population or outcome they return. Every round draws its
//! randomness from a source derived from the session seed and the round
//! number, so a session can be resumed from disk and an undone round
//! replayed to the same population.

use super::history::HistoryLog;
use super::persist::{SessionSnapshot, SNAPSHOT_FORMAT_VERSION};
use crate::config::SessionConfig;
use crate::error::{IdkitError, Result};
use crate::generative::{
    AbortHandle, DecodeError, GenerativeAdapter, ImageHandle, ReferenceImage, Renderer,
};
use crate::latent::{Candidate, LatentId, LatentStore, Population, SelectionRecord};
use crate::variation::VariationEngine;
use chrono::Utc;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    AwaitingSelection,
    Advancing,
    TerminatedSatisfied,
    TerminatedMaxIter,
    TerminatedAborted,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::TerminatedSatisfied
                | SessionState::TerminatedMaxIter
                | SessionState::TerminatedAborted
        )
    }
}

/// Result of a successful `submit_selection`
#[derive(Debug, Clone)]
pub enum RoundOutcome {
    /// A new population was committed for `round`
    Advanced { round: u32 },
    /// The session ended; `portrait` is the candidate it settled on
    Finished {
        state: SessionState,
        portrait: Candidate,
    },
}

/// Random source for the population produced in `round`
pub fn round_rng(seed: u64, round: u32) -> StdRng {
    StdRng::seed_from_u64(seed ^ (round as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

pub struct Session {
    config: SessionConfig,
    seed: u64,
    state: SessionState,
    round: u32,
    store: LatentStore,
    history: HistoryLog,
    engine: VariationEngine,
    renderer: Renderer,
    abort: AbortHandle,
    portrait: Option<LatentId>,
}

impl Session {
    /// Sample the initial population and wait for the first selection
    pub fn start(config: SessionConfig, adapter: Arc<dyn GenerativeAdapter>) -> Result<Self> {
        Self::start_from_references(config, adapter, &[])
    }

    /// Start from encoded reference images, e.g. the gallery entries matching
    /// the witness's description. Slots the references do not fill are
    /// sampled from the prior.
    pub fn start_from_references(
        config: SessionConfig,
        adapter: Arc<dyn GenerativeAdapter>,
        references: &[&ReferenceImage],
    ) -> Result<Self> {
        config.validate()?;
        if adapter.dimension() == 0 {
            return Err(IdkitError::Initialization(
                "model reports a zero-dimensional latent space".into(),
            ));
        }
        let seed = config.seed.unwrap_or_else(rand::random);

        let mut store = LatentStore::new(config.population_size);
        let mut rng = round_rng(seed, 0);
        store.create_population_from_references(adapter.as_ref(), references, &mut rng)?;

        let mut history = HistoryLog::new();
        history.append(store.current()?.clone(), None)?;

        let model = adapter.info();
        info!(
            "Session started: model '{}' ({}-d latent, {}x{} images), N={}, max_rounds={}, seed={}",
            model.name,
            model.latent_dimension,
            model.image_width,
            model.image_height,
            config.population_size,
            config.max_rounds,
            seed
        );
        match config.variation.schedule().rounds_to_floor() {
            Some(round) => debug!("Mutation radius reaches its floor at round {}", round),
            None => debug!("Mutation radius never reaches its floor"),
        }

        Ok(Self {
            engine: VariationEngine::new(config.variation.clone(), config.population_size),
            renderer: Renderer::new(adapter, config.decode.clone()),
            config,
            seed,
            state: SessionState::AwaitingSelection,
            round: 0,
            store,
            history,
            abort: AbortHandle::new(),
            portrait: None,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn state(&self) -> SessionState {
        self.sync_abort_state()
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// The last committed population
    pub fn current(&self) -> Result<&Population> {
        self.store.current()
    }

    /// Handle that aborts the session from another task, e.g. mid-decode
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// The candidate the session settled on, once it ended with one
    pub fn final_candidate(&self) -> Option<&Candidate> {
        let id = self.portrait?;
        self.store.current().ok()?.get(id)
    }

    /// Record the witness's answer for the current round and move on
    pub fn submit_selection(
        &mut self,
        selected: &[LatentId],
        satisfied: bool,
    ) -> Result<RoundOutcome> {
        self.require_awaiting("submit a selection")?;

        let record = SelectionRecord::new(self.store.current()?, selected, satisfied)?;
        match (satisfied, record.len()) {
            (_, 0) => return Err(IdkitError::EmptySelection),
            (true, n) if n > 1 => return Err(IdkitError::AmbiguousFinalization(n)),
            _ => {}
        }
        self.history.record_selection(record.clone())?;
        debug!(
            "Round {}: {} of {} candidates selected",
            self.round,
            record.len(),
            self.config.population_size
        );

        if satisfied {
            return self.finish(SessionState::TerminatedSatisfied, record.selected[0]);
        }
        if self.round >= self.config.max_rounds {
            let best = self.history.best_match().ok_or_else(|| {
                IdkitError::InvariantViolation("no selection recorded to finish with".into())
            })?;
            return self.finish(SessionState::TerminatedMaxIter, best);
        }

        self.state = SessionState::Advancing;
        match self.advance(&record) {
            Ok(round) => {
                self.state = SessionState::AwaitingSelection;
                Ok(RoundOutcome::Advanced { round })
            }
            Err(e) => {
                warn!("Round {} could not advance, staying on it: {}", self.round, e);
                self.history.reopen(self.round)?;
                self.state = SessionState::AwaitingSelection;
                Err(e)
            }
        }
    }

    fn advance(&mut self, record: &SelectionRecord) -> Result<u32> {
        let mut rng = round_rng(self.seed, self.round + 1);
        let next = self
            .engine
            .advance(self.store.current()?, record, self.round, &mut rng)?;
        self.store.commit(next.clone())?;
        self.history.append(next, None)?;
        self.round += 1;
        let schedule = self.engine.schedule();
        info!(
            "Advanced to round {} (radius {:.3}, temperature {:.2})",
            self.round,
            schedule.radius(self.round),
            schedule.temperature(self.round)
        );
        Ok(self.round)
    }

    fn finish(&mut self, state: SessionState, id: LatentId) -> Result<RoundOutcome> {
        let portrait = self
            .store
            .current()?
            .get(id)
            .cloned()
            .ok_or_else(|| IdkitError::UnknownCandidate(id.to_string()))?;
        self.state = state;
        self.portrait = Some(id);
        info!("Session finished at round {} ({:?}) with {}", self.round, state, id.short());
        Ok(RoundOutcome::Finished { state, portrait })
    }

    /// End the session; history stays available for inspection
    pub fn abort(&mut self) -> Result<()> {
        if self.state.is_terminal() {
            return Err(IdkitError::InvalidState(format!(
                "cannot abort a session in state {:?}",
                self.state
            )));
        }
        self.abort.abort();
        self.state = SessionState::TerminatedAborted;
        info!("Session aborted at round {}", self.round);
        Ok(())
    }

    /// Step back to the previous round's population
    pub fn undo(&mut self) -> Result<&Population> {
        self.require_awaiting("undo")?;
        if self.round == 0 {
            return Err(IdkitError::InvalidState("nothing to undo at round 0".into()));
        }
        let previous = self.round - 1;
        let population = self
            .history
            .get(previous)
            .map(|e| e.population.clone())
            .ok_or(IdkitError::OrderViolation {
                expected: previous,
                got: self.round,
            })?;

        self.history.truncate_after(previous);
        self.history.reopen(previous)?;
        self.store.commit(population)?;
        self.round = previous;
        info!("Undo: back to round {}", self.round);
        self.store.current()
    }

    /// Decode the current population and cache the images on it. A decode
    /// failure leaves the round as it was so it can be rendered again.
    pub async fn render_current(&mut self) -> Result<&Population> {
        if self.sync_abort() {
            return Err(DecodeError::Cancelled.into());
        }
        let round = self.round;
        let rendered = self
            .renderer
            .render(self.store.current()?, &self.abort)
            .await;
        match rendered {
            Ok(images) => {
                self.attach_images(round, images)?;
                self.store.current()
            }
            Err(e) => {
                self.sync_abort();
                warn!("Rendering round {} failed: {}", round, e);
                Err(e.into())
            }
        }
    }

    /// Cache decoded images for `round`. Returns false when the images are
    /// stale (another round is current, or the session was aborted).
    pub fn attach_images(&mut self, round: u32, images: Vec<ImageHandle>) -> Result<bool> {
        if self.sync_abort() || round != self.round {
            debug!(
                "Discarding {} images for round {} (current round {}, state {:?})",
                images.len(),
                round,
                self.round,
                self.state
            );
            return Ok(false);
        }
        self.store.current_mut()?.attach_images(images)?;
        Ok(true)
    }

    /// Image of the final candidate, decoding it if it is not cached
    pub async fn render_portrait(&self) -> Result<ImageHandle> {
        let candidate = self
            .final_candidate()
            .ok_or_else(|| IdkitError::InvalidState("session has no final candidate".into()))?;
        match &candidate.image {
            Some(image) => Ok(image.clone()),
            None => Ok(self.renderer.decode(&candidate.vector).await?),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            format_version: SNAPSHOT_FORMAT_VERSION,
            config: self.config.clone(),
            seed: self.seed,
            state: self.sync_abort_state(),
            round: self.round,
            portrait: self.portrait,
            history: self.history.clone(),
            saved_at: Utc::now(),
        }
    }

    /// Rebuild a session from a snapshot against the given model
    pub fn restore(snapshot: SessionSnapshot, adapter: Arc<dyn GenerativeAdapter>) -> Result<Self> {
        if snapshot.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(IdkitError::Persistence(format!(
                "unsupported snapshot format {} (expected {})",
                snapshot.format_version, SNAPSHOT_FORMAT_VERSION
            )));
        }
        snapshot.config.validate()?;

        let last = snapshot
            .history
            .last()
            .ok_or_else(|| IdkitError::Persistence("snapshot has an empty history".into()))?;
        if last.round != snapshot.round || snapshot.history.len() != snapshot.round as usize + 1 {
            return Err(IdkitError::OrderViolation {
                expected: snapshot.round,
                got: last.round,
            });
        }
        let population = last.population.clone();
        let dimension = population.vectors().next().map(|v| v.dimension());
        if dimension != Some(adapter.dimension()) {
            return Err(IdkitError::Initialization(format!(
                "snapshot latent dimension {:?} does not match model dimension {}",
                dimension,
                adapter.dimension()
            )));
        }

        let state = match snapshot.state {
            // An interrupted advance never committed anything
            SessionState::Advancing => SessionState::AwaitingSelection,
            other => other,
        };
        let mut history = snapshot.history;
        if state == SessionState::AwaitingSelection && last_is_closed(&history) {
            history.reopen(snapshot.round)?;
        }
        if let Some(id) = snapshot.portrait {
            if !population.contains(id) {
                return Err(IdkitError::UnknownCandidate(id.to_string()));
            }
        }

        let config = snapshot.config;
        let mut store = LatentStore::new(config.population_size);
        store.commit(population)?;

        let abort = AbortHandle::new();
        if state == SessionState::TerminatedAborted {
            abort.abort();
        }
        info!(
            "Session restored at round {} ({:?}), {} history entries",
            snapshot.round,
            state,
            history.len()
        );

        Ok(Self {
            engine: VariationEngine::new(config.variation.clone(), config.population_size),
            renderer: Renderer::new(adapter, config.decode.clone()),
            config,
            seed: snapshot.seed,
            state,
            round: snapshot.round,
            store,
            history,
            abort,
            portrait: snapshot.portrait,
        })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.snapshot().save(path)
    }

    pub fn load(path: impl AsRef<Path>, adapter: Arc<dyn GenerativeAdapter>) -> Result<Self> {
        Self::restore(SessionSnapshot::load(path)?, adapter)
    }

    fn require_awaiting(&mut self, action: &str) -> Result<()> {
        self.sync_abort();
        if self.state != SessionState::AwaitingSelection {
            return Err(IdkitError::InvalidState(format!(
                "cannot {} in state {:?}",
                action, self.state
            )));
        }
        Ok(())
    }

    /// Pick up an abort raised through a cloned handle; true when aborted
    fn sync_abort(&mut self) -> bool {
        self.state = self.sync_abort_state();
        self.state == SessionState::TerminatedAborted
    }

    fn sync_abort_state(&self) -> SessionState {
        if self.abort.is_aborted() && !self.state.is_terminal() {
            SessionState::TerminatedAborted
        } else {
            self.state
        }
    }
}

fn last_is_closed(history: &HistoryLog) -> bool {
    history.last().map_or(false, |e| e.selection.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generative::{Attributes, ProjectionDecoder};
    use crate::latent::{LatentVector, Lineage, Origin};

    fn adapter() -> Arc<dyn GenerativeAdapter> {
        Arc::new(ProjectionDecoder::new(8, 6, 6, 11))
    }

    fn config(n: usize, max_rounds: u32) -> SessionConfig {
        let mut config = SessionConfig::default().with_seed(2024);
        config.population_size = n;
        config.max_rounds = max_rounds;
        config
    }

    #[test]
    fn test_start_awaits_first_selection() {
        let session = Session::start(config(4, 3), adapter()).unwrap();
        assert_eq!(session.state(), SessionState::AwaitingSelection);
        assert_eq!(session.round(), 0);
        assert_eq!(session.current().unwrap().len(), 4);
        let entry = session.history().last().unwrap();
        assert_eq!(entry.round, 0);
        assert!(entry.selection.is_none());
    }

    #[test]
    fn test_start_rejects_bad_config() {
        let result = Session::start(config(1, 3), adapter());
        assert!(matches!(result, Err(IdkitError::Initialization(_))));
    }

    #[test]
    fn test_single_pick_scenario_reaches_max_iter() {
        let mut config = config(4, 3);
        config.variation.prune_outliers = false;
        let mut session = Session::start(config, adapter()).unwrap();

        let v1 = session.current().unwrap().ids()[1];
        let outcome = session.submit_selection(&[v1], false).unwrap();
        assert!(matches!(outcome, RoundOutcome::Advanced { round: 1 }));

        let round1 = session.current().unwrap();
        assert_eq!(round1.ids()[0], v1);
        let variants: Vec<_> = round1.vectors().filter(|v| v.id() != v1).collect();
        assert_eq!(variants.len(), 3);
        for v in variants {
            assert_eq!(v.lineage().origin, Origin::Perturbation { parent: v1 });
        }

        let last_pick = loop {
            let pick = session.current().unwrap().ids()[2];
            match session.submit_selection(&[pick], false).unwrap() {
                RoundOutcome::Advanced { .. } => {}
                RoundOutcome::Finished { state, portrait } => {
                    assert_eq!(state, SessionState::TerminatedMaxIter);
                    assert_eq!(portrait.id(), pick);
                    break pick;
                }
            }
        };
        assert_eq!(session.round(), 3);
        assert_eq!(session.state(), SessionState::TerminatedMaxIter);
        assert_eq!(session.final_candidate().map(|c| c.id()), Some(last_pick));
        assert_eq!(session.history().len(), 4);
        assert!(session.submit_selection(&[last_pick], false).is_err());
    }

    #[test]
    fn test_satisfied_at_round_one() {
        let mut session = Session::start(config(5, 10), adapter()).unwrap();
        let first = session.current().unwrap().ids()[0];
        session.submit_selection(&[first], false).unwrap();

        let pick = session.current().unwrap().ids()[3];
        let expected = session.current().unwrap().get(pick).cloned().unwrap();
        match session.submit_selection(&[pick], true).unwrap() {
            RoundOutcome::Finished { state, portrait } => {
                assert_eq!(state, SessionState::TerminatedSatisfied);
                assert_eq!(portrait.vector, expected.vector);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(session.final_candidate().map(|c| c.id()), Some(pick));
    }

    #[test]
    fn test_ambiguous_finalization_keeps_waiting() {
        let mut session = Session::start(config(5, 10), adapter()).unwrap();
        let ids = session.current().unwrap().ids();
        let result = session.submit_selection(&ids[..2], true);
        assert!(matches!(result, Err(IdkitError::AmbiguousFinalization(2))));
        assert_eq!(session.state(), SessionState::AwaitingSelection);
        assert!(session.history().last().unwrap().selection.is_none());
    }

    #[test]
    fn test_empty_selection_does_not_advance() {
        let mut session = Session::start(config(5, 10), adapter()).unwrap();
        let before = session.current().unwrap().clone();
        let result = session.submit_selection(&[], false);
        assert!(matches!(result, Err(IdkitError::EmptySelection)));
        assert_eq!(session.round(), 0);
        assert_eq!(session.state(), SessionState::AwaitingSelection);
        assert!(session.current().unwrap().same_vectors(&before));
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn test_unknown_candidate_rejected() {
        let mut session = Session::start(config(4, 5), adapter()).unwrap();
        let other = Session::start(config(4, 5).with_seed(9), adapter()).unwrap();
        let foreign = other.current().unwrap().ids()[0];
        assert!(matches!(
            session.submit_selection(&[foreign], false),
            Err(IdkitError::UnknownCandidate(_))
        ));
    }

    #[test]
    fn test_undo_then_resubmit_reproduces_population() {
        let mut session = Session::start(config(6, 10), adapter()).unwrap();
        let ids = session.current().unwrap().ids();
        session.submit_selection(&[ids[0], ids[4]], false).unwrap();

        let pick = session.current().unwrap().ids()[1];
        session.submit_selection(&[pick], false).unwrap();
        let round2 = session.current().unwrap().clone();

        let back = session.undo().unwrap();
        assert_eq!(back.round(), 1);
        assert_eq!(session.round(), 1);
        assert_eq!(session.history().len(), 2);
        assert!(session.history().last().unwrap().selection.is_none());

        session.submit_selection(&[pick], false).unwrap();
        assert_eq!(session.current().unwrap(), &round2);
    }

    #[test]
    fn test_undo_at_round_zero_fails() {
        let mut session = Session::start(config(4, 5), adapter()).unwrap();
        assert!(matches!(session.undo(), Err(IdkitError::InvalidState(_))));
    }

    #[test]
    fn test_abort_preserves_history() {
        let mut session = Session::start(config(4, 5), adapter()).unwrap();
        let pick = session.current().unwrap().ids()[0];
        session.submit_selection(&[pick], false).unwrap();
        let population = session.current().unwrap().clone();

        session.abort().unwrap();
        assert_eq!(session.state(), SessionState::TerminatedAborted);
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.current().unwrap(), &population);
        assert!(session.abort().is_err());
        assert!(session.undo().is_err());
        assert!(session.final_candidate().is_none());
    }

    #[test]
    fn test_abort_through_handle() {
        let mut session = Session::start(config(4, 5), adapter()).unwrap();
        let handle = session.abort_handle();
        handle.abort();
        assert_eq!(session.state(), SessionState::TerminatedAborted);
        let pick = session.current().unwrap().ids()[0];
        assert!(matches!(
            session.submit_selection(&[pick], false),
            Err(IdkitError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn test_render_current_is_idempotent() {
        let mut session = Session::start(config(4, 5), adapter()).unwrap();
        let first: Vec<String> = session
            .render_current()
            .await
            .unwrap()
            .iter()
            .map(|c| c.image.as_ref().unwrap().digest())
            .collect();
        assert!(session.current().unwrap().is_fully_decoded());

        let direct = session
            .renderer()
            .decode(&session.current().unwrap().candidates()[0].vector)
            .await
            .unwrap();
        assert_eq!(direct.digest(), first[0]);

        let second: Vec<String> = session
            .render_current()
            .await
            .unwrap()
            .iter()
            .map(|c| c.image.as_ref().unwrap().digest())
            .collect();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_stale_images_are_discarded() {
        let mut session = Session::start(config(4, 5), adapter()).unwrap();
        let images = session
            .renderer()
            .render(session.current().unwrap(), &AbortHandle::new())
            .await
            .unwrap();

        let pick = session.current().unwrap().ids()[0];
        session.submit_selection(&[pick], false).unwrap();
        assert!(!session.attach_images(0, images.clone()).unwrap());
        assert!(!session.current().unwrap().is_fully_decoded());

        session.abort().unwrap();
        assert!(!session.attach_images(1, images).unwrap());
        assert!(session.render_current().await.is_err());
    }

    #[tokio::test]
    async fn test_render_portrait_after_finish() {
        let mut session = Session::start(config(4, 5), adapter()).unwrap();
        assert!(session.render_portrait().await.is_err());
        let pick = session.current().unwrap().ids()[2];
        session.submit_selection(&[pick], true).unwrap();
        let image = session.render_portrait().await.unwrap();
        assert_eq!((image.width(), image.height()), (6, 6));
    }

    #[test]
    fn test_snapshot_restore_roundtrip() {
        let mut session = Session::start(config(5, 10), adapter()).unwrap();
        let ids = session.current().unwrap().ids();
        session.submit_selection(&[ids[1], ids[3]], false).unwrap();

        let restored = Session::restore(session.snapshot(), adapter()).unwrap();
        assert_eq!(restored.round(), session.round());
        assert_eq!(restored.state(), SessionState::AwaitingSelection);
        assert_eq!(restored.current().unwrap().ids(), session.current().unwrap().ids());
        assert_eq!(restored.history(), session.history());

        // resumed sessions keep advancing the same way
        let pick = session.current().unwrap().ids()[0];
        let mut resumed = restored;
        session.submit_selection(&[pick], false).unwrap();
        resumed.submit_selection(&[pick], false).unwrap();
        assert_eq!(resumed.current().unwrap(), session.current().unwrap());
    }

    #[test]
    fn test_restore_rejects_other_model() {
        let session = Session::start(config(4, 5), adapter()).unwrap();
        let wider: Arc<dyn GenerativeAdapter> = Arc::new(ProjectionDecoder::new(16, 6, 6, 11));
        assert!(matches!(
            Session::restore(session.snapshot(), wider),
            Err(IdkitError::Initialization(_))
        ));
    }

    fn reference_images(adapter: &Arc<dyn GenerativeAdapter>, n: usize) -> Vec<ReferenceImage> {
        let mut rng = StdRng::seed_from_u64(31);
        (0..n)
            .map(|i| {
                let z = adapter.sample_prior(&mut rng).unwrap();
                let v = LatentVector::with_fresh_id(&mut rng, z, Lineage::genesis());
                ReferenceImage {
                    label: format!("mugshot-{}", i),
                    attributes: Attributes::default(),
                    image: adapter.decode(&v).unwrap(),
                }
            })
            .collect()
    }

    #[test]
    fn test_start_from_references() {
        let adapter = adapter();
        let refs = reference_images(&adapter, 3);
        let chosen: Vec<&ReferenceImage> = refs.iter().collect();
        let mut config = config(5, 4);
        config.variation.prune_outliers = false;
        let mut session =
            Session::start_from_references(config, Arc::clone(&adapter), &chosen).unwrap();

        let round0: Vec<LatentVector> = session.current().unwrap().vectors().cloned().collect();
        let from_refs = round0
            .iter()
            .filter(|v| matches!(v.lineage().origin, Origin::Reference { .. }))
            .count();
        assert_eq!(from_refs, 3);
        assert!(round0[3..].iter().all(|v| v.lineage().is_prior()));

        // the encoded reference decodes back to its photo
        let image = adapter.decode(&round0[0]).unwrap();
        let drift = image
            .pixels()
            .iter()
            .zip(refs[0].image.pixels())
            .map(|(a, b)| (*a as i32 - *b as i32).abs())
            .max()
            .unwrap();
        assert!(drift <= 4, "pixel drift {}", drift);

        session.submit_selection(&[round0[0].id()], false).unwrap();
        let children: Vec<_> = session
            .current()
            .unwrap()
            .vectors()
            .filter(|v| v.id() != round0[0].id())
            .map(|v| v.lineage().parent_ids())
            .collect();
        assert!(children.iter().all(|parents| parents == &vec![round0[0].id()]));

        let restored = Session::restore(session.snapshot(), adapter).unwrap();
        assert_eq!(restored.history(), session.history());
    }

    #[test]
    fn test_no_references_same_as_prior_start() {
        let plain = Session::start(config(4, 5), adapter()).unwrap();
        let seeded = Session::start_from_references(config(4, 5), adapter(), &[]).unwrap();
        assert_eq!(plain.current().unwrap(), seeded.current().unwrap());
    }
}
