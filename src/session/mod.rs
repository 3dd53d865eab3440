//! Session — controller, history ledger, and on-disk snapshots

mod controller;
mod history;
mod persist;

pub use controller::{round_rng, RoundOutcome, Session, SessionState};
pub use history::{HistoryEntry, HistoryLog};
pub use persist::{SessionSnapshot, SNAPSHOT_FORMAT_VERSION};
