//! Session snapshots — JSON on disk with integrity verification
//!
//! The file holds the snapshot and a SHA256 over its compact JSON form. The
//! random source is not stored: populations are drawn from a source derived
//! from the seed and round number, so the seed is enough to resume.

use super::controller::SessionState;
use super::history::HistoryLog;
use crate::config::SessionConfig;
use crate::error::{IdkitError, Result};
use crate::latent::LatentId;
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub format_version: u32,
    pub config: SessionConfig,
    pub seed: u64,
    pub state: SessionState,
    pub round: u32,
    /// Final candidate, for sessions that ended with one
    pub portrait: Option<LatentId>,
    pub history: HistoryLog,
    pub saved_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
struct SnapshotFile {
    checksum: String,
    snapshot: SessionSnapshot,
}

impl SessionSnapshot {
    /// SHA256 (hex) over the compact JSON encoding
    pub fn checksum(&self) -> Result<String> {
        let body = serde_json::to_string(self)?;
        Ok(hex::encode(Sha256::digest(body.as_bytes())))
    }

    pub fn to_json(&self) -> Result<String> {
        let file = SnapshotFile {
            checksum: self.checksum()?,
            snapshot: self.clone(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    /// Parse a snapshot and verify its checksum
    pub fn from_json(json: &str) -> Result<Self> {
        let file: SnapshotFile = serde_json::from_str(json)?;
        let checksum = file.snapshot.checksum()?;
        if checksum != file.checksum {
            return Err(IdkitError::Persistence(format!(
                "checksum mismatch: expected {}, got {}",
                file.checksum, checksum
            )));
        }
        Ok(file.snapshot)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = self.to_json()?;
        std::fs::write(path, &json)?;
        info!(
            "Saved session at round {} to {} ({} bytes)",
            self.round,
            path.display(),
            json.len()
        );
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| IdkitError::Persistence(format!("{}: {}", path.display(), e)))?;
        let snapshot = Self::from_json(&json)?;
        info!(
            "Loaded session from {}: round {}, checksum OK",
            path.display(),
            snapshot.round
        );
        Ok(snapshot)
    }
}
