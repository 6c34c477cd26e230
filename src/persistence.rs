//! Snapshot persistence - save and restore the learned engine state
//!
//! The snapshot carries the pattern registry, learned patterns, rhythm
//! signatures, tempo history, and style model as versioned JSON. Loading
//! is forgiving: a missing or corrupt file falls back to an empty
//! snapshot so the engine always starts, while the failure is logged and
//! available as a `Result` for callers that care.

use std::fs;
use std::path::Path;

use crate::analysis::detector::{DetectedPattern, LearnedPattern};
use crate::analysis::rhythm::RhythmSignature;
use crate::analysis::style::StyleModel;
use crate::error::{log_persistence_error, PersistenceError};

/// Current snapshot schema version
pub const SNAPSHOT_VERSION: u32 = 1;

/// Serializable engine state
///
/// The live keystroke history and session counters are deliberately not
/// part of the snapshot; only accumulated knowledge is persisted.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EngineSnapshot {
    pub version: u32,
    /// Timestamp the snapshot was taken (ms)
    pub saved_at_ms: u64,
    pub patterns: Vec<DetectedPattern>,
    pub learned: Vec<LearnedPattern>,
    pub rhythms: Vec<RhythmSignature>,
    pub tempo_history: Vec<f64>,
    pub style: StyleModel,
}

impl EngineSnapshot {
    /// A fresh snapshot with no accumulated state
    pub fn empty(saved_at_ms: u64) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            saved_at_ms,
            patterns: Vec::new(),
            learned: Vec::new(),
            rhythms: Vec::new(),
            tempo_history: Vec::new(),
            style: StyleModel::default(),
        }
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, PersistenceError> {
        serde_json::to_string_pretty(self).map_err(|err| PersistenceError::WriteFailed {
            reason: err.to_string(),
        })
    }

    /// Deserialize from JSON, rejecting unknown schema versions
    pub fn from_json(json: &str) -> Result<Self, PersistenceError> {
        let snapshot: Self =
            serde_json::from_str(json).map_err(|err| PersistenceError::ParseFailed {
                reason: err.to_string(),
            })?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(PersistenceError::UnsupportedVersion {
                found: snapshot.version,
                supported: SNAPSHOT_VERSION,
            });
        }
        Ok(snapshot)
    }
}

/// Write a snapshot to disk as JSON
pub fn save_to_file<P: AsRef<Path>>(
    path: P,
    snapshot: &EngineSnapshot,
) -> Result<(), PersistenceError> {
    let json = snapshot.to_json()?;
    fs::write(&path, json).map_err(|err| {
        let error = PersistenceError::WriteFailed {
            reason: format!("{:?}: {}", path.as_ref(), err),
        };
        log_persistence_error(&error, "save_to_file");
        error
    })?;
    log::info!(
        "[Persistence] Saved snapshot to {:?} ({} patterns, {} learned)",
        path.as_ref(),
        snapshot.patterns.len(),
        snapshot.learned.len()
    );
    Ok(())
}

/// Read a snapshot from disk, with strict error reporting
pub fn try_load_from_file<P: AsRef<Path>>(path: P) -> Result<EngineSnapshot, PersistenceError> {
    let contents = fs::read_to_string(&path).map_err(|err| PersistenceError::ReadFailed {
        reason: format!("{:?}: {}", path.as_ref(), err),
    })?;
    EngineSnapshot::from_json(&contents)
}

/// Read a snapshot from disk, falling back to an empty state
///
/// Any failure (missing file, bad JSON, wrong version) is logged and
/// replaced with `EngineSnapshot::empty`, so first launch and recovery
/// from a corrupt file look the same to the engine.
pub fn load_from_file<P: AsRef<Path>>(path: P) -> EngineSnapshot {
    match try_load_from_file(&path) {
        Ok(snapshot) => {
            log::info!(
                "[Persistence] Loaded snapshot from {:?} ({} patterns, {} learned)",
                path.as_ref(),
                snapshot.patterns.len(),
                snapshot.learned.len()
            );
            snapshot
        }
        Err(err) => {
            log_persistence_error(&err, "load_from_file");
            log::warn!(
                "[Persistence] Falling back to empty state for {:?}",
                path.as_ref()
            );
            EngineSnapshot::empty(0)
        }
    }
}
