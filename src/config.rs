//! Configuration management for dynamic parameter tuning
//!
//! This module provides runtime configuration loading from JSON files,
//! enabling fast iteration without recompilation. Detector thresholds,
//! window sizes, and suggestion limits can be adjusted via the config
//! file for rapid experimentation.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Complete engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub detector: DetectorConfig,
    pub rhythm: RhythmConfig,
    pub suggestions: SuggestionConfig,
}

/// Pattern detector parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Keystroke history buffer capacity (oldest evicted first)
    pub history_capacity: usize,
    /// Number of most recent keystrokes scanned per analysis pass
    pub analysis_window: usize,
    /// Minimum candidate pattern length in characters
    pub min_pattern_length: usize,
    /// Maximum candidate pattern length in characters
    pub max_pattern_length: usize,
    /// Registry score threshold for "interesting" patterns
    pub score_threshold: f64,
    /// Minimum quality score for a candidate to be registered
    pub min_quality: f64,
    /// Maximum registry entries kept; lowest score evicted on overflow
    pub max_registry_entries: usize,
    /// Seconds a pattern may go unseen before it is eligible for eviction
    pub gc_unseen_secs: f64,
    /// Patterns with cumulative frequency below this are eligible for eviction
    pub gc_min_frequency: u32,
    /// Maximum learned patterns retained (weakest evicted on overflow)
    pub max_learned_patterns: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            history_capacity: 1000,
            analysis_window: 32,
            min_pattern_length: 2,
            max_pattern_length: 64,
            score_threshold: 1.5,
            min_quality: 0.3,
            max_registry_entries: 256,
            gc_unseen_secs: 30.0,
            gc_min_frequency: 3,
            max_learned_patterns: 50,
        }
    }
}

/// Rhythm tracking parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RhythmConfig {
    /// Number of most recent keystrokes used for rhythm analysis
    pub rhythm_window: usize,
    /// Initial tempo estimate in BPM before any samples arrive
    pub initial_tempo_bpm: f64,
    /// Bounded tempo-sample history size (FIFO)
    pub tempo_history_capacity: usize,
    /// Average interval below this marks a single-key hold as spam (ms)
    pub hold_spam_interval_ms: f64,
    /// Intervals below this count toward the mashing ratio (ms)
    pub mash_interval_ms: f64,
    /// Fraction of sub-threshold intervals that flags mashing
    pub mash_ratio: f64,
}

impl Default for RhythmConfig {
    fn default() -> Self {
        Self {
            rhythm_window: 16,
            initial_tempo_bpm: 120.0,
            tempo_history_capacity: 20,
            hold_spam_interval_ms: 50.0,
            mash_interval_ms: 80.0,
            mash_ratio: 0.7,
        }
    }
}

/// Suggestion generator parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionConfig {
    /// Number of top preferred patterns that seed suggestions
    pub seed_patterns: usize,
    /// Hard cap on suggestions returned per pass
    pub max_suggestions: usize,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            seed_patterns: 3,
            max_suggestions: 5,
        }
    }
}

impl Default for EngineConfig {
    /// Default configuration values (fallback if config file not found)
    fn default() -> Self {
        Self {
            detector: DetectorConfig::default(),
            rhythm: RhythmConfig::default(),
            suggestions: SuggestionConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// Loaded configuration, or defaults if the file is missing or invalid.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }
}
