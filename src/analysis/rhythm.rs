//! Rhythm tracker - note-duration signatures and tempo estimation
//!
//! Converts keystroke timing into a sequence of note-duration categories (a
//! rhythm signature), aggregates repeated signatures, and maintains a
//! running tempo estimate from a bounded history of per-window samples.
//! Signatures accumulate for the whole session; they are never collected.

use std::collections::HashMap;
use std::collections::VecDeque;

use crate::analysis::interval::{classify_interval, NoteDuration};
use crate::analysis::spam;
use crate::analysis::Keystroke;
use crate::config::RhythmConfig;

/// An aggregated rhythm signature keyed by its joined category sequence
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RhythmSignature {
    /// Ordered note-duration categories, one per inter-key gap
    pub categories: Vec<NoteDuration>,
    /// Times this exact signature has been observed
    pub frequency: u32,
    /// Mean interval of the latest observation window (overwritten each pass)
    pub average_interval_ms: f64,
    /// Timestamp of the most recent observation (ms)
    pub last_seen_ms: u64,
}

impl RhythmSignature {
    /// Stable registry key: category names joined with '-'
    pub fn key_of(categories: &[NoteDuration]) -> String {
        categories
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join("-")
    }

    pub fn key(&self) -> String {
        Self::key_of(&self.categories)
    }
}

/// Tracks rhythm signatures and the running tempo estimate
pub struct RhythmTracker {
    config: RhythmConfig,
    signatures: HashMap<String, RhythmSignature>,
    /// Bounded FIFO of per-window tempo samples (BPM)
    tempo_history: VecDeque<f64>,
    /// Signature key observed on the most recent non-spam pass
    last_signature: Option<String>,
}

impl RhythmTracker {
    pub fn new(config: RhythmConfig) -> Self {
        Self {
            config,
            signatures: HashMap::new(),
            tempo_history: VecDeque::new(),
            last_signature: None,
        }
    }

    /// Current running tempo: mean of the sample history, or the initial
    /// tempo before any samples arrive
    pub fn running_tempo_bpm(&self) -> f64 {
        if self.tempo_history.is_empty() {
            self.config.initial_tempo_bpm
        } else {
            self.tempo_history.iter().sum::<f64>() / self.tempo_history.len() as f64
        }
    }

    /// Observe the latest keystroke window and update the registry
    ///
    /// Skips entirely when the window is too short or flagged as rhythm
    /// spam. Returns the signature key recorded for this pass.
    pub fn observe(&mut self, window: &[Keystroke], now_ms: u64) -> Option<String> {
        if window.len() < 2 {
            return None;
        }
        if spam::is_rhythm_spam(
            window,
            self.config.hold_spam_interval_ms,
            self.config.mash_interval_ms,
            self.config.mash_ratio,
        ) {
            log::debug!("[Rhythm] Window flagged as spam, skipping analysis");
            return None;
        }

        let intervals: Vec<f64> = window
            .windows(2)
            .map(|pair| pair[1].timestamp_ms.saturating_sub(pair[0].timestamp_ms) as f64)
            .collect();
        let tempo = self.running_tempo_bpm();
        let categories: Vec<NoteDuration> = intervals
            .iter()
            .map(|&gap| classify_interval(gap, tempo))
            .collect();

        let mean_interval = intervals.iter().sum::<f64>() / intervals.len() as f64;
        let key = RhythmSignature::key_of(&categories);

        let entry = self
            .signatures
            .entry(key.clone())
            .or_insert_with(|| RhythmSignature {
                categories,
                frequency: 0,
                average_interval_ms: 0.0,
                last_seen_ms: now_ms,
            });
        entry.frequency += 1;
        entry.average_interval_ms = mean_interval;
        entry.last_seen_ms = now_ms;

        self.push_tempo_sample(mean_interval);
        self.last_signature = Some(key.clone());
        Some(key)
    }

    /// Update the tempo estimate, treating the window mean as one quarter
    /// note: estimated BPM = 60000 / (mean x 4)
    fn push_tempo_sample(&mut self, mean_interval_ms: f64) {
        if mean_interval_ms <= 0.0 {
            return;
        }
        let estimate = 60_000.0 / (mean_interval_ms * 4.0);
        if self.tempo_history.len() == self.config.tempo_history_capacity {
            self.tempo_history.pop_front();
        }
        self.tempo_history.push_back(estimate);
    }

    /// Signature key from the most recent non-spam observation
    pub fn last_signature(&self) -> Option<&str> {
        self.last_signature.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<&RhythmSignature> {
        self.signatures.get(key)
    }

    pub fn signature_count(&self) -> usize {
        self.signatures.len()
    }

    /// All tracked signatures (unsorted)
    pub fn signatures(&self) -> impl Iterator<Item = &RhythmSignature> {
        self.signatures.values()
    }

    /// Most frequent signatures first, key as deterministic tie-break
    pub fn top_signatures(&self, limit: usize) -> Vec<RhythmSignature> {
        let mut all: Vec<RhythmSignature> = self.signatures.values().cloned().collect();
        all.sort_by(|a, b| {
            b.frequency
                .cmp(&a.frequency)
                .then_with(|| a.key().cmp(&b.key()))
        });
        all.truncate(limit);
        all
    }

    /// Replace tracker state from a restored snapshot
    pub fn load_state(&mut self, signatures: Vec<RhythmSignature>, tempo_history: Vec<f64>) {
        self.signatures = signatures
            .into_iter()
            .map(|signature| (signature.key(), signature))
            .collect();
        self.tempo_history = tempo_history
            .into_iter()
            .take(self.config.tempo_history_capacity)
            .collect();
        self.last_signature = None;
    }

    /// Clone signatures for a snapshot, deterministic order
    pub fn export_signatures(&self) -> Vec<RhythmSignature> {
        let mut all: Vec<RhythmSignature> = self.signatures.values().cloned().collect();
        all.sort_by_key(|signature| signature.key());
        all
    }

    pub fn export_tempo_history(&self) -> Vec<f64> {
        self.tempo_history.iter().copied().collect()
    }
}
