//! Pattern engine - the single entry point driving the analysis pipeline
//!
//! Owns the keystroke history and every analysis component. One call to
//! `record_keystroke` runs a complete pass (detector, hierarchy, rhythm,
//! style, suggestions) before returning, so callers that serialize their
//! input never observe a partially updated registry. All state is
//! exclusively owned here; readers only see cloned snapshots.

use std::collections::VecDeque;

use crate::analysis::detector::PatternDetector;
use crate::analysis::hierarchy::{self, PatternRelation};
use crate::analysis::rhythm::RhythmTracker;
use crate::analysis::style::StyleModel;
use crate::analysis::suggest::{Suggestion, SuggestionGenerator};
use crate::analysis::{AnalysisSnapshot, EngineCounters, Keystroke};
use crate::config::EngineConfig;
use crate::persistence::EngineSnapshot;

/// How many entries each snapshot list carries
const TOP_PATTERNS: usize = 10;
const TOP_RELATIONS: usize = 10;
const TOP_RHYTHMS: usize = 5;

/// Real-time pattern recognition engine
pub struct PatternEngine {
    config: EngineConfig,
    /// Bounded keystroke history, oldest first
    history: VecDeque<Keystroke>,
    detector: PatternDetector,
    /// Containment relations rebuilt on every pass
    relations: Vec<PatternRelation>,
    rhythm: RhythmTracker,
    style: StyleModel,
    /// Suggestions from the most recent pass
    suggestions: Vec<Suggestion>,
    suggester: SuggestionGenerator,
    counters: EngineCounters,
}

impl PatternEngine {
    pub fn new(config: EngineConfig) -> Self {
        let suggester = SuggestionGenerator::new(config.suggestions.clone());
        Self::build(config, suggester)
    }

    /// Engine with a seeded suggestion RNG, for tests and replay
    pub fn with_seed(config: EngineConfig, seed: u64) -> Self {
        let suggester = SuggestionGenerator::with_seed(config.suggestions.clone(), seed);
        Self::build(config, suggester)
    }

    fn build(config: EngineConfig, suggester: SuggestionGenerator) -> Self {
        Self {
            detector: PatternDetector::new(config.detector.clone()),
            rhythm: RhythmTracker::new(config.rhythm.clone()),
            history: VecDeque::with_capacity(config.detector.history_capacity),
            relations: Vec::new(),
            style: StyleModel::default(),
            suggestions: Vec::new(),
            suggester,
            counters: EngineCounters::default(),
            config,
        }
    }

    /// Record one keystroke and run a full analysis pass
    ///
    /// `character` must already be lowercase-normalized by the caller.
    /// `timestamp_ms` is caller-supplied monotonic time; `beat_position`
    /// is an optional musical context carried through for display.
    /// Returns the suggestions computed on this pass.
    pub fn record_keystroke(
        &mut self,
        character: char,
        timestamp_ms: u64,
        beat_position: Option<f32>,
    ) -> Vec<Suggestion> {
        let delta_ms = self
            .history
            .back()
            .map(|previous| timestamp_ms.saturating_sub(previous.timestamp_ms))
            .unwrap_or(0);
        if self.history.len() == self.config.detector.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(Keystroke {
            character,
            timestamp_ms,
            delta_ms,
            beat_position: beat_position.unwrap_or(0.0),
        });
        self.counters.keystrokes += 1;

        // Detector pass over the most recent characters, tagged with the
        // rhythm signature from the previous pass
        let window_chars = self.recent_chars(self.config.detector.analysis_window);
        let outcome = self.detector.run_pass(
            &window_chars,
            timestamp_ms,
            self.rhythm.last_signature(),
        );
        self.counters.patterns_registered += u64::from(outcome.registered);
        self.counters.patterns_evicted += u64::from(outcome.evicted);
        self.counters.spam_rejections += u64::from(outcome.spam_rejected);

        self.relations = hierarchy::build_hierarchy(&self.detector.entries_above_threshold());

        let rhythm_window = self.recent_keystrokes(self.config.rhythm.rhythm_window);
        self.rhythm.observe(&rhythm_window, timestamp_ms);

        self.style = StyleModel::compute(&self.detector, &self.rhythm);

        let top_rhythms = self.rhythm.top_signatures(1);
        self.suggestions =
            self.suggester
                .generate(&self.style, &window_chars, top_rhythms.first());
        self.counters.suggestions_emitted += self.suggestions.len() as u64;
        self.counters.passes += 1;

        tracing::debug!(
            registered = outcome.registered,
            evicted = outcome.evicted,
            spam_rejected = outcome.spam_rejected,
            registry = self.detector.registry_len(),
            relations = self.relations.len(),
            "analysis pass complete"
        );

        self.suggestions.clone()
    }

    /// Read-only snapshot of the current analysis state
    pub fn current_analysis(&self) -> AnalysisSnapshot {
        AnalysisSnapshot {
            top_patterns: self
                .detector
                .top_patterns(TOP_PATTERNS)
                .into_iter()
                .cloned()
                .collect(),
            top_relations: hierarchy::top_relations(&self.relations, TOP_RELATIONS),
            top_rhythms: self.rhythm.top_signatures(TOP_RHYTHMS),
            style: self.style.clone(),
            suggestions: self.suggestions.clone(),
            counters: self.counters.clone(),
        }
    }

    /// Export persistent state for serialization
    pub fn export_state(&self, saved_at_ms: u64) -> EngineSnapshot {
        EngineSnapshot {
            version: crate::persistence::SNAPSHOT_VERSION,
            saved_at_ms,
            patterns: self.detector.export_patterns(),
            learned: self.detector.learned_patterns().to_vec(),
            rhythms: self.rhythm.export_signatures(),
            tempo_history: self.rhythm.export_tempo_history(),
            style: self.style.clone(),
        }
    }

    /// Restore persistent state from a deserialized snapshot
    ///
    /// The keystroke history, relations, and counters start fresh; they
    /// describe a live session, not the saved registry.
    pub fn load_state(&mut self, snapshot: EngineSnapshot) {
        self.detector.load_state(snapshot.patterns, snapshot.learned);
        self.rhythm.load_state(snapshot.rhythms, snapshot.tempo_history);
        self.style = snapshot.style;
        self.relations = hierarchy::build_hierarchy(&self.detector.entries_above_threshold());
        self.history.clear();
        self.suggestions.clear();
        self.counters = EngineCounters::default();
    }

    pub fn counters(&self) -> &EngineCounters {
        &self.counters
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    fn recent_chars(&self, limit: usize) -> Vec<char> {
        let skip = self.history.len().saturating_sub(limit);
        self.history.iter().skip(skip).map(|k| k.character).collect()
    }

    fn recent_keystrokes(&self, limit: usize) -> Vec<Keystroke> {
        let skip = self.history.len().saturating_sub(limit);
        self.history.iter().skip(skip).copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> PatternEngine {
        PatternEngine::with_seed(EngineConfig::default(), 7)
    }

    /// Type a string with a fixed inter-key interval, returning the final
    /// timestamp used
    fn type_text(engine: &mut PatternEngine, text: &str, start_ms: u64, interval_ms: u64) -> u64 {
        let mut ts = start_ms;
        for ch in text.chars() {
            engine.record_keystroke(ch, ts, None);
            ts += interval_ms;
        }
        ts - interval_ms
    }

    #[test]
    fn test_history_is_bounded() {
        let mut config = EngineConfig::default();
        config.detector.history_capacity = 8;
        let mut e = PatternEngine::with_seed(config, 7);
        for i in 0..20u64 {
            e.record_keystroke('q', i * 600, None);
        }
        assert_eq!(e.history_len(), 8);
        assert_eq!(e.counters().keystrokes, 20);
    }

    #[test]
    fn test_repeated_pattern_reaches_snapshot() {
        let mut e = engine();
        type_text(&mut e, "nananana", 0, 600);

        let snapshot = e.current_analysis();
        assert!(snapshot.top_patterns.iter().any(|p| p.content == "na"));
        assert_eq!(snapshot.counters.passes, 8);
    }

    #[test]
    fn test_single_key_mash_never_registers() {
        let mut e = engine();
        type_text(&mut e, "mmmmmmm", 0, 600);

        let snapshot = e.current_analysis();
        assert!(snapshot.top_patterns.is_empty());
    }

    #[test]
    fn test_suggestions_follow_detection() {
        let mut e = engine();
        let suggestions = {
            let mut last = Vec::new();
            let mut ts = 0;
            for ch in "nananana".chars() {
                last = e.record_keystroke(ch, ts, None);
                ts += 600;
            }
            last
        };
        assert!(!suggestions.is_empty());
        assert!(suggestions.iter().any(|s| s.based_on == "na"));
    }

    #[test]
    fn test_counters_accumulate() {
        let mut e = engine();
        type_text(&mut e, "nananana", 0, 600);
        let counters = e.counters();
        assert_eq!(counters.keystrokes, 8);
        assert_eq!(counters.passes, 8);
        assert!(counters.patterns_registered > 0);
    }

    #[test]
    fn test_state_roundtrip_preserves_registry() {
        let mut e = engine();
        type_text(&mut e, "nananana", 0, 600);
        let saved = e.export_state(10_000);

        let mut restored = engine();
        restored.load_state(saved);
        let snapshot = restored.current_analysis();
        assert!(snapshot.top_patterns.iter().any(|p| p.content == "na"));
        assert_eq!(restored.counters().keystrokes, 0);
    }

    #[test]
    fn test_beat_position_carried_through() {
        let mut e = engine();
        e.record_keystroke('q', 0, Some(0.25));
        assert_eq!(e.history_len(), 1);
    }
}
