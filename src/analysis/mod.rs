// Analysis module - per-keystroke pattern recognition pipeline
//
// This module orchestrates the complete analysis pipeline, processing
// keystroke events from the game loop and generating scored pattern
// registries and style summaries for the UI layer.
//
// Architecture:
// - Pipeline: PatternDetector → HierarchyBuilder → RhythmTracker → StyleModel → SuggestionGenerator
// - Input: one Keystroke per pass, serialized by the caller
// - Output: AnalysisSnapshot read by the game between events

pub mod detector;
pub mod hierarchy;
pub mod interval;
pub mod rhythm;
pub mod spam;
pub mod style;
pub mod suggest;

pub use detector::{DetectedPattern, LearnedPattern, PatternCategory, PatternDetector};
pub use hierarchy::{build_hierarchy, PatternRelation};
pub use interval::{classify_interval, NoteDuration};
pub use rhythm::{RhythmSignature, RhythmTracker};
pub use style::{ComplexityClass, StyleModel};
pub use suggest::{Suggestion, SuggestionGenerator, SuggestionKind};

/// A single recorded keystroke event
///
/// Immutable once recorded. Timestamps are caller-supplied monotonic
/// milliseconds; `delta_ms` is 0 for the first keystroke in the history.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Keystroke {
    /// Lowercase-normalized character (caller normalizes case)
    pub character: char,
    /// Monotonic timestamp in milliseconds
    pub timestamp_ms: u64,
    /// Milliseconds since the previous keystroke (0 if first)
    pub delta_ms: u64,
    /// Musical beat position in [0, 1), supplied by the caller for display
    pub beat_position: f32,
}

/// Running totals maintained by the engine across all passes
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EngineCounters {
    /// Keystrokes accepted into the history buffer
    pub keystrokes: u64,
    /// Full analysis passes completed
    pub passes: u64,
    /// Registry insert/update events that passed all gates
    pub patterns_registered: u64,
    /// Registry entries removed by garbage collection or capacity eviction
    pub patterns_evicted: u64,
    /// Candidate substrings rejected by the spam filter
    pub spam_rejections: u64,
    /// Suggestions handed back to the caller
    pub suggestions_emitted: u64,
}

/// Read-only snapshot of the engine state for rendering
///
/// Returned by `PatternEngine::current_analysis`. All vectors are sorted
/// deterministically so repeated queries between keystrokes are stable.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AnalysisSnapshot {
    /// Strongest detected patterns above the score threshold, best first
    pub top_patterns: Vec<DetectedPattern>,
    /// Strongest parent/child containment relations, best first
    pub top_relations: Vec<PatternRelation>,
    /// Most frequent rhythm signatures, best first
    pub top_rhythms: Vec<RhythmSignature>,
    /// Current derived style model
    pub style: StyleModel,
    /// Suggestions computed on the most recent pass
    pub suggestions: Vec<Suggestion>,
    /// Running totals across the session
    pub counters: EngineCounters,
}
