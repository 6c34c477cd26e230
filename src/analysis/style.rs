//! Style model - derived summary of the user's typing preferences
//!
//! Recomputed in full on every keystroke from the pattern registry and the
//! rhythm tracker. Has no lifecycle beyond "current snapshot".

use crate::analysis::detector::{DetectedPattern, PatternDetector};
use crate::analysis::interval::NoteDuration;
use crate::analysis::rhythm::RhythmTracker;

/// Complexity class derived from mean preferred-pattern length
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ComplexityClass {
    Simple,
    Medium,
    Complex,
}

/// A preferred pattern reference inside the style model
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PreferredPattern {
    pub content: String,
    pub score: f64,
}

/// Derived snapshot of the user's current style
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StyleModel {
    /// Top preferred patterns, strongest first
    pub preferred_patterns: Vec<PreferredPattern>,
    /// Running average tempo in BPM
    pub average_tempo_bpm: f64,
    /// Complexity class from mean preferred-pattern length
    pub complexity: ComplexityClass,
    /// Most common note-duration category across all rhythm signatures
    pub preferred_rhythm: Option<NoteDuration>,
}

impl Default for StyleModel {
    fn default() -> Self {
        Self {
            preferred_patterns: Vec::new(),
            average_tempo_bpm: 120.0,
            complexity: ComplexityClass::Simple,
            preferred_rhythm: None,
        }
    }
}

impl StyleModel {
    /// Recompute the style model from current engine state
    pub fn compute(detector: &PatternDetector, rhythm: &RhythmTracker) -> Self {
        let top = detector.top_patterns(10);
        let preferred_patterns: Vec<PreferredPattern> = top
            .iter()
            .map(|pattern| PreferredPattern {
                content: pattern.content.clone(),
                score: pattern.score,
            })
            .collect();

        Self {
            complexity: complexity_of(&top),
            preferred_patterns,
            average_tempo_bpm: rhythm.running_tempo_bpm(),
            preferred_rhythm: preferred_rhythm(rhythm),
        }
    }
}

/// Complexity from mean length: below 3 simple, above 6 complex
fn complexity_of(patterns: &[&DetectedPattern]) -> ComplexityClass {
    if patterns.is_empty() {
        return ComplexityClass::Simple;
    }
    let mean_length =
        patterns.iter().map(|p| p.length as f64).sum::<f64>() / patterns.len() as f64;
    if mean_length < 3.0 {
        ComplexityClass::Simple
    } else if mean_length > 6.0 {
        ComplexityClass::Complex
    } else {
        ComplexityClass::Medium
    }
}

/// Arg-max over all categories flattened from every tracked signature
///
/// Ties break by `NoteDuration` declaration order so the result is
/// deterministic for a given input sequence.
fn preferred_rhythm(rhythm: &RhythmTracker) -> Option<NoteDuration> {
    const ORDER: [NoteDuration; 7] = [
        NoteDuration::Whole,
        NoteDuration::Half,
        NoteDuration::Quarter,
        NoteDuration::Eighth,
        NoteDuration::Sixteenth,
        NoteDuration::ThirtySecond,
        NoteDuration::Rest,
    ];

    let mut counts = [0u32; 7];
    for signature in rhythm.signatures() {
        for category in &signature.categories {
            let index = ORDER
                .iter()
                .position(|c| c == category)
                .unwrap_or(ORDER.len() - 1);
            counts[index] += 1;
        }
    }

    let best = counts.iter().enumerate().max_by(|a, b| {
        a.1.cmp(b.1)
            // max_by keeps the later element on ties; reverse the index
            // comparison so the earlier declaration wins
            .then_with(|| b.0.cmp(&a.0))
    })?;
    if *best.1 == 0 {
        return None;
    }
    Some(ORDER[best.0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Keystroke;
    use crate::config::{DetectorConfig, RhythmConfig};

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    fn window(text: &str, interval_ms: u64) -> Vec<Keystroke> {
        text.chars()
            .enumerate()
            .map(|(i, character)| Keystroke {
                character,
                timestamp_ms: i as u64 * interval_ms,
                delta_ms: if i == 0 { 0 } else { interval_ms },
                beat_position: 0.0,
            })
            .collect()
    }

    #[test]
    fn test_default_model() {
        let model = StyleModel::default();
        assert!(model.preferred_patterns.is_empty());
        assert_eq!(model.complexity, ComplexityClass::Simple);
        assert!(model.preferred_rhythm.is_none());
    }

    #[test]
    fn test_compute_reflects_registry() {
        let mut detector = PatternDetector::new(DetectorConfig::default());
        detector.run_pass(&chars("nana"), 0, None);
        detector.run_pass(&chars("nananana"), 5_000, None);
        let rhythm = RhythmTracker::new(RhythmConfig::default());

        let model = StyleModel::compute(&detector, &rhythm);
        assert!(model
            .preferred_patterns
            .iter()
            .any(|p| p.content == "na"));
        // Registry holds "na" (len 2) and "nana" (len 4): mean 3.0
        assert_eq!(model.complexity, ComplexityClass::Medium);
        assert!((model.average_tempo_bpm - 120.0).abs() < 1e-9);
    }

    #[test]
    fn test_preferred_patterns_sorted_descending() {
        let mut detector = PatternDetector::new(DetectorConfig::default());
        detector.run_pass(&chars("nanapopo"), 0, None);
        detector.run_pass(&chars("nananana"), 5_000, None);
        let rhythm = RhythmTracker::new(RhythmConfig::default());

        let model = StyleModel::compute(&detector, &rhythm);
        for pair in model.preferred_patterns.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_preferred_rhythm_is_mode() {
        let detector = PatternDetector::new(DetectorConfig::default());
        let mut rhythm = RhythmTracker::new(RhythmConfig::default());
        // 500ms at the initial 120 BPM: all quarters
        rhythm.observe(&window("qsedqsed", 500), 3_500);

        let model = StyleModel::compute(&detector, &rhythm);
        assert_eq!(model.preferred_rhythm, Some(NoteDuration::Quarter));
    }

    #[test]
    fn test_no_rhythm_data_gives_none() {
        let detector = PatternDetector::new(DetectorConfig::default());
        let rhythm = RhythmTracker::new(RhythmConfig::default());
        let model = StyleModel::compute(&detector, &rhythm);
        assert!(model.preferred_rhythm.is_none());
    }
}
