//! Interval classifier - note-duration categories for keystroke gaps
//!
//! Maps a raw millisecond gap between two keystrokes to a discrete musical
//! note-duration category, scaled from the quarter-note duration at a
//! caller-supplied tempo. Gaps longer than two quarter notes classify as a
//! rest regardless of which ratio is nearest.

/// Note-duration category for a single inter-keystroke gap
///
/// Declaration order is the deterministic tie-break order used when picking
/// the most common category across rhythm signatures.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum NoteDuration {
    Whole,
    Half,
    Quarter,
    Eighth,
    Sixteenth,
    ThirtySecond,
    /// Gap exceeded 2x the quarter-note duration
    Rest,
}

impl NoteDuration {
    /// Stable lowercase name used in rhythm signature keys
    pub fn as_str(&self) -> &'static str {
        match self {
            NoteDuration::Whole => "whole",
            NoteDuration::Half => "half",
            NoteDuration::Quarter => "quarter",
            NoteDuration::Eighth => "eighth",
            NoteDuration::Sixteenth => "sixteenth",
            NoteDuration::ThirtySecond => "thirtysecond",
            NoteDuration::Rest => "rest",
        }
    }

    /// Duration multiplier relative to a quarter note
    fn quarter_multiple(&self) -> f64 {
        match self {
            NoteDuration::Whole => 4.0,
            NoteDuration::Half => 2.0,
            NoteDuration::Quarter => 1.0,
            NoteDuration::Eighth => 0.5,
            NoteDuration::Sixteenth => 0.25,
            NoteDuration::ThirtySecond => 0.125,
            NoteDuration::Rest => 2.0,
        }
    }
}

/// Candidate categories checked by ratio distance, best-match order is
/// irrelevant since distances are strictly compared.
const CANDIDATES: [NoteDuration; 6] = [
    NoteDuration::Whole,
    NoteDuration::Half,
    NoteDuration::Quarter,
    NoteDuration::Eighth,
    NoteDuration::Sixteenth,
    NoteDuration::ThirtySecond,
];

/// Classify a gap in milliseconds at the given tempo
///
/// Computes the quarter-note duration at `tempo_bpm`, then the ratio of the
/// gap to each canonical note duration, and picks the category whose ratio
/// is closest to 1.0. A gap longer than 2x the quarter note is always a
/// rest. Never fails; a non-positive tempo falls back to 120 BPM.
pub fn classify_interval(gap_ms: f64, tempo_bpm: f64) -> NoteDuration {
    let tempo = if tempo_bpm > 0.0 { tempo_bpm } else { 120.0 };
    let quarter_ms = 60_000.0 / tempo;

    // Rest takes priority over the ratio match
    if gap_ms > 2.0 * quarter_ms {
        return NoteDuration::Rest;
    }

    let mut best = NoteDuration::Quarter;
    let mut best_distance = f64::INFINITY;
    for candidate in CANDIDATES {
        let duration_ms = quarter_ms * candidate.quarter_multiple();
        let distance = (gap_ms / duration_ms - 1.0).abs();
        if distance < best_distance {
            best_distance = distance;
            best = candidate;
        }
    }
    best
}
