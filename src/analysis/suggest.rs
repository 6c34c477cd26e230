//! Suggestion generator - advisory pattern and rhythm variations
//!
//! Produces a small set of proposed variations from the current style
//! model. Suggestions are display-only: nothing downstream scores or
//! stores them. Strategy selection is uniform-random over an enumerated
//! set, with the random source injected so tests can pin the seed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::analysis::rhythm::RhythmSignature;
use crate::analysis::style::StyleModel;
use crate::config::SuggestionConfig;

/// What a suggestion proposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SuggestionKind {
    /// Play the seed pattern twice in a row
    Extend,
    /// A mutated form of the seed pattern
    Variation,
    /// A tempo or phrasing change to a known rhythm signature
    RhythmVariation,
}

/// One advisory suggestion for the player
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Suggestion {
    pub kind: SuggestionKind,
    /// Proposed character sequence, or a signature key for rhythm variations
    pub content: String,
    /// The pattern content or signature key the suggestion was derived from
    pub based_on: String,
}

/// Pattern variation strategies, chosen uniformly at random
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VariationStrategy {
    Reversed,
    Doubled,
    AppendRecent,
    Substitute,
}

const VARIATION_STRATEGIES: [VariationStrategy; 4] = [
    VariationStrategy::Reversed,
    VariationStrategy::Doubled,
    VariationStrategy::AppendRecent,
    VariationStrategy::Substitute,
];

/// Rhythm variation strategies, chosen uniformly at random
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RhythmStrategy {
    SpeedUp,
    SlowDown,
    Syncopate,
}

const RHYTHM_STRATEGIES: [RhythmStrategy; 3] = [
    RhythmStrategy::SpeedUp,
    RhythmStrategy::SlowDown,
    RhythmStrategy::Syncopate,
];

/// Generates suggestions from the style model on each analysis pass
pub struct SuggestionGenerator {
    config: SuggestionConfig,
    rng: StdRng,
}

impl SuggestionGenerator {
    pub fn new(config: SuggestionConfig) -> Self {
        Self {
            config,
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic generator for tests and replay
    pub fn with_seed(config: SuggestionConfig, seed: u64) -> Self {
        Self {
            config,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Build the suggestion list for the current pass
    ///
    /// For each of the top seed patterns: one extend suggestion plus one
    /// random variation. One rhythm variation from the top signature comes
    /// last. The list is capped at the configured maximum, pattern
    /// suggestions first.
    pub fn generate(
        &mut self,
        style: &StyleModel,
        recent_chars: &[char],
        top_rhythm: Option<&RhythmSignature>,
    ) -> Vec<Suggestion> {
        let mut suggestions = Vec::new();

        for preferred in style.preferred_patterns.iter().take(self.config.seed_patterns) {
            let seed = &preferred.content;
            suggestions.push(Suggestion {
                kind: SuggestionKind::Extend,
                content: format!("{}{}", seed, seed),
                based_on: seed.clone(),
            });
            suggestions.push(Suggestion {
                kind: SuggestionKind::Variation,
                content: self.vary_pattern(seed, recent_chars),
                based_on: seed.clone(),
            });
        }

        if let Some(signature) = top_rhythm {
            let strategy = RHYTHM_STRATEGIES[self.rng.gen_range(0..RHYTHM_STRATEGIES.len())];
            let key = signature.key();
            suggestions.push(Suggestion {
                kind: SuggestionKind::RhythmVariation,
                content: vary_rhythm(&key, strategy),
                based_on: key,
            });
        }

        suggestions.truncate(self.config.max_suggestions);
        suggestions
    }

    fn vary_pattern(&mut self, seed: &str, recent_chars: &[char]) -> String {
        let strategy = VARIATION_STRATEGIES[self.rng.gen_range(0..VARIATION_STRATEGIES.len())];
        match strategy {
            VariationStrategy::Reversed => seed.chars().rev().collect(),
            VariationStrategy::Doubled => format!("{}{}", seed, seed),
            VariationStrategy::AppendRecent => {
                let mut varied = seed.to_string();
                varied.push(self.pick_recent(recent_chars, seed));
                varied
            }
            VariationStrategy::Substitute => {
                let mut chars: Vec<char> = seed.chars().collect();
                if chars.is_empty() {
                    return String::new();
                }
                let position = self.rng.gen_range(0..chars.len());
                chars[position] = self.pick_recent(recent_chars, seed);
                chars.into_iter().collect()
            }
        }
    }

    /// A random character from recent history, falling back to the seed's
    /// own first character when the history is empty
    fn pick_recent(&mut self, recent_chars: &[char], seed: &str) -> char {
        if recent_chars.is_empty() {
            seed.chars().next().unwrap_or('a')
        } else {
            recent_chars[self.rng.gen_range(0..recent_chars.len())]
        }
    }
}

/// Describe a rhythm variation as `<strategy>:<signature key>`
fn vary_rhythm(key: &str, strategy: RhythmStrategy) -> String {
    match strategy {
        RhythmStrategy::SpeedUp => format!("faster:{}", key),
        RhythmStrategy::SlowDown => format!("slower:{}", key),
        RhythmStrategy::Syncopate => format!("syncopated:{}-rest", key),
    }
}
