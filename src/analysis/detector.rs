//! Pattern detector - repeated-substring detection over the rolling window
//!
//! Each analysis pass scans the most recent keystrokes for repeated
//! substrings of every admissible length, aggregates candidates by
//! (content, length), scores survivors, and maintains the time-decayed
//! pattern registry plus the bounded learned-pattern list.

use std::collections::HashMap;

use crate::analysis::spam;
use crate::config::DetectorConfig;

/// Composite registry key: pattern content plus its character length
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PatternKey {
    pub content: String,
    pub length: usize,
}

/// A pattern currently tracked by the registry
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DetectedPattern {
    /// Non-empty character sequence
    pub content: String,
    /// Length in characters
    pub length: usize,
    /// Cumulative count of observed repetitions (monotone while active)
    pub frequency: u32,
    /// Recomputed score; rises on detection, decays over time
    pub score: f64,
    /// Quality score in [0.1, 2.0]
    pub quality: f64,
    /// Timestamp of the first qualifying detection (ms)
    pub first_seen_ms: u64,
    /// Timestamp of the most recent detection (ms)
    pub last_seen_ms: u64,
    /// Rhythm signature active when the pattern was last updated
    pub rhythm_signature: Option<String>,
}

impl DetectedPattern {
    pub fn key(&self) -> PatternKey {
        PatternKey {
            content: self.content.clone(),
            length: self.length,
        }
    }
}

/// Style category assigned when a pattern is learned
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PatternCategory {
    Simple,
    Complex,
    Repetitive,
    Alternating,
    Varied,
}

/// A pattern promoted from the registry into the user-style model
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LearnedPattern {
    pub content: String,
    /// Timestamp of promotion (ms)
    pub learned_at_ms: u64,
    /// Registry score snapshot at learning time
    pub strength: f64,
    pub category: PatternCategory,
}

/// Per-pass bookkeeping fed into the engine counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassOutcome {
    /// Registry inserts/updates that passed all gates
    pub registered: u32,
    /// Entries removed by garbage collection or the capacity cap
    pub evicted: u32,
    /// Candidate substrings rejected by the spam filter
    pub spam_rejected: u32,
}

/// Detector state: the scored pattern registry and the learned-pattern list
pub struct PatternDetector {
    config: DetectorConfig,
    registry: HashMap<PatternKey, DetectedPattern>,
    learned: Vec<LearnedPattern>,
}

impl PatternDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            registry: HashMap::new(),
            learned: Vec::new(),
        }
    }

    /// Run one full analysis pass over the window
    ///
    /// `window` is the most recent keystrokes' characters (newest last),
    /// `now_ms` the triggering keystroke's timestamp, and
    /// `active_signature` the rhythm signature from the previous pass, if
    /// any, recorded on updated entries. Registry maintenance (eviction and
    /// time decay) runs on every pass regardless of what the scan finds.
    pub fn run_pass(
        &mut self,
        window: &[char],
        now_ms: u64,
        active_signature: Option<&str>,
    ) -> PassOutcome {
        let mut outcome = PassOutcome::default();

        let candidates = self.scan_window(window, &mut outcome);
        for ((content, length), repetitions) in candidates {
            if self.register(&content, length, repetitions, now_ms, active_signature) {
                outcome.registered += 1;
            }
        }

        outcome.evicted += self.collect_garbage(now_ms);
        self.decay_scores(now_ms);
        outcome.evicted += self.enforce_capacity();
        self.promote_learned(now_ms);

        outcome
    }

    /// Find repeated substrings, aggregated by (content, length)
    ///
    /// For each admissible length, a window of that width slides across the
    /// sequence; at each offset, consecutive non-overlapping repetitions of
    /// the exact substring are counted greedily, stopping at the first
    /// mismatch. Overlapping rediscoveries of the same content keep the
    /// highest repetition count.
    fn scan_window(
        &self,
        window: &[char],
        outcome: &mut PassOutcome,
    ) -> Vec<((String, usize), u32)> {
        let window_len = window.len();
        let max_len = self.config.max_pattern_length.min(window_len / 2);
        let mut aggregated: HashMap<(String, usize), u32> = HashMap::new();

        for length in self.config.min_pattern_length..=max_len {
            for start in 0..=window_len - length {
                let candidate = &window[start..start + length];
                if spam::is_spam(candidate) {
                    outcome.spam_rejected += 1;
                    continue;
                }

                let mut repetitions = 1u32;
                let mut pos = start + length;
                while pos + length <= window_len && &window[pos..pos + length] == candidate {
                    repetitions += 1;
                    pos += length;
                }
                if repetitions < 2 {
                    continue;
                }

                let content: String = candidate.iter().collect();
                let entry = aggregated.entry((content, length)).or_insert(0);
                if repetitions > *entry {
                    *entry = repetitions;
                }
            }
        }

        let mut candidates: Vec<_> = aggregated.into_iter().collect();
        // Deterministic registration order for a given input sequence
        candidates.sort_by(|a, b| a.0.cmp(&b.0));
        candidates
    }

    /// Score one aggregated candidate and update the registry
    ///
    /// Returns true if the entry was persisted. The usage-rate penalty
    /// throttles legitimate but overused patterns and is distinct from the
    /// boolean spam filter; its elapsed-time denominator is floored at one
    /// second so a first detection has a finite rate.
    fn register(
        &mut self,
        content: &str,
        length: usize,
        repetitions: u32,
        now_ms: u64,
        active_signature: Option<&str>,
    ) -> bool {
        let chars: Vec<char> = content.chars().collect();
        let quality = spam::quality(&chars);
        if quality < self.config.min_quality {
            return false;
        }

        let key = PatternKey {
            content: content.to_string(),
            length,
        };
        let existing = self.registry.get(&key);

        let prev_last_seen = existing.map(|e| e.last_seen_ms).unwrap_or(now_ms);
        let secs_since_last = (now_ms.saturating_sub(prev_last_seen)) as f64 / 1000.0;
        let recency_bonus = (5.0 - secs_since_last).max(0.0);

        let distinct = {
            let mut seen: Vec<char> = Vec::new();
            for &ch in &chars {
                if !seen.contains(&ch) {
                    seen.push(ch);
                }
            }
            seen.len()
        };

        let base_score = repetitions as f64 * length as f64
            + (length as f64 / 4.0).min(5.0)
            + 0.5 * distinct as f64
            + recency_bonus;

        let first_seen = existing.map(|e| e.first_seen_ms).unwrap_or(now_ms);
        let elapsed_secs = ((now_ms.saturating_sub(first_seen)) as f64 / 1000.0).max(1.0);
        let usage_rate = repetitions as f64 / elapsed_secs;
        let freshness_penalty = if usage_rate > 2.0 {
            0.1
        } else if usage_rate > 1.0 {
            0.3
        } else if usage_rate > 0.5 {
            0.7
        } else {
            1.0
        };

        let score = base_score * freshness_penalty;
        if score <= 1.0 {
            return false;
        }

        let entry = self
            .registry
            .entry(key)
            .or_insert_with(|| DetectedPattern {
                content: content.to_string(),
                length,
                frequency: 0,
                score: 0.0,
                quality,
                first_seen_ms: now_ms,
                last_seen_ms: now_ms,
                rhythm_signature: None,
            });
        entry.frequency += repetitions;
        entry.score = score;
        entry.quality = quality;
        entry.last_seen_ms = now_ms;
        if let Some(signature) = active_signature {
            entry.rhythm_signature = Some(signature.to_string());
        }

        tracing::debug!(
            "[Detector] Registered '{}' len {} reps {} score {:.2}",
            content,
            length,
            repetitions,
            score
        );
        true
    }

    /// Evict entries unseen for the configured age with low frequency
    fn collect_garbage(&mut self, now_ms: u64) -> u32 {
        let unseen_ms = (self.config.gc_unseen_secs * 1000.0) as u64;
        let min_frequency = self.config.gc_min_frequency;
        let before = self.registry.len();
        self.registry.retain(|_, entry| {
            let age = now_ms.saturating_sub(entry.last_seen_ms);
            age < unseen_ms || entry.frequency >= min_frequency
        });
        (before - self.registry.len()) as u32
    }

    /// Apply the time-decay multiplier to every remaining entry
    ///
    /// Decayed scores are clamped at zero so they never propagate negative
    /// values into comparisons or sorts.
    fn decay_scores(&mut self, now_ms: u64) {
        for entry in self.registry.values_mut() {
            let secs_since_last = now_ms.saturating_sub(entry.last_seen_ms) as f64 / 1000.0;
            let multiplier = (1.0 - secs_since_last / 60.0).max(0.1);
            entry.score = (entry.score * multiplier).max(0.0);
        }
    }

    /// Keep the registry bounded; lowest-scoring entries leave first
    fn enforce_capacity(&mut self) -> u32 {
        let cap = self.config.max_registry_entries;
        if self.registry.len() <= cap {
            return 0;
        }

        let mut entries: Vec<(PatternKey, f64)> = self
            .registry
            .iter()
            .map(|(key, entry)| (key.clone(), entry.score))
            .collect();
        entries.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.0.content.cmp(&a.0.content))
        });

        let excess = self.registry.len() - cap;
        for (key, _) in entries.into_iter().take(excess) {
            self.registry.remove(&key);
        }
        excess as u32
    }

    /// Promote strong registry entries into the learned-pattern list
    ///
    /// Candidates come from the top 10 above-threshold entries; promotion
    /// requires a 2x margin over the threshold and no prior learning of the
    /// same content. The list keeps the 50 strongest.
    fn promote_learned(&mut self, now_ms: u64) {
        let threshold = self.config.score_threshold;
        let candidates: Vec<(String, f64)> = self
            .top_patterns(10)
            .into_iter()
            .filter(|pattern| pattern.score > 2.0 * threshold)
            .map(|pattern| (pattern.content.clone(), pattern.score))
            .collect();

        let mut promoted: Vec<LearnedPattern> = Vec::new();
        for (content, score) in candidates {
            if self.learned.iter().any(|l| l.content == content) {
                continue;
            }
            promoted.push(LearnedPattern {
                category: categorize(&content),
                content,
                learned_at_ms: now_ms,
                strength: score,
            });
        }

        if promoted.is_empty() {
            return;
        }
        for learned in promoted {
            tracing::info!(
                "[Detector] Learned pattern '{}' strength {:.2} ({:?})",
                learned.content,
                learned.strength,
                learned.category
            );
            self.learned.push(learned);
        }
        self.learned.sort_by(|a, b| {
            b.strength
                .partial_cmp(&a.strength)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.content.cmp(&b.content))
        });
        self.learned.truncate(self.config.max_learned_patterns);
    }

    /// Top above-threshold entries, best first, content as tie-break
    pub fn top_patterns(&self, limit: usize) -> Vec<&DetectedPattern> {
        let mut entries: Vec<&DetectedPattern> = self
            .registry
            .values()
            .filter(|entry| entry.score > self.config.score_threshold)
            .collect();
        entries.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.content.cmp(&b.content))
        });
        entries.truncate(limit);
        entries
    }

    /// All registry entries above the score threshold (unsorted)
    pub fn entries_above_threshold(&self) -> Vec<&DetectedPattern> {
        self.registry
            .values()
            .filter(|entry| entry.score > self.config.score_threshold)
            .collect()
    }

    pub fn registry_len(&self) -> usize {
        self.registry.len()
    }

    pub fn get(&self, content: &str) -> Option<&DetectedPattern> {
        self.registry
            .get(&PatternKey {
                content: content.to_string(),
                length: content.chars().count(),
            })
    }

    pub fn learned_patterns(&self) -> &[LearnedPattern] {
        &self.learned
    }

    pub fn score_threshold(&self) -> f64 {
        self.config.score_threshold
    }

    /// Replace registry and learned state from a restored snapshot
    pub fn load_state(
        &mut self,
        patterns: Vec<DetectedPattern>,
        learned: Vec<LearnedPattern>,
    ) {
        self.registry = patterns
            .into_iter()
            .map(|pattern| (pattern.key(), pattern))
            .collect();
        self.learned = learned;
    }

    /// Clone registry entries for a snapshot, deterministic order
    pub fn export_patterns(&self) -> Vec<DetectedPattern> {
        let mut patterns: Vec<DetectedPattern> = self.registry.values().cloned().collect();
        patterns.sort_by(|a, b| a.content.cmp(&b.content).then(a.length.cmp(&b.length)));
        patterns
    }
}

/// Assign a style category from the pattern content
fn categorize(content: &str) -> PatternCategory {
    let chars: Vec<char> = content.chars().collect();
    let len = chars.len();

    let distinct = {
        let mut seen: Vec<char> = Vec::new();
        for &ch in &chars {
            if !seen.contains(&ch) {
                seen.push(ch);
            }
        }
        seen.len()
    };

    let alternating = distinct == 2
        && len >= 4
        && chars
            .iter()
            .enumerate()
            .all(|(i, &ch)| ch == chars[i % 2]);
    if alternating {
        return PatternCategory::Alternating;
    }

    let repetitive = (2..=len / 2).any(|unit_len| {
        chars
            .iter()
            .enumerate()
            .all(|(i, &ch)| ch == chars[i % unit_len])
    });
    if repetitive {
        return PatternCategory::Repetitive;
    }

    if len <= 3 {
        return PatternCategory::Simple;
    }
    if distinct as f64 / len as f64 > 0.7 {
        return PatternCategory::Varied;
    }
    PatternCategory::Complex
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> PatternDetector {
        PatternDetector::new(DetectorConfig::default())
    }

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn test_detects_repeated_pair() {
        let mut det = detector();
        // Slow pace keeps the usage-rate penalty mild
        det.run_pass(&chars("nana"), 10_000, None);
        let pattern = det.get("na").expect("pattern registered");
        assert!(pattern.frequency >= 2);
        assert!(pattern.score > 1.0);
    }

    #[test]
    fn test_single_char_mash_never_registers() {
        let mut det = detector();
        det.run_pass(&chars("mmmmmmm"), 1_000, None);
        assert_eq!(det.registry_len(), 0);
    }

    #[test]
    fn test_no_repetition_no_registration() {
        let mut det = detector();
        det.run_pass(&chars("abcdefgh"), 1_000, None);
        assert_eq!(det.registry_len(), 0);
    }

    #[test]
    fn test_window_too_small_is_noop() {
        let mut det = detector();
        let outcome = det.run_pass(&chars("ab"), 1_000, None);
        assert_eq!(outcome.registered, 0);
        assert_eq!(det.registry_len(), 0);
    }

    #[test]
    fn test_frequency_accumulates_across_passes() {
        let mut det = detector();
        det.run_pass(&chars("nana"), 0, None);
        let first = det.get("na").map(|p| p.frequency).unwrap_or(0);
        det.run_pass(&chars("nananana"), 4_000, None);
        let second = det.get("na").expect("still present").frequency;
        assert!(second > first);
    }

    #[test]
    fn test_spam_counted_in_outcome() {
        let mut det = detector();
        let outcome = det.run_pass(&chars("mmmmmmm"), 1_000, None);
        assert!(outcome.spam_rejected > 0);
    }

    #[test]
    fn test_usage_rate_penalty_suppresses_burst_score() {
        let mut fast = detector();
        fast.run_pass(&chars("nananana"), 0, None);
        let burst_score = fast.get("na").map(|p| p.score).unwrap_or(0.0);

        let mut slow = detector();
        slow.run_pass(&chars("nana"), 0, None);
        slow.run_pass(&chars("nananana"), 5_000, None);
        let settled_score = slow.get("na").expect("registered").score;

        assert!(settled_score > burst_score);
    }

    #[test]
    fn test_gc_removes_stale_low_frequency_entries() {
        let mut det = detector();
        det.run_pass(&chars("nana"), 0, None);
        assert!(det.get("na").is_some());

        // 31 seconds later with frequency still below 3: evicted
        let outcome = det.run_pass(&[], 31_000, None);
        assert!(det.get("na").is_none());
        assert!(outcome.evicted >= 1);
    }

    #[test]
    fn test_gc_spares_frequent_entries() {
        let mut det = detector();
        det.run_pass(&chars("nana"), 0, None);
        det.run_pass(&chars("nananana"), 2_000, None);
        let frequency = det.get("na").expect("present").frequency;
        assert!(frequency >= 3);

        det.run_pass(&[], 40_000, None);
        assert!(det.get("na").is_some(), "frequent pattern survives GC");
    }

    #[test]
    fn test_decay_reduces_score_over_time() {
        let mut det = detector();
        det.run_pass(&chars("nana"), 0, None);
        let initial = det.get("na").expect("present").score;

        det.run_pass(&chars("nananana"), 2_000, None);
        let refreshed = det.get("na").expect("present").score;

        det.run_pass(&[], 22_000, None);
        let decayed = det.get("na").expect("still within GC age").score;
        assert!(decayed < refreshed, "decay lowers unrefreshed scores");
        let _ = initial;
    }

    #[test]
    fn test_decayed_score_never_negative() {
        let mut det = detector();
        det.run_pass(&chars("nana"), 0, None);
        det.run_pass(&chars("nananana"), 2_000, None);
        for step in 1..10u64 {
            det.run_pass(&[], 2_000 + step * 25_000, None);
        }
        if let Some(pattern) = det.get("na") {
            assert!(pattern.score >= 0.0);
        }
    }

    #[test]
    fn test_learned_promotion_and_bound() {
        let mut det = detector();
        // Build a strong pattern over several slow passes
        det.run_pass(&chars("qsed"), 0, None);
        det.run_pass(&chars("qsedqsed"), 6_000, None);
        det.run_pass(&chars("qsedqsedqsed"), 12_000, None);

        let learned = det.learned_patterns();
        assert!(
            learned.iter().any(|l| l.content == "qsed"),
            "strong pattern promoted, learned: {:?}",
            learned
        );
        assert!(learned.len() <= 50);
        for pair in learned.windows(2) {
            assert!(pair[0].strength >= pair[1].strength, "sorted descending");
        }
    }

    #[test]
    fn test_learned_not_duplicated() {
        let mut det = detector();
        det.run_pass(&chars("qsedqsed"), 6_000, None);
        det.run_pass(&chars("qsedqsedqsed"), 12_000, None);
        det.run_pass(&chars("qsedqsedqsed"), 18_000, None);
        let count = det
            .learned_patterns()
            .iter()
            .filter(|l| l.content == "qsed")
            .count();
        assert!(count <= 1);
    }

    #[test]
    fn test_rhythm_signature_recorded() {
        let mut det = detector();
        det.run_pass(&chars("nana"), 10_000, Some("quarter-quarter-quarter"));
        let pattern = det.get("na").expect("registered");
        assert_eq!(
            pattern.rhythm_signature.as_deref(),
            Some("quarter-quarter-quarter")
        );
    }

    #[test]
    fn test_categorize_rules() {
        assert_eq!(categorize("abab"), PatternCategory::Alternating);
        assert_eq!(categorize("abcabc"), PatternCategory::Repetitive);
        assert_eq!(categorize("ab"), PatternCategory::Simple);
        assert_eq!(categorize("abcde"), PatternCategory::Varied);
        assert_eq!(categorize("aabbc"), PatternCategory::Complex);
    }

    #[test]
    fn test_capacity_cap_enforced() {
        let mut config = DetectorConfig::default();
        config.max_registry_entries = 2;
        let mut det = PatternDetector::new(config);
        det.run_pass(&chars("nanapopo"), 0, None);
        det.run_pass(&chars("keke"), 5_000, None);
        assert!(det.registry_len() <= 2);
    }
}
