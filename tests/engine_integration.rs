//! End-to-end tests for the pattern engine
//!
//! These tests drive the public `PatternEngine` API the way the game
//! would: one keystroke at a time with realistic timing, reading the
//! analysis snapshot between events. Deterministic seeds keep the
//! suggestion output stable.

use typebeat_engine::analysis::detector::PatternDetector;
use typebeat_engine::config::{DetectorConfig, EngineConfig};
use typebeat_engine::persistence::{self, EngineSnapshot};
use typebeat_engine::PatternEngine;

fn engine() -> PatternEngine {
    PatternEngine::with_seed(EngineConfig::default(), 7)
}

/// Type a string with a fixed inter-key interval starting at `start_ms`
fn type_text(engine: &mut PatternEngine, text: &str, start_ms: u64, interval_ms: u64) -> u64 {
    let mut ts = start_ms;
    for ch in text.chars() {
        engine.record_keystroke(ch, ts, None);
        ts += interval_ms;
    }
    ts.saturating_sub(interval_ms)
}

/// Repeatedly typing "na" at a musical pace must surface "na" as a
/// detected pattern with accumulated frequency
#[test]
fn test_repeated_digraph_detected() {
    let mut e = engine();
    type_text(&mut e, "nananana", 0, 600);

    let snapshot = e.current_analysis();
    let na = snapshot
        .top_patterns
        .iter()
        .find(|p| p.content == "na")
        .expect("'na' should appear in top patterns");
    assert!(na.frequency >= 4, "frequency was {}", na.frequency);
    assert!(na.score > 1.5, "score was {}", na.score);
}

/// Holding one key never produces a detected pattern, only spam
/// rejections
#[test]
fn test_single_key_spam_rejected() {
    let mut e = engine();
    type_text(&mut e, "mmmmmmm", 0, 600);

    let snapshot = e.current_analysis();
    assert!(snapshot.top_patterns.is_empty());
    assert!(snapshot.counters.spam_rejections > 0);
}

/// Uniform typing settles into one aggregated rhythm signature whose
/// categories are all the same note duration
#[test]
fn test_uniform_typing_settles_into_one_signature() {
    let mut e = engine();
    type_text(&mut e, "qsedqsedqsedqsedqsed", 0, 500);

    let snapshot = e.current_analysis();
    let top = snapshot
        .top_rhythms
        .first()
        .expect("a rhythm signature should exist");
    // Once the window saturates, every pass sees the same 15 intervals
    assert!(top.frequency >= 2);
    assert!(top.categories.iter().all(|c| *c == top.categories[0]));
    assert!((top.average_interval_ms - 500.0).abs() < 1e-9);
}

/// Garbage collection removes patterns that are both stale and rare,
/// and only those
#[test]
fn test_gc_requires_stale_and_rare() {
    let mut detector = PatternDetector::new(DetectorConfig::default());
    let window: Vec<char> = "nana".chars().collect();
    detector.run_pass(&window, 0, None);
    assert!(detector.get("na").is_some());
    let frequency = detector.get("na").map(|p| p.frequency).unwrap_or(0);
    assert!(frequency < 3);

    // 29s later: stale threshold not reached, entry survives
    let quiet: Vec<char> = "qwer".chars().collect();
    detector.run_pass(&quiet, 29_000, None);
    assert!(detector.get("na").is_some());

    // 31s after last sighting: stale and rare, evicted
    detector.run_pass(&quiet, 31_000, None);
    assert!(detector.get("na").is_none());
}

/// A frequent pattern survives the stale check
#[test]
fn test_gc_spares_frequent_patterns() {
    let mut detector = PatternDetector::new(DetectorConfig::default());
    let window: Vec<char> = "nananana".chars().collect();
    detector.run_pass(&window, 0, None);
    detector.run_pass(&window, 2_000, None);
    let frequency = detector.get("na").map(|p| p.frequency).unwrap_or(0);
    assert!(frequency >= 3);

    let quiet: Vec<char> = "qwer".chars().collect();
    detector.run_pass(&quiet, 40_000, None);
    assert!(detector.get("na").is_some(), "frequent pattern was evicted");
}

/// Sustained strong repetition promotes a learned pattern, and the
/// learned list stays within its cap
#[test]
fn test_learned_promotion_and_cap() {
    let mut e = engine();
    let mut start = 0;
    for _ in 0..6 {
        start = type_text(&mut e, "qsedqsed", start, 600) + 600;
    }

    let state = e.export_state(start);
    assert!(
        state.learned.iter().any(|l| l.content.contains("qsed")),
        "expected a learned pattern derived from 'qsed'"
    );
    assert!(state.learned.len() <= 50);
    // Strongest first
    for pair in state.learned.windows(2) {
        assert!(pair[0].strength >= pair[1].strength);
    }
}

/// Saving and restoring a snapshot reproduces the same top patterns
#[test]
fn test_snapshot_roundtrip_preserves_analysis() {
    let mut e = engine();
    let end = type_text(&mut e, "nananana", 0, 600);
    let before = e.current_analysis();

    let json = e.export_state(end).to_json().expect("serialize");
    let restored_state = EngineSnapshot::from_json(&json).expect("deserialize");
    let mut restored = engine();
    restored.load_state(restored_state);
    let after = restored.current_analysis();

    assert_eq!(before.top_patterns, after.top_patterns);
    assert_eq!(before.top_rhythms, after.top_rhythms);
}

/// A corrupt snapshot file degrades to an empty engine, not a crash
#[test]
fn test_corrupt_snapshot_falls_back_to_empty() {
    let path = std::env::temp_dir().join(format!("typebeat_it_corrupt_{}.json", std::process::id()));
    std::fs::write(&path, "{\"version\": 1, \"patterns\": \"oops\"").expect("write fixture");

    let snapshot = persistence::load_from_file(&path);
    let _ = std::fs::remove_file(&path);

    let mut e = engine();
    e.load_state(snapshot);
    assert!(e.current_analysis().top_patterns.is_empty());
}

/// Suggestions are deterministic for a fixed seed and derived from the
/// strongest patterns
#[test]
fn test_suggestions_deterministic_under_seed() {
    let mut a = PatternEngine::with_seed(EngineConfig::default(), 42);
    let mut b = PatternEngine::with_seed(EngineConfig::default(), 42);
    type_text(&mut a, "nananana", 0, 600);
    type_text(&mut b, "nananana", 0, 600);

    let sa = a.current_analysis().suggestions;
    let sb = b.current_analysis().suggestions;
    assert_eq!(sa, sb);
    assert!(!sa.is_empty());
    assert!(sa.len() <= 5);
    assert!(sa.iter().any(|s| s.based_on == "na"));
}

/// Counters reflect the work done during a session
#[test]
fn test_counters_track_session() {
    let mut e = engine();
    type_text(&mut e, "nananana", 0, 600);

    let counters = e.current_analysis().counters;
    assert_eq!(counters.keystrokes, 8);
    assert_eq!(counters.passes, 8);
    assert!(counters.patterns_registered > 0);
    assert!(counters.suggestions_emitted > 0);
}
