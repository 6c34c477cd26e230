//! Spam/quality filter - degenerate-input rejection and quality scoring
//!
//! Judges whether a candidate character sequence is degenerate (single-key
//! mashing, trivial alternation) and computes a continuous quality score for
//! sequences that survive. Rhythm-level spam (key holding, interval mashing)
//! is detected separately over the keystroke window.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::analysis::Keystroke;

/// Quality score bounds
pub const QUALITY_MIN: f64 = 0.1;
pub const QUALITY_MAX: f64 = 2.0;

/// Fixed 3-row keyboard layout used for the row-coherence bonus
static KEYBOARD_ROWS: Lazy<HashMap<char, u8>> = Lazy::new(|| {
    let mut rows = HashMap::new();
    for (row, keys) in ["qwertyuiop", "asdfghjkl", "zxcvbnm"].iter().enumerate() {
        for ch in keys.chars() {
            rows.insert(ch, row as u8);
        }
    }
    rows
});

fn distinct_count(sequence: &[char]) -> usize {
    let mut seen: Vec<char> = Vec::with_capacity(sequence.len().min(8));
    for &ch in sequence {
        if !seen.contains(&ch) {
            seen.push(ch);
        }
    }
    seen.len()
}

fn max_char_frequency(sequence: &[char]) -> usize {
    let mut counts: HashMap<char, usize> = HashMap::new();
    for &ch in sequence {
        *counts.entry(ch).or_insert(0) += 1;
    }
    counts.values().copied().max().unwrap_or(0)
}

/// True if the sequence is a repetition of a shorter internal unit
///
/// Tested for every candidate sub-length from 2 up to half the sequence
/// length; a trailing partial repetition still counts as a match.
fn is_internal_repetition(sequence: &[char]) -> bool {
    let len = sequence.len();
    for unit_len in 2..=len / 2 {
        if sequence
            .iter()
            .enumerate()
            .all(|(i, &ch)| ch == sequence[i % unit_len])
        {
            return true;
        }
    }
    false
}

/// Decide whether a candidate sequence is degenerate spam
///
/// Spam is any of:
/// - more than 2 characters, all identical
/// - even length > 4 made of one 2-character unit with at most 2 distinct
///   characters, repeated exactly length/2 times
/// - a single character occupying more than 60% of the sequence
pub fn is_spam(sequence: &[char]) -> bool {
    let len = sequence.len();
    if len == 0 {
        return false;
    }

    if len > 2 && sequence.iter().all(|&ch| ch == sequence[0]) {
        return true;
    }

    if len > 4 && len % 2 == 0 {
        let unit = &sequence[..2];
        let unit_repeats = sequence
            .chunks(2)
            .all(|chunk| chunk == unit);
        if unit_repeats && distinct_count(unit) <= 2 {
            return true;
        }
    }

    max_char_frequency(sequence) as f64 / len as f64 > 0.6
}

/// Compute a continuous quality score in [0.1, 2.0]
///
/// Starts at 1.0 and applies multiplicative factors: character variety,
/// length band (bonus for 3-8, penalty above 12), keyboard-row coherence,
/// and a penalty when the sequence merely repeats a shorter internal unit.
pub fn quality(sequence: &[char]) -> f64 {
    let len = sequence.len();
    if len == 0 {
        return QUALITY_MIN;
    }

    let mut score = 1.0;

    // Variety factor in [0.5, 1.5]
    let distinct = distinct_count(sequence);
    score *= 0.5 + distinct as f64 / len as f64;

    // Length band
    if (3..=8).contains(&len) {
        score *= 1.2;
    } else if len > 12 {
        score *= 0.7;
    }

    // Keyboard-row coherence: all characters on the layout, at most 2 rows
    let mut rows_touched: Vec<u8> = Vec::with_capacity(3);
    let mut all_mapped = true;
    for &ch in sequence {
        match KEYBOARD_ROWS.get(&ch) {
            Some(&row) => {
                if !rows_touched.contains(&row) {
                    rows_touched.push(row);
                }
            }
            None => {
                all_mapped = false;
                break;
            }
        }
    }
    if all_mapped && rows_touched.len() <= 2 {
        score *= 1.3;
    }

    if is_internal_repetition(sequence) {
        score *= 0.6;
    }

    score.clamp(QUALITY_MIN, QUALITY_MAX)
}

/// Detect rhythm-level spam over a keystroke window
///
/// Key holding: every character identical and the average inter-key
/// interval is below `hold_interval_ms`. Mashing: more than `mash_ratio`
/// of consecutive intervals are below `mash_interval_ms`. Rhythm analysis
/// is skipped entirely for a window flagged here.
pub fn is_rhythm_spam(
    window: &[Keystroke],
    hold_interval_ms: f64,
    mash_interval_ms: f64,
    mash_ratio: f64,
) -> bool {
    if window.len() < 2 {
        return false;
    }

    let intervals: Vec<f64> = window
        .windows(2)
        .map(|pair| pair[1].timestamp_ms.saturating_sub(pair[0].timestamp_ms) as f64)
        .collect();
    let mean_interval = intervals.iter().sum::<f64>() / intervals.len() as f64;

    let all_same_char = window.iter().all(|k| k.character == window[0].character);
    if all_same_char && mean_interval < hold_interval_ms {
        return true;
    }

    let fast = intervals
        .iter()
        .filter(|&&gap| gap < mash_interval_ms)
        .count();
    fast as f64 / intervals.len() as f64 > mash_ratio
}
