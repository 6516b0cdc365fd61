//! Turn counter synchronization (spec.md §4.8).
//!
//! The counter file holds the next id to mint. It is *not* written
//! atomically — it's a single small integer, append-only in spirit,
//! and (per spec.md §5) only one writer is assumed active at a time.

use std::path::Path;

use crate::parsing::highest_turn_id;

pub const COUNTER_FILE: &str = ".counter";

fn write_best_effort(path: &Path, value: u64) {
    let _ = std::fs::write(path, value.to_string());
}

/// Read the counter, initializing it from the transcript's highest turn
/// id if the file is absent or unparsable.
pub fn read_counter(dir: &Path, transcript_text: &str) -> u64 {
    let path = dir.join(COUNTER_FILE);
    match std::fs::read_to_string(&path) {
        Ok(raw) => match raw.trim().parse::<u64>() {
            Ok(n) => n,
            Err(_) => {
                let hi = highest_turn_id(transcript_text).unwrap_or(0);
                write_best_effort(&path, hi);
                hi
            }
        },
        Err(_) => {
            let hi = highest_turn_id(transcript_text).unwrap_or(0);
            write_best_effort(&path, hi);
            hi
        }
    }
}

/// Mint and persist the next turn id: `max(highest_in_transcript,
/// current_counter) + 1`.
pub fn next_turn_id(dir: &Path, transcript_text: &str) -> u64 {
    let current = read_counter(dir, transcript_text);
    let highest_seen = highest_turn_id(transcript_text).unwrap_or(0);
    let next = current.max(highest_seen) + 1;
    write_best_effort(&dir.join(COUNTER_FILE), next);
    next
}
