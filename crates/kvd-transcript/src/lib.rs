pub mod counter;
pub mod operations;
pub mod parsing;
pub mod roundtrip;

pub use operations::{get, put, quote, run, ToolConfig, TRANSCRIPT_FILE};
pub use parsing::{highest_turn_id, parse_turns, Turn, FENCE};
pub use roundtrip::echo_roundtrip;
