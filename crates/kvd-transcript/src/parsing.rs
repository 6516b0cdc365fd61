//! Strict transcript parsing (spec.md §4.8).
//!
//! A header is `(Turn <digits>) [<role>]: ` anchored at beginning-of-line.
//! A turn's content runs from right after the header to the last
//! occurrence of the 16-byte fence `\n\n~~~(end)~~~\n\n` that lies before
//! the next header (or end-of-file). A turn with no such fence in its
//! window is still in progress (or malformed) and is ignored.

use regex::Regex;

pub const FENCE: &str = "\n\n~~~(end)~~~\n\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub id: u64,
    pub role: String,
    pub content: String,
}

fn header_re() -> Regex {
    Regex::new(r"(?m)^\(Turn (\d+)\) \[([^\]]+)\]: ").expect("static pattern is valid")
}

/// The highest turn id whose header appears anywhere in `text`, complete
/// or not — used to seed/resync the counter file (spec.md §4.8).
pub fn highest_turn_id(text: &str) -> Option<u64> {
    header_re()
        .captures_iter(text)
        .filter_map(|c| c[1].parse::<u64>().ok())
        .max()
}

/// Parse every turn that has a complete fence before its content runs out.
pub fn parse_turns(text: &str) -> Vec<Turn> {
    let re = header_re();
    let headers: Vec<_> = re.captures_iter(text).map(|c| {
        let m = c.get(0).unwrap();
        (m.start(), m.end(), c[1].parse::<u64>().ok(), c[2].to_string())
    }).collect();

    let mut turns = Vec::with_capacity(headers.len());
    for (i, (_, header_end, id, role)) in headers.iter().enumerate() {
        let Some(id) = id else { continue };
        let window_end = headers.get(i + 1).map(|(start, _, _, _)| *start).unwrap_or(text.len());
        let window = &text[*header_end..window_end];
        if let Some(fence_pos) = window.rfind(FENCE) {
            turns.push(Turn {
                id: *id,
                role: role.clone(),
                content: window[..fence_pos].to_string(),
            });
        }
        // else: no complete fence in this turn's window — still generating
        // or malformed; silently skipped.
    }
    turns
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_single_complete_turn() {
        let text = "(Turn 1) [USER]: hello\n\n~~~(end)~~~\n\n";
        let turns = parse_turns(text);
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].id, 1);
        assert_eq!(turns[0].role, "USER");
        assert_eq!(turns[0].content, "hello");
    }

    #[test]
    fn a_turn_without_a_fence_is_ignored() {
        let text = "(Turn 1) [USER]: still typing...";
        assert!(parse_turns(text).is_empty());
    }

    #[test]
    fn header_must_be_at_start_of_line() {
        let text = "garbage (Turn 1) [USER]: hello\n\n~~~(end)~~~\n\n";
        assert!(parse_turns(text).is_empty());
    }

    #[test]
    fn uses_the_rightmost_fence_before_the_next_header() {
        // Content legitimately contains the fence string as quoted text;
        // the real terminator is the LAST occurrence before the next
        // header, per spec.
        let text = "(Turn 1) [USER]: see \n\n~~~(end)~~~\n\n literally\n\n~~~(end)~~~\n\n(Turn 2) [AI]: hi\n\n~~~(end)~~~\n\n";
        let turns = parse_turns(text);
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].content, "see \n\n~~~(end)~~~\n\n literally");
        assert_eq!(turns[1].id, 2);
    }

    #[test]
    fn highest_turn_id_counts_incomplete_headers_too() {
        let text = "(Turn 1) [USER]: done\n\n~~~(end)~~~\n\n(Turn 2) [AI]: not done yet";
        assert_eq!(highest_turn_id(text), Some(2));
    }

    #[test]
    fn empty_transcript_has_no_highest_turn() {
        assert_eq!(highest_turn_id(""), None);
    }
}
