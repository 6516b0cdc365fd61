//! The optional "!" header that scripts a pre-turn state/profile load and a
//! post-turn state save (spec.md §4.6, §6 grammar).
//!
//! This is parsed into an explicit value up front rather than rewritten in
//! place, per spec.md §9's re-architecture guidance for the header
//! micro-DSL.

/// A parsed bang header. Any field left `None` means that positional
/// argument was omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BangHeader {
    /// ARG1 — snapshot path to load before processing the body.
    pub load_state: Option<String>,
    /// ARG2 — profile path to load before processing the body.
    pub load_profile: Option<String>,
    /// ARG3 — snapshot path to save after the body is processed.
    pub post_save: Option<String>,
}

impl BangHeader {
    pub fn is_empty(&self) -> bool {
        self.load_state.is_none() && self.load_profile.is_none() && self.post_save.is_none()
    }
}

/// Split a raw frame payload into an optional bang header and the body
/// that the rest of dispatch should see. If `payload` doesn't start with
/// `!`, returns `(None, payload)` unchanged.
pub fn split_bang_header(payload: &str) -> (Option<BangHeader>, &str) {
    if !payload.starts_with('!') {
        return (None, payload);
    }

    let (header, body) = match payload.split_once('\n') {
        Some((h, b)) => (h, b),
        None => (payload, ""),
    };

    let mut args = header[1..].split_whitespace();
    let header = BangHeader {
        load_state: args.next().map(str::to_owned),
        load_profile: args.next().map(str::to_owned),
        post_save: args.next().map(str::to_owned),
    };
    (Some(header), body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_bang_passes_payload_through() {
        let (header, body) = split_bang_header("hello world");
        assert!(header.is_none());
        assert_eq!(body, "hello world");
    }

    #[test]
    fn parses_all_three_args() {
        let (header, body) = split_bang_header("!stateA.snp set.json stateB.snp\nhello");
        let h = header.unwrap();
        assert_eq!(h.load_state.as_deref(), Some("stateA.snp"));
        assert_eq!(h.load_profile.as_deref(), Some("set.json"));
        assert_eq!(h.post_save.as_deref(), Some("stateB.snp"));
        assert_eq!(body, "hello");
    }

    #[test]
    fn parses_partial_args() {
        let (header, body) = split_bang_header("!stateA.snp\nprompt text");
        let h = header.unwrap();
        assert_eq!(h.load_state.as_deref(), Some("stateA.snp"));
        assert!(h.load_profile.is_none());
        assert!(h.post_save.is_none());
        assert_eq!(body, "prompt text");
    }

    #[test]
    fn empty_header_with_no_args_applies_no_effects() {
        let (header, body) = split_bang_header("!\nprompt");
        assert!(header.unwrap().is_empty());
        assert_eq!(body, "prompt");
    }

    #[test]
    fn bang_with_no_newline_means_empty_body() {
        let (header, body) = split_bang_header("!stateA.snp set.json stateB.snp");
        let h = header.unwrap();
        assert_eq!(h.post_save.as_deref(), Some("stateB.snp"));
        assert_eq!(body, "");
    }
}
