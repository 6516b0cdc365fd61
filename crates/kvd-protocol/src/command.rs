//! Slash-command grammar (spec.md §4.3, §6).
//!
//! A frame body is either a bare prompt to feed the model, or a command
//! line beginning with `/`. Commands never touch the model's recurrent
//! state directly — they're interpreted by the caller against whatever
//! engine/snapshot/profile state it holds.

/// One parsed command line. The seven knob commands and `/max` carry
/// `Option<String>`: `None` means "get", `Some(value)` means "set".
/// `Unknown` carries the original verb so the caller can echo it back.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Bare text to generate from.
    Prompt(String),
    /// `/save [path]` — persist recurrent state.
    Save(Option<String>),
    /// `/load [path]` — restore recurrent state.
    Load(Option<String>),
    /// `/save_set [path]` — persist the sampling profile.
    SaveSet(Option<String>),
    /// `/load_set [path]` — restore the sampling profile.
    LoadSet(Option<String>),
    /// `/reset` — clear recurrent state back to empty context.
    Reset,
    /// `/profile [name]` — switch to a named built-in preset, or report
    /// the current one when no argument is given.
    Profile(Option<String>),
    /// `/t [VALUE]` — get or set temperature.
    Temperature(Option<String>),
    /// `/p [VALUE]` — get or set top_p.
    TopP(Option<String>),
    /// `/k [VALUE]` — get or set top_k.
    TopK(Option<String>),
    /// `/min_p [VALUE]` — get or set min_p.
    MinP(Option<String>),
    /// `/pen_freq [VALUE]` — get or set frequency_penalty.
    PenaltyFrequency(Option<String>),
    /// `/pen_pres [VALUE]` — get or set presence_penalty.
    PenaltyPresence(Option<String>),
    /// `/pen_rep [VALUE]` — get or set repeat_penalty.
    PenaltyRepeat(Option<String>),
    /// `/max [VALUE]` — get or set the per-turn character budget.
    MaxChars(Option<String>),
    /// `/?` — report current sampling settings.
    ShowSettings,
    /// Anything starting with `/` that isn't one of the above.
    Unknown(String),
}

/// Parse a command body (the text after any bang header has been
/// stripped). A body not starting with `/` is always [`Command::Prompt`].
pub fn parse(body: &str) -> Command {
    if !body.starts_with('/') {
        return Command::Prompt(body.to_string());
    }

    let mut parts = body.splitn(2, char::is_whitespace);
    let verb = parts.next().unwrap_or("");
    let rest = parts.next().map(str::trim).filter(|s| !s.is_empty());
    let arg = rest.map(str::to_string);

    match verb {
        "/save" => Command::Save(arg),
        "/load" => Command::Load(arg),
        "/save_set" => Command::SaveSet(arg),
        "/load_set" => Command::LoadSet(arg),
        "/reset" => Command::Reset,
        "/profile" => Command::Profile(arg),
        "/?" => Command::ShowSettings,
        "/t" => Command::Temperature(arg),
        "/p" => Command::TopP(arg),
        "/k" => Command::TopK(arg),
        "/min_p" => Command::MinP(arg),
        "/pen_freq" => Command::PenaltyFrequency(arg),
        "/pen_pres" => Command::PenaltyPresence(arg),
        "/pen_rep" => Command::PenaltyRepeat(arg),
        "/max" => Command::MaxChars(arg),
        other => Command::Unknown(other.to_string()),
    }
}
