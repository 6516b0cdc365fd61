//! GET / PUT / RUN / QUOTE (spec.md §4.8). Every operation is silent on
//! any error: missing transcript, missing turn, unreachable service, or a
//! decode failure all just exit cleanly without touching the transcript
//! or counter.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use tokio::process::Command;

use crate::counter::next_turn_id;
use crate::parsing::parse_turns;
use crate::roundtrip::echo_roundtrip;

pub const TRANSCRIPT_FILE: &str = ".transcript.txt";

pub struct ToolConfig {
    pub host: String,
    pub port: u16,
    pub frame_ceiling: usize,
    pub verbose: bool,
}

fn append(path: &Path, text: &str) {
    use std::fs::OpenOptions;
    if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(path) {
        let _ = f.write_all(text.as_bytes());
    }
}

fn echo_if_verbose(cfg: &ToolConfig, reply: &str) {
    if cfg.verbose {
        print!("{reply}");
        let _ = std::io::stdout().flush();
    }
}

pub async fn get(turn_id: Option<u64>, out_path: &Path, dir: &Path) {
    let transcript_path = dir.join(TRANSCRIPT_FILE);
    let Ok(text) = std::fs::read_to_string(&transcript_path) else {
        return;
    };
    if text.is_empty() {
        return;
    }
    let turns = parse_turns(&text);
    if turns.is_empty() {
        return;
    }

    let chosen = match turn_id {
        None => turns.iter().rev().find(|t| t.role == "FILE"),
        Some(id) => turns.iter().find(|t| t.id == id).filter(|t| t.role == "FILE"),
    };
    let Some(turn) = chosen else {
        return;
    };

    if let Some(parent) = out_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if std::fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    let _ = std::fs::write(out_path, &turn.content);
}

pub async fn put(in_path: &Path, dir: &Path, cfg: &ToolConfig) {
    let Ok(mut content) = std::fs::read_to_string(in_path) else {
        return;
    };
    if !content.ends_with('\n') {
        content.push('\n');
    }

    let transcript_path = dir.join(TRANSCRIPT_FILE);
    let text = std::fs::read_to_string(&transcript_path).unwrap_or_default();
    let id = next_turn_id(dir, &text);

    let body = format!("(Turn {id}) [FILE]: {content}\n~~~(");
    let reply = echo_roundtrip(&cfg.host, cfg.port, &body, cfg.frame_ceiling).await;
    echo_if_verbose(cfg, &reply);

    append(&transcript_path, &body);
    append(&transcript_path, &reply);
}

pub async fn run(turn_id: Option<u64>, dir: &Path, cfg: &ToolConfig) {
    let transcript_path = dir.join(TRANSCRIPT_FILE);
    let Ok(text) = std::fs::read_to_string(&transcript_path) else {
        return;
    };
    if text.is_empty() {
        return;
    }
    let turns = parse_turns(&text);
    if turns.is_empty() {
        return;
    }

    let chosen = match turn_id {
        None => turns
            .iter()
            .rev()
            .find(|t| t.role == "PYTHON" || t.role == "BASH"),
        Some(id) => turns
            .iter()
            .find(|t| t.id == id)
            .filter(|t| t.role == "PYTHON" || t.role == "BASH"),
    };
    let Some(turn) = chosen else {
        return;
    };

    let Some(mut output) = execute(&turn.role, &turn.content).await else {
        return;
    };
    if !output.ends_with('\n') {
        output.push('\n');
    }

    let id = next_turn_id(dir, &text);
    let body = format!("(Turn {id}) [OUTPUT]: {output}\n~~~(");
    let reply = echo_roundtrip(&cfg.host, cfg.port, &body, cfg.frame_ceiling).await;
    echo_if_verbose(cfg, &reply);

    append(&transcript_path, &body);
    append(&transcript_path, &reply);
}

/// Write `content` to a temp file and execute it, capturing stdout and
/// stderr. Interpreter is chosen by role: `/bin/bash` for BASH, the
/// current Python 3 on PATH for PYTHON. Stdout is captured before
/// stderr — unlike the original tool's merged single stream, this loses
/// exact interleaving, which doesn't matter for a captured transcript.
async fn execute(role: &str, content: &str) -> Option<String> {
    let suffix = if role == "BASH" { ".sh" } else { ".py" };
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().ok()?;
    file.write_all(content.as_bytes()).ok()?;
    file.flush().ok()?;
    let path: PathBuf = file.path().to_path_buf();

    let mut command = if role == "BASH" {
        let mut c = Command::new("/bin/bash");
        c.arg(&path);
        c
    } else {
        let mut c = Command::new("python3");
        c.arg("-u").arg(&path);
        c
    };

    let output = command.output().await.ok()?;
    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    Some(combined)
}

pub async fn quote(turn_id: u64, dir: &Path, cfg: &ToolConfig) {
    let transcript_path = dir.join(TRANSCRIPT_FILE);
    let Ok(text) = std::fs::read_to_string(&transcript_path) else {
        return;
    };
    if text.is_empty() {
        return;
    }
    let turns = parse_turns(&text);
    let Some(turn) = turns.iter().find(|t| t.id == turn_id) else {
        return;
    };

    let quoted = quote_block(turn.id, &turn.role, &turn.content);
    let id = next_turn_id(dir, &text);
    let body = format!("(Turn {id}) [QUOTE]: {quoted}\n\n~~~(");
    let reply = echo_roundtrip(&cfg.host, cfg.port, &body, cfg.frame_ceiling).await;
    echo_if_verbose(cfg, &reply);

    append(&transcript_path, &body);
    append(&transcript_path, &reply);
}

fn quote_block(turn_id: u64, role: &str, content: &str) -> String {
    let mut lines = vec![format!("> (Turn {turn_id}) [{role}]:")];
    lines.extend(content.lines().map(|l| format!("> {l}")));
    lines.join("\n")
}
