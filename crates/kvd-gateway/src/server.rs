//! Server state and dispatch (spec.md §4.6, §4.7): the single live model
//! instance plus its snapshot/profile/budget, and the per-frame command
//! interpreter that drives it. One `Server` lives for the whole process;
//! connections come and go around it.

use kvd_domain::config::{Config, ModelKind};
use kvd_domain::trace::TraceEvent;
use kvd_engine::take_turn;
use kvd_model::{build_runtime, ModelRuntime};
use kvd_protocol::{command, split_bang_header, Command};
use kvd_sampling::SamplingProfile;
use kvd_snapshot::RecurrentStateSnapshot;

pub struct Server {
    model: Box<dyn ModelRuntime>,
    profile: SamplingProfile,
    active_profile_name: &'static str,
    snapshot: Option<RecurrentStateSnapshot>,
    max_chars: usize,
    default_snapshot_path: String,
    default_profile_path: String,
}

impl Server {
    pub fn new(config: &Config) -> Self {
        let model = build_runtime(config.model.kind, config.model.model_path.as_deref());
        let profile = model.capabilities().default_profile;
        let active_profile_name = match config.model.kind {
            ModelKind::Mamba => "mamba",
            ModelKind::Rwkv | ModelKind::Mock => "rwkv",
        };

        Self {
            model,
            profile,
            active_profile_name,
            snapshot: None,
            max_chars: config.generation.max_chars,
            default_snapshot_path: config.paths.default_snapshot.clone(),
            default_profile_path: config.paths.default_profile.clone(),
        }
    }

    /// Handle one request payload end-to-end and return the reply text to
    /// frame and write back. Never panics — every failure is caught and
    /// turned into a reply or a silently-ignored no-op (spec.md §7).
    pub async fn handle_payload(&mut self, payload: &str) -> String {
        let (header, body) = split_bang_header(payload);

        if let Some(header) = &header {
            let mut loaded_state = false;
            let mut loaded_profile = false;

            if let Some(path) = &header.load_state {
                loaded_state = self.load_state_from(path).await.is_ok();
            }
            if let Some(path) = &header.load_profile {
                loaded_profile = self.load_profile_from(path).is_ok();
            }

            TraceEvent::BangHeaderApplied {
                load_state: loaded_state,
                load_profile: loaded_profile,
                post_save: header.post_save.is_some(),
            }
            .emit();
        }

        let reply = if body.is_empty() {
            String::new()
        } else {
            self.dispatch(body).await
        };

        if let Some(header) = &header {
            if let Some(path) = &header.post_save {
                self.save_state_to(path).await;
            }
        }

        reply
    }

    async fn dispatch(&mut self, body: &str) -> String {
        let parsed = command::parse(body);
        TraceEvent::CommandDispatched {
            command: format!("{parsed:?}"),
        }
        .emit();

        match parsed {
            Command::Prompt(text) => self.run_prompt(&text).await,
            Command::Save(path) => self.cmd_save(path.as_deref()).await,
            Command::Load(path) => self.cmd_load(path.as_deref()).await,
            Command::SaveSet(path) => self.cmd_save_set(path.as_deref()),
            Command::LoadSet(path) => self.cmd_load_set(path.as_deref()),
            Command::Reset => self.cmd_reset().await,
            Command::Profile(name) => self.cmd_profile(name.as_deref()),
            Command::Temperature(v) => self.knob("t", v),
            Command::TopP(v) => self.knob("p", v),
            Command::TopK(v) => self.knob("k", v),
            Command::MinP(v) => self.knob("min_p", v),
            Command::PenaltyFrequency(v) => self.knob("pen_freq", v),
            Command::PenaltyPresence(v) => self.knob("pen_pres", v),
            Command::PenaltyRepeat(v) => self.knob("pen_rep", v),
            Command::MaxChars(v) => self.cmd_max_chars(v),
            Command::ShowSettings => self.cmd_show_settings(),
            Command::Unknown(_) => String::new(),
        }
    }

    async fn run_prompt(&mut self, text: &str) -> String {
        match take_turn(&mut *self.model, &self.profile, self.max_chars, text, None).await {
            Ok((reply, snapshot)) => {
                TraceEvent::TurnCompleted {
                    prompt_chars: text.chars().count(),
                    reply_chars: reply.chars().count(),
                    forced: reply.ends_with("~~~\n\n"),
                    duration_ms: 0,
                }
                .emit();
                self.snapshot = Some(snapshot);
                reply
            }
            Err(e) => {
                TraceEvent::GenerationError {
                    reason: e.to_string(),
                }
                .emit();
                format!("[error] {e}\n")
            }
        }
    }

    fn knob(&mut self, name: &str, value: Option<String>) -> String {
        match value {
            None => {
                let canonical = SamplingProfile::canonical_name(name).unwrap_or(name);
                let current = self.profile.get(name).unwrap_or_default();
                format!("{canonical} = {current}\n")
            }
            Some(value) => {
                self.profile.set(name, &value);
                String::new()
            }
        }
    }

    fn cmd_max_chars(&mut self, value: Option<String>) -> String {
        match value {
            None => format!("max = {}\n", self.max_chars),
            Some(value) => {
                if let Ok(n) = value.trim().parse::<usize>() {
                    self.max_chars = n;
                }
                String::new()
            }
        }
    }

    fn cmd_show_settings(&self) -> String {
        let brand = self.model.capabilities().brand;
        format!(
            "{brand}\ntemp = {:.3}\ntop_p = {:.3}\ntop_k = {}\nmin_p = {:.3}\npen_freq = {:.3}\npen_pres = {:.3}\npen_rep = {:.3}\nmax = {}\n",
            self.profile.temperature,
            self.profile.top_p,
            self.profile.top_k,
            self.profile.min_p,
            self.profile.frequency_penalty,
            self.profile.presence_penalty,
            self.profile.repeat_penalty,
            self.max_chars,
        )
    }

    async fn cmd_save(&mut self, path: Option<&str>) -> String {
        let path = path.unwrap_or(&self.default_snapshot_path).to_string();

        if self.snapshot.is_none() {
            if let Ok((blob, token_count)) = self.model.save_state().await {
                self.snapshot = Some(RecurrentStateSnapshot { blob, token_count });
            }
        }

        let Some(snapshot) = &self.snapshot else {
            return String::new();
        };

        match kvd_snapshot::save_state(snapshot, &path) {
            Ok(n) => {
                TraceEvent::SnapshotSaved {
                    path: path.clone(),
                    bytes: n,
                }
                .emit();
                format!("[saved -> {path} ({n} bytes)]\n")
            }
            Err(e) => format!("[save/load error] {e}\n"),
        }
    }

    async fn cmd_load(&mut self, path: Option<&str>) -> String {
        let path = path.unwrap_or(&self.default_snapshot_path).to_string();
        match self.load_state_from(&path).await {
            Ok(()) => format!("[loaded <- {path}]\n"),
            Err(e) => format!("[save/load error] {e}\n"),
        }
    }

    fn cmd_save_set(&mut self, path: Option<&str>) -> String {
        let path = path.unwrap_or(&self.default_profile_path).to_string();
        match kvd_snapshot::save_profile(self.profile, &path) {
            Ok(n) => {
                TraceEvent::ProfileSaved {
                    path: path.clone(),
                    bytes: n,
                }
                .emit();
                format!("[saved set -> {path} ({n} bytes)]\n")
            }
            Err(e) => format!("[save/load error] {e}\n"),
        }
    }

    fn cmd_load_set(&mut self, path: Option<&str>) -> String {
        let path = path.unwrap_or(&self.default_profile_path).to_string();
        match self.load_profile_from(&path) {
            Ok(()) => format!("[loaded set <- {path}]\n"),
            Err(e) => format!("[save/load error] {e}\n"),
        }
    }

    async fn cmd_reset(&mut self) -> String {
        let _ = self.model.reset().await;
        self.snapshot = None;
        "[reset]\n".to_string()
    }

    fn cmd_profile(&mut self, name: Option<&str>) -> String {
        match name {
            None => format!("profile = {}\n", self.active_profile_name),
            Some(name) => match name.to_lowercase().as_str() {
                "rwkv" => {
                    self.profile = SamplingProfile::rwkv_default();
                    self.active_profile_name = "rwkv";
                    "[profile -> rwkv]\n".to_string()
                }
                "mamba" => {
                    self.profile = SamplingProfile::mamba_default();
                    self.active_profile_name = "mamba";
                    "[profile -> mamba]\n".to_string()
                }
                _ => format!("[unknown profile: {name}]\n"),
            },
        }
    }

    /// Load a snapshot into the live model, resetting first. Used both by
    /// the `/load` command (whose reply surfaces the error text) and by
    /// bang-header preprocessing (which only cares whether it succeeded).
    async fn load_state_from(&mut self, path: &str) -> kvd_domain::error::Result<()> {
        let snapshot = match kvd_snapshot::load_state(path) {
            Ok(s) => s,
            Err(e) => {
                TraceEvent::SnapshotLoadFailed {
                    path: path.to_string(),
                    reason: e.to_string(),
                }
                .emit();
                return Err(e);
            }
        };
        self.model.reset().await?;
        self.model
            .load_state(&snapshot.blob, snapshot.token_count)
            .await?;
        TraceEvent::SnapshotLoaded {
            path: path.to_string(),
            bytes: snapshot.blob.len(),
        }
        .emit();
        self.snapshot = Some(snapshot);
        Ok(())
    }

    fn load_profile_from(&mut self, path: &str) -> kvd_domain::error::Result<()> {
        let profile = kvd_snapshot::load_profile(path)?;
        self.profile = profile;
        TraceEvent::ProfileLoaded {
            path: path.to_string(),
        }
        .emit();
        Ok(())
    }

    async fn save_state_to(&mut self, path: &str) -> bool {
        if self.snapshot.is_none() {
            if let Ok((blob, token_count)) = self.model.save_state().await {
                self.snapshot = Some(RecurrentStateSnapshot { blob, token_count });
            }
        }
        let Some(snapshot) = &self.snapshot else {
            return false;
        };
        kvd_snapshot::save_state(snapshot, path).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn mock_config() -> Config {
        let mut cfg = Config::default();
        cfg.model.kind = ModelKind::Mock;
        cfg
    }

    #[tokio::test]
    async fn a_bare_prompt_returns_a_forced_fence() {
        let mut server = Server::new(&mock_config());
        let reply = server.handle_payload("hello").await;
        assert!(reply.ends_with("~~~\n\n"));
    }

    #[tokio::test]
    async fn empty_body_produces_an_empty_reply_and_runs_no_generation() {
        let mut server = Server::new(&mock_config());
        let reply = server.handle_payload("").await;
        assert_eq!(reply, "");
    }

    #[tokio::test]
    async fn unknown_command_is_silently_ignored() {
        let mut server = Server::new(&mock_config());
        let reply = server.handle_payload("/nonsense").await;
        assert_eq!(reply, "");
    }

    #[tokio::test]
    async fn get_and_set_a_knob_round_trips() {
        let mut server = Server::new(&mock_config());
        let set_reply = server.handle_payload("/t 0.42").await;
        assert_eq!(set_reply, "");
        let get_reply = server.handle_payload("/t").await;
        assert_eq!(get_reply, "temp = 0.420\n");
    }

    #[tokio::test]
    async fn invalid_knob_value_leaves_it_unchanged() {
        let mut server = Server::new(&mock_config());
        server.handle_payload("/t not-a-number").await;
        let get_reply = server.handle_payload("/t").await;
        assert_eq!(get_reply, "temp = 0.700\n");
    }

    #[tokio::test]
    async fn save_then_load_round_trips_through_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kv.pkl");
        let path_str = path.to_str().unwrap();

        let mut server = Server::new(&mock_config());
        server.handle_payload("hello").await;
        let save_reply = server.handle_payload(&format!("/save {path_str}")).await;
        assert!(save_reply.starts_with("[saved -> "));

        let load_reply = server.handle_payload(&format!("/load {path_str}")).await;
        assert_eq!(load_reply, format!("[loaded <- {path_str}]\n"));
    }

    #[tokio::test]
    async fn reset_clears_the_snapshot() {
        let mut server = Server::new(&mock_config());
        server.handle_payload("hello").await;
        assert!(server.snapshot.is_some());
        let reply = server.handle_payload("/reset").await;
        assert_eq!(reply, "[reset]\n");
        assert!(server.snapshot.is_none());
    }

    #[tokio::test]
    async fn profile_switch_applies_all_seven_knobs_at_once() {
        let mut server = Server::new(&mock_config());
        let reply = server.handle_payload("/profile mamba").await;
        assert_eq!(reply, "[profile -> mamba]\n");
        assert_eq!(server.profile, SamplingProfile::mamba_default());
    }

    #[tokio::test]
    async fn bang_header_with_an_absent_path_is_silently_ignored() {
        let mut server = Server::new(&mock_config());
        let reply = server
            .handle_payload("!does-not-exist.pkl\nhello")
            .await;
        assert!(reply.ends_with("~~~\n\n"));
    }

    #[tokio::test]
    async fn show_settings_begins_with_brand_and_contains_full_knob_names() {
        let mut server = Server::new(&Config::default());
        let reply = server.handle_payload("/?").await;
        assert!(reply.starts_with("RWKV"));
        assert!(reply.contains("temp = 0.700"));
        assert!(reply.contains("top_p = 0.950"));
    }

    #[tokio::test]
    async fn failed_load_surfaces_the_error_reason() {
        let mut server = Server::new(&mock_config());
        let reply = server.handle_payload("/load does-not-exist.pkl").await;
        assert!(reply.starts_with("[save/load error] "));
    }
}
