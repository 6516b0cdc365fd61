//! The generation engine (spec.md §4.4) — the token-by-token loop that
//! turns a live model plus a sampling profile into one reply, normalizing
//! whatever the model produces to end in the canonical fence.

use kvd_domain::error::{Error, Result};
use kvd_model::{ModelRuntime, EOS_TOKEN};
use kvd_sampling::SamplingProfile;

use crate::markers::{FORCE_AFTER_END, FORCE_AFTER_OPENER, FULL_CLOSE, OPENER, PARTIAL_END};

/// Run the generation loop to completion and return the reply text.
///
/// `model`'s recurrent state is advanced by exactly the tokens whose text
/// ends up in the returned string — never by the token that completes
/// [`FULL_CLOSE`], and never by more than the forced-completion suffix
/// when [`PARTIAL_END`] or [`OPENER`] triggers early.
pub async fn generate(
    model: &mut dyn ModelRuntime,
    profile: &SamplingProfile,
    budget_chars: usize,
) -> Result<String> {
    let mut text = String::new();

    loop {
        let token = model.sample(profile).await?;
        if token == EOS_TOKEN {
            break;
        }

        let piece = model.detokenize(token);
        text.push_str(&String::from_utf8_lossy(&piece));

        if text.chars().count() > budget_chars {
            break;
        }

        if text.contains(FULL_CLOSE) {
            break;
        }

        if let Some(idx) = text.rfind(PARTIAL_END) {
            model.eval(&[token]).await?;
            force_completion(&mut text, model, idx + PARTIAL_END.len(), FORCE_AFTER_END).await?;
            break;
        }

        if let Some(idx) = text.rfind(OPENER) {
            model.eval(&[token]).await?;
            force_completion(&mut text, model, idx + OPENER.len(), FORCE_AFTER_OPENER).await?;
            break;
        }

        model.eval(&[token]).await?;
    }

    Ok(text)
}

/// Append whatever suffix of `target` isn't already present starting at
/// `match_end`, and feed that suffix (only) into the model's state.
async fn force_completion(
    text: &mut String,
    model: &mut dyn ModelRuntime,
    match_end: usize,
    target: &str,
) -> Result<()> {
    let remainder = &text.as_bytes()[match_end..];
    let target_bytes = target.as_bytes();
    let shared = remainder
        .iter()
        .zip(target_bytes.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let missing = &target_bytes[shared..];
    if missing.is_empty() {
        return Ok(());
    }

    let missing_str = std::str::from_utf8(missing)
        .map_err(|e| Error::Other(format!("forced completion suffix was not UTF-8: {e}")))?;
    text.push_str(missing_str);

    let tokens = model.tokenize(missing_str, false).await?;
    model.eval(&tokens).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use kvd_model::ModelCapabilities;

    /// A model stub driven by a fixed token script, so each rule path can
    /// be exercised without depending on the toy backend's own pacing.
    struct ScriptedRuntime {
        script: Vec<u32>,
        cursor: usize,
        evaluated: Vec<u32>,
        capabilities: ModelCapabilities,
    }

    impl ScriptedRuntime {
        fn new(text: &str) -> Self {
            Self {
                script: text.bytes().map(|b| b as u32).collect(),
                cursor: 0,
                evaluated: Vec::new(),
                capabilities: ModelCapabilities {
                    brand: "SCRIPT",
                    supports_min_p: true,
                    default_profile: SamplingProfile::rwkv_default(),
                },
            }
        }
    }

    #[async_trait]
    impl ModelRuntime for ScriptedRuntime {
        async fn reset(&mut self) -> Result<()> {
            self.cursor = 0;
            self.evaluated.clear();
            Ok(())
        }

        async fn tokenize(&self, text: &str, _add_bos: bool) -> Result<Vec<u32>> {
            Ok(text.bytes().map(|b| b as u32).collect())
        }

        async fn eval(&mut self, tokens: &[u32]) -> Result<()> {
            self.evaluated.extend_from_slice(tokens);
            Ok(())
        }

        async fn sample(&mut self, _profile: &SamplingProfile) -> Result<u32> {
            let tok = *self.script.get(self.cursor).unwrap_or(&EOS_TOKEN);
            self.cursor += 1;
            Ok(tok)
        }

        fn detokenize(&self, token: u32) -> Vec<u8> {
            if token == EOS_TOKEN || token > u8::MAX as u32 {
                return Vec::new();
            }
            vec![token as u8]
        }

        async fn save_state(&self) -> Result<(Vec<u8>, u64)> {
            Ok((Vec::new(), 0))
        }

        async fn load_state(&mut self, _blob: &[u8], _token_count: u64) -> Result<()> {
            Ok(())
        }

        fn capabilities(&self) -> &ModelCapabilities {
            &self.capabilities
        }
    }

    #[tokio::test]
    async fn full_close_stops_without_evaluating_its_own_token() {
        // "hi)~~~\n\n" — the model produces the full terminator outright.
        let mut model = ScriptedRuntime::new("hi)~~~\n\n");
        let profile = SamplingProfile::rwkv_default();
        let reply = generate(&mut model, &profile, 1024).await.unwrap();
        assert_eq!(reply, "hi)~~~\n\n");
        // "hi" eval'd one byte at a time, but none of ")~~~\n\n" was.
        assert_eq!(model.evaluated, b"hi".iter().map(|&b| b as u32).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn opener_forces_the_rest_of_the_fence() {
        // Model only ever produces up through the opener; the engine must
        // force the remainder itself.
        let mut model = ScriptedRuntime::new("hi\n~~~(");
        let profile = SamplingProfile::rwkv_default();
        let reply = generate(&mut model, &profile, 1024).await.unwrap();
        assert_eq!(reply, "hi\n~~~(end)~~~\n\n");
        // The opener's own token IS evaluated (rule 7 evaluates before forcing).
        let mut expected: Vec<u32> = b"hi\n~~~(".iter().map(|&b| b as u32).collect();
        expected.extend(b"end)~~~\n\n".iter().map(|&b| b as u32));
        assert_eq!(model.evaluated, expected);
    }

    #[tokio::test]
    async fn partial_end_forces_only_the_missing_tail() {
        // Model limps to "end)~~" without ever producing an opener;
        // force_completion should only append "~\n\n".
        let mut model = ScriptedRuntime::new("hisomeend)~~");
        let profile = SamplingProfile::rwkv_default();
        let reply = generate(&mut model, &profile, 1024).await.unwrap();
        assert_eq!(reply, "hisomeend)~~~\n\n");
    }

    #[tokio::test]
    async fn partial_end_takes_precedence_over_an_earlier_opener() {
        // At the moment "end)~~" becomes the trailing suffix, OPENER is
        // also present earlier in the text. Rule 6 must still win over
        // rule 7 (5 > 6 > 7), so the engine forces toward FORCE_AFTER_END,
        // not FORCE_AFTER_OPENER, and never reaches the rest of the script.
        let mut model = ScriptedRuntime::new("hi\n~~~(xend)~~THIS_NEVER_RUNS");
        let profile = SamplingProfile::rwkv_default();
        let reply = generate(&mut model, &profile, 1024).await.unwrap();
        assert_eq!(reply, "hi\n~~~(xend)~~~\n\n");
    }

    #[tokio::test]
    async fn exact_character_budget_hit_stops_without_forcing() {
        // Budget (rule 4) is checked before FULL_CLOSE/PARTIAL_END/OPENER;
        // a model that never produces any marker just stops cold at M.
        let mut model = ScriptedRuntime::new("abcdefghij");
        let profile = SamplingProfile::rwkv_default();
        let reply = generate(&mut model, &profile, 5).await.unwrap();
        assert_eq!(reply, "abcdef");
        assert_eq!(model.evaluated.len(), 5);
    }

    #[tokio::test]
    async fn eos_token_stops_the_loop_without_evaluation() {
        let mut model = ScriptedRuntime::new("");
        let profile = SamplingProfile::rwkv_default();
        let reply = generate(&mut model, &profile, 1024).await.unwrap();
        assert_eq!(reply, "");
        assert!(model.evaluated.is_empty());
    }
}
