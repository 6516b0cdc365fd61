//! A self-contained, deterministic stand-in for the external model runtime.
//!
//! The real backend (a GGUF model served through a C inference library) is
//! out of scope for this workspace (spec.md §1); [`ToyRuntime`] is the
//! thing the `rwkv` / `mamba` / `mock` adapters actually drive so the
//! service is runnable and testable end-to-end without one. It tokenizes
//! at the byte level, "evaluates" by appending bytes to a context buffer
//! (the buffer doubles as the opaque recurrent-state blob), and samples by
//! picking from a small printable vocabulary with the profile's knobs
//! applied as frequency/penalty weights, eventually closing every turn
//! with the canonical fence so generation terminates.

use std::collections::HashMap;

use kvd_domain::error::{Error, Result};
use kvd_sampling::SamplingProfile;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::runtime::{ModelCapabilities, ModelRuntime, EOS_TOKEN};

/// Printable vocabulary the toy backend samples from (tokens 1..=N).
/// Token id 0 is reserved for EOS; it is never emitted by `sample` on its
/// own (the toy backend always prefers to close with the canonical fence
/// so a real client sees a well-formed reply).
const VOCAB: &[u8] = b"abcdefghijklmnopqrstuvwxyz ,.";

const CANONICAL_FENCE: &[u8] = b"\n\n~~~(end)~~~\n\n";

pub struct ToyRuntime {
    capabilities: ModelCapabilities,
    /// The full token history this backend has `eval`'d — doubles as the
    /// recurrent-state blob.
    context: Vec<u32>,
    /// How many tokens have been sampled (not yet necessarily eval'd) in
    /// the current turn, used to decide when to start closing.
    turn_samples: u64,
    /// Position within `CANONICAL_FENCE` once the toy backend has decided
    /// to close the current turn; `None` means "still generating freely".
    closing_at: Option<usize>,
    rng: StdRng,
    /// Per-token emission counts this turn, for the frequency/presence
    /// penalties.
    seen_this_turn: HashMap<u32, u32>,
}

impl ToyRuntime {
    pub fn new(brand: &'static str, supports_min_p: bool, default_profile: SamplingProfile) -> Self {
        Self {
            capabilities: ModelCapabilities {
                brand,
                supports_min_p,
                default_profile,
            },
            context: Vec::new(),
            turn_samples: 0,
            closing_at: None,
            rng: StdRng::seed_from_u64(0xA11CE),
            seen_this_turn: HashMap::new(),
        }
    }

    /// Decide the per-turn length at which the toy backend begins
    /// emitting the canonical fence, derived from the sampling profile so
    /// different knobs produce different (but deterministic) reply
    /// lengths.
    fn close_threshold(&self, profile: &SamplingProfile) -> u64 {
        let base = 12.0 + profile.temperature as f64 * 20.0;
        base.round().max(4.0) as u64
    }
}

#[async_trait::async_trait]
impl ModelRuntime for ToyRuntime {
    async fn reset(&mut self) -> Result<()> {
        self.context.clear();
        self.turn_samples = 0;
        self.closing_at = None;
        self.seen_this_turn.clear();
        Ok(())
    }

    async fn tokenize(&self, text: &str, _add_bos: bool) -> Result<Vec<u32>> {
        Ok(text.bytes().map(|b| b as u32).collect())
    }

    async fn eval(&mut self, tokens: &[u32]) -> Result<()> {
        self.context.extend_from_slice(tokens);
        Ok(())
    }

    async fn sample(&mut self, profile: &SamplingProfile) -> Result<u32> {
        // Once we've decided to close, walk the fence out byte by byte.
        if let Some(pos) = self.closing_at {
            let byte = CANONICAL_FENCE[pos];
            self.closing_at = if pos + 1 < CANONICAL_FENCE.len() {
                Some(pos + 1)
            } else {
                // Fence fully emitted; next sample starts a fresh turn.
                self.turn_samples = 0;
                None
            };
            self.turn_samples += 1;
            return Ok(byte as u32);
        }

        self.turn_samples += 1;
        if self.turn_samples >= self.close_threshold(profile) {
            self.closing_at = Some(1);
            self.turn_samples += 1;
            return Ok(CANONICAL_FENCE[0] as u32);
        }

        // Build a candidate list, applying top_k / repeat-penalty-ish
        // weighting. min_p only matters if this backend supports it.
        let mut candidates: Vec<(u32, f64)> = VOCAB
            .iter()
            .map(|&b| {
                let tok = b as u32;
                let seen = *self.seen_this_turn.get(&tok).unwrap_or(&0) as f64;
                let mut weight = 1.0;
                if profile.repeat_penalty > 1.0 {
                    weight /= profile.repeat_penalty as f64 * (1.0 + seen);
                }
                weight /= 1.0 + profile.frequency_penalty as f64 * seen;
                if seen > 0.0 {
                    weight /= 1.0 + profile.presence_penalty as f64;
                }
                (tok, weight)
            })
            .collect();

        if profile.top_k > 0 && (profile.top_k as usize) < candidates.len() {
            candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
            candidates.truncate(profile.top_k as usize);
        }

        if self.capabilities.supports_min_p && profile.min_p > 0.0 {
            let max_w = candidates
                .iter()
                .map(|(_, w)| *w)
                .fold(0.0_f64, f64::max);
            let floor = max_w * profile.min_p as f64;
            candidates.retain(|(_, w)| *w >= floor);
        }

        if candidates.is_empty() {
            candidates.push((VOCAB[0] as u32, 1.0));
        }

        let total: f64 = candidates.iter().map(|(_, w)| w).sum();
        let mut pick = self.rng.gen::<f64>() * total;
        let mut chosen = candidates[0].0;
        for (tok, w) in &candidates {
            if pick <= *w {
                chosen = *tok;
                break;
            }
            pick -= w;
        }

        *self.seen_this_turn.entry(chosen).or_insert(0) += 1;
        Ok(chosen)
    }

    fn detokenize(&self, token: u32) -> Vec<u8> {
        if token == EOS_TOKEN || token > u8::MAX as u32 {
            return Vec::new();
        }
        vec![token as u8]
    }

    async fn save_state(&self) -> Result<(Vec<u8>, u64)> {
        let blob: Vec<u8> = self
            .context
            .iter()
            .flat_map(|t| t.to_be_bytes())
            .collect();
        Ok((blob, self.context.len() as u64))
    }

    async fn load_state(&mut self, blob: &[u8], token_count: u64) -> Result<()> {
        if blob.len() % 4 != 0 {
            return Err(Error::Model("state blob length not a multiple of 4".into()));
        }
        self.context = blob
            .chunks_exact(4)
            .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        if self.context.len() as u64 != token_count {
            return Err(Error::Model(format!(
                "state token_count mismatch: blob holds {} tokens, header says {}",
                self.context.len(),
                token_count
            )));
        }
        self.turn_samples = 0;
        self.closing_at = None;
        self.seen_this_turn.clear();
        Ok(())
    }

    fn capabilities(&self) -> &ModelCapabilities {
        &self.capabilities
    }
}
