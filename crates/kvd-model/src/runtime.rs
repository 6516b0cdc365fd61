//! The narrow model capability interface (spec.md §9 "Re-architecture
//! guidance"). Every concrete backend — a local GGUF runtime, a remote
//! inference service, the in-process toy backend used for tests and demos
//! — implements this trait and nothing more. The generation engine
//! (`kvd-engine`) depends only on these six operations plus
//! [`ModelCapabilities`]; binding to any particular runtime is a thin
//! adapter.

use kvd_domain::error::Result;
use kvd_sampling::SamplingProfile;

/// Reserved token id meaning end-of-stream (spec.md §4.4 step 2).
pub const EOS_TOKEN: u32 = 0;

/// Static facts a backend advertises about itself.
#[derive(Debug, Clone)]
pub struct ModelCapabilities {
    /// Branding string surfaced by `/?` (spec.md S1: "RWKV" or "MAMBA").
    pub brand: &'static str,
    /// Whether this backend honors `min_p` at all (spec.md §3, §9 — one
    /// model variant carries it, the other silently ignores it).
    pub supports_min_p: bool,
    /// The sampling profile this backend was designed around.
    pub default_profile: SamplingProfile,
}

/// The model capability interface the generation engine drives.
///
/// `&mut self` methods advance the live recurrent state; `&self` methods
/// are pure queries. Implementations are not required to be `Clone` — the
/// server owns exactly one live instance (spec.md §3 Ownership).
#[async_trait::async_trait]
pub trait ModelRuntime: Send + Sync {
    /// Discard all recurrent state, returning the model to a blank slate.
    async fn reset(&mut self) -> Result<()>;

    /// Tokenize `text` without mutating state. `add_bos` is threaded
    /// through for interface fidelity; the driver always calls this with
    /// `false` (spec.md §4.5, §4.4 rule 6/7).
    async fn tokenize(&self, text: &str, add_bos: bool) -> Result<Vec<u32>>;

    /// Advance the recurrent state by `tokens`, in order.
    async fn eval(&mut self, tokens: &[u32]) -> Result<()>;

    /// Draw one token id under the given sampling knobs. Does not advance
    /// state — the caller decides whether to `eval` it (spec.md §4.4).
    async fn sample(&mut self, profile: &SamplingProfile) -> Result<u32>;

    /// Decode a single token id to its UTF-8 piece. Malformed bytes are
    /// replaced per spec.md §4.4 step 3; this never errors.
    fn detokenize(&self, token: u32) -> Vec<u8>;

    /// Capture the full recurrent state as an opaque blob plus the number
    /// of tokens it represents.
    async fn save_state(&self) -> Result<(Vec<u8>, u64)>;

    /// Replace the recurrent state with one previously produced by
    /// `save_state`. Implementations should reset first.
    async fn load_state(&mut self, blob: &[u8], token_count: u64) -> Result<()>;

    /// Static capability/branding info for this backend.
    fn capabilities(&self) -> &ModelCapabilities;
}
