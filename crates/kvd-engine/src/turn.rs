//! Turn controller (spec.md §4.5): wraps one generation call with the
//! snapshot load/capture bookkeeping around it. Never touches a transcript
//! — that's the tool's job (spec.md §4.8).

use kvd_domain::error::Result;
use kvd_model::ModelRuntime;
use kvd_sampling::SamplingProfile;
use kvd_snapshot::RecurrentStateSnapshot;

use crate::generate::generate;

/// Run one turn: optionally restore `incoming_snapshot`, feed `prompt`,
/// run the generation engine, and return the reply alongside a fresh
/// snapshot of the resulting state.
pub async fn take_turn(
    model: &mut dyn ModelRuntime,
    profile: &SamplingProfile,
    budget_chars: usize,
    prompt: &str,
    incoming_snapshot: Option<&RecurrentStateSnapshot>,
) -> Result<(String, RecurrentStateSnapshot)> {
    if let Some(snapshot) = incoming_snapshot {
        model.reset().await?;
        model.load_state(&snapshot.blob, snapshot.token_count).await?;
    }

    let prompt_tokens = model.tokenize(prompt, false).await?;
    model.eval(&prompt_tokens).await?;

    let reply = generate(model, profile, budget_chars).await?;

    let (blob, token_count) = model.save_state().await?;
    Ok((reply, RecurrentStateSnapshot { blob, token_count }))
}
