//! Backend selection.
//!
//! Unlike a multi-provider LLM registry, the driver owns exactly one live
//! model instance at a time (spec.md §3 Ownership), so this is a single
//! factory function keyed off [`ModelKind`] rather than a `HashMap` of
//! live instances.

use kvd_domain::config::ModelKind;
use kvd_sampling::SamplingProfile;

use crate::runtime::ModelRuntime;
use crate::toy::ToyRuntime;

/// Build the configured backend. `model_path` is accepted for interface
/// fidelity with a real loader (spec.md §9's capability interface) but
/// unused by the toy backend that stands in for it here.
pub fn build_runtime(kind: ModelKind, _model_path: Option<&str>) -> Box<dyn ModelRuntime> {
    match kind {
        ModelKind::Rwkv => {
            Box::new(ToyRuntime::new("RWKV", false, SamplingProfile::rwkv_default()))
        }
        ModelKind::Mamba => {
            Box::new(ToyRuntime::new("MAMBA", true, SamplingProfile::mamba_default()))
        }
        ModelKind::Mock => {
            Box::new(ToyRuntime::new("MOCK", true, SamplingProfile::rwkv_default()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rwkv_backend_does_not_support_min_p() {
        let rt = build_runtime(ModelKind::Rwkv, None);
        assert!(!rt.capabilities().supports_min_p);
        assert_eq!(rt.capabilities().brand, "RWKV");
    }

    #[test]
    fn mamba_backend_supports_min_p() {
        let rt = build_runtime(ModelKind::Mamba, None);
        assert!(rt.capabilities().supports_min_p);
        assert_eq!(rt.capabilities().brand, "MAMBA");
    }
}
