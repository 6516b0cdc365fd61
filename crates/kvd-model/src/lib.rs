pub mod registry;
pub mod runtime;
pub mod toy;

pub use registry::build_runtime;
pub use runtime::{ModelCapabilities, ModelRuntime, EOS_TOKEN};
