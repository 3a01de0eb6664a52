mod env;
mod run_config;

pub use env::resolve_endpoint;
pub(crate) use run_config::nullable;
pub use run_config::{FlowDefinition, Language, RunConfig};
