mod env;
mod process;
mod toolchain;

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::info;

use crate::config::Language;
use crate::error::{Result, RunError};
use crate::flow::DiscoveredFlow;

pub use env::FlowEnv;
pub use process::CommandSpec;
pub use toolchain::BootstrapOptions;

/// Executes scripted flows
#[async_trait]
pub trait FlowExecutor: Send + Sync {
    /// One-time setup for `language`: dependency install, compile step
    async fn bootstrap(&self, language: &Language) -> Result<()>;

    /// Run one flow to completion. Any failure is fatal for the run.
    async fn execute(
        &self,
        language: &Language,
        flow: &DiscoveredFlow,
        env: &FlowEnv,
    ) -> Result<()>;
}

/// Runs flows as child processes of the matching interpreter
pub struct ScriptRunner {
    okareo_dir: PathBuf,
    options: BootstrapOptions,
}

impl ScriptRunner {
    pub fn new(okareo_dir: impl Into<PathBuf>, options: BootstrapOptions) -> Self {
        Self {
            okareo_dir: okareo_dir.into(),
            options,
        }
    }

    /// Interpreter invocation for a flow; runs from the invocation root
    pub fn flow_command(
        &self,
        language: &Language,
        flow: &DiscoveredFlow,
        env: &FlowEnv,
    ) -> Option<CommandSpec> {
        let interpreter = language.interpreter()?;
        Some(
            CommandSpec::new(interpreter)
                .arg(flow.target.to_string_lossy())
                .envs(env.overlay())
                .inherit_stderr(self.options.debug),
        )
    }
}

#[async_trait]
impl FlowExecutor for ScriptRunner {
    async fn bootstrap(&self, language: &Language) -> Result<()> {
        toolchain::ensure_manifests(language, &self.okareo_dir)?;
        for step in toolchain::bootstrap_plan(language, &self.okareo_dir, self.options) {
            info!(command = %step.display(), "Bootstrapping {} flows", language);
            process::run(&step).await?;
        }
        Ok(())
    }

    async fn execute(
        &self,
        language: &Language,
        flow: &DiscoveredFlow,
        env: &FlowEnv,
    ) -> Result<()> {
        let spec = self
            .flow_command(language, flow, env)
            .ok_or_else(|| RunError::NoInterpreter {
                language: language.to_string(),
            })?;
        process::run(&spec).await
    }
}
