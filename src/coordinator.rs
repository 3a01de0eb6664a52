use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::api::{provider_credential, TestRunApi, TestRunResult};
use crate::config::{Language, RunConfig};
use crate::error::{ApiError, Result, RunError};
use crate::flow::{FlowDiscovery, FlowSelector, ReportStore};
use crate::runner::{FlowEnv, FlowExecutor};

/// Invocation settings that do not come from the config file
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Directory holding `flows/`, `dist/` and the npm manifests
    pub okareo_dir: PathBuf,
    pub reports_dir: PathBuf,
    /// Explicit flow name; `None` selects by the configured pattern
    pub flow_name: Option<String>,
    pub json_output_file: Option<PathBuf>,
}

/// What a finished run did
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Declarative flows whose test run was created, in order
    pub completed: Vec<TestRunResult>,
    /// Declarative flows skipped because their model lookup failed
    pub skipped: Vec<String>,
    /// Scripted flows that ran to completion
    pub scripts: Vec<PathBuf>,
    /// Explicitly requested flow that matched no file
    pub missing_flow: Option<String>,
}

#[derive(Debug)]
pub enum RunOutcome {
    /// No declarative flows and no supported language
    NothingToRun,
    Finished(RunSummary),
}

/// Drives declarative flows then scripted flows, strictly one at a time
pub struct RunCoordinator<A, E> {
    config: RunConfig,
    options: RunOptions,
    api: A,
    executor: E,
    run_id: String,
}

impl<A: TestRunApi, E: FlowExecutor> RunCoordinator<A, E> {
    pub fn new(config: RunConfig, options: RunOptions, api: A, executor: E) -> Self {
        let run_id = config.run_id();
        Self {
            config,
            options,
            api,
            executor,
            run_id,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub async fn run(mut self) -> Result<RunOutcome> {
        let run_declarative = !self.config.declarative_flows.is_empty();
        let run_scripts = self.config.language.is_supported();

        if let Language::Unsupported(raw) = &self.config.language {
            println!("Language not supported: {}", raw);
        }
        if !run_declarative && !run_scripts {
            println!("No flows or scripts to run.");
            return Ok(RunOutcome::NothingToRun);
        }

        info!(run_id = %self.run_id, reports = %self.options.reports_dir.display(), "Preparing reports");
        let mut reports = ReportStore::prepare(&self.options.reports_dir)?;
        let mut summary = RunSummary::default();

        if run_declarative {
            self.run_declarative(&mut reports, &mut summary).await?;
        }
        if run_scripts {
            self.run_scripts(&reports, &mut summary).await?;
        }

        Ok(RunOutcome::Finished(summary))
    }

    async fn run_declarative(
        &mut self,
        reports: &mut ReportStore,
        summary: &mut RunSummary,
    ) -> Result<()> {
        info!(count = self.config.declarative_flows.len(), "Running declarative flows");

        for flow in self.config.declarative_flows.iter_mut() {
            let model = match self.api.fetch_model(&flow.model_id).await {
                Ok(model) => model,
                Err(ApiError::Transport(e)) => {
                    println!("Cannot verify API key. Skipping flow: {}", flow.name);
                    warn!(flow = %flow.name, error = %e, "Model lookup failed");
                    summary.skipped.push(flow.name.clone());
                    continue;
                }
                Err(e) => {
                    println!("Invalid model_id for flow {}: {}", flow.name, flow.model_id);
                    warn!(flow = %flow.name, error = %e, "Model lookup failed");
                    summary.skipped.push(flow.name.clone());
                    continue;
                }
            };

            flow.project_id = model.project_id.clone();
            let provider = model.provider();
            let provider_key = provider
                .map(|p| provider_credential(p, |name| std::env::var(name).ok()))
                .unwrap_or_default();
            debug!(flow = %flow.name, provider = ?provider, project_id = %flow.project_id, "Creating test run");

            let response = self
                .api
                .create_test_run(flow, provider, &provider_key)
                .await
                .map_err(|source| RunError::RunCreation {
                    flow: flow.name.clone(),
                    source,
                })?;

            println!("Completed: {}", response.run.name);
            println!("ID: {}", response.run.id);
            println!("Link: {}", response.run.app_link);
            println!("-----");

            let path = reports.write(&flow.name, &response.body)?;
            debug!(report = %path.display(), "Report written");
            summary.completed.push(response.run);
        }
        Ok(())
    }

    async fn run_scripts(&self, reports: &ReportStore, summary: &mut RunSummary) -> Result<()> {
        let language = self.config.language.clone();
        let selector = match &self.options.flow_name {
            Some(name) => FlowSelector::Named(name.clone()),
            None => FlowSelector::Pattern(self.config.file_regex()?),
        };

        info!(%language, "Running scripted flows");
        self.executor.bootstrap(&language).await?;

        let discovery = FlowDiscovery::new(&self.options.okareo_dir, language.clone());
        let flows = discovery.discover(&selector)?;
        debug!(dir = %discovery.flows_dir().display(), count = flows.len(), "Discovered flows");

        let env = FlowEnv {
            run_id: self.run_id.clone(),
            api_key: self.config.resolved_api_key(),
            project_id: self.config.resolved_project_id(),
            json_output_file: self
                .options
                .json_output_file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            report_dir: reports.dir().display().to_string(),
        };

        for flow in &flows {
            println!("Running {}", flow.source.display());
            self.executor.execute(&language, flow, &env).await?;
            summary.scripts.push(flow.source.clone());
        }

        if let FlowSelector::Named(name) = selector {
            if flows.is_empty() {
                println!("Flow not found: {}", name);
                summary.missing_flow = Some(name);
            }
        }
        Ok(())
    }
}
