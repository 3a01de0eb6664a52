mod api;
mod config;
mod coordinator;
mod error;
mod flow;
mod runner;
mod telemetry;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::info;

use api::OkareoClient;
use config::{resolve_endpoint, RunConfig};
use coordinator::{RunCoordinator, RunOptions, RunOutcome};
use runner::{BootstrapOptions, ScriptRunner};

/// `-f` value meaning "every flow matching the configured pattern"
const ALL_FLOWS: &str = "ALL";

#[derive(Parser)]
#[command(name = "okareo")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run Okareo evaluation flows", long_about = None)]
struct Cli {
    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run declarative flows from the config, then scripted flows
    Run(RunArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Path to the config file
    #[arg(short, long, default_value = "./.okareo/config.yml")]
    config: PathBuf,

    /// Flow to run; ALL runs every flow matching the file pattern
    #[arg(short, long, default_value = ALL_FLOWS)]
    file: String,

    /// Verbose diagnostics
    #[arg(short, long)]
    debug: bool,

    /// Force-upgrade the Python SDK before running
    #[arg(short, long)]
    upgrade: bool,

    /// Install the latest Python SDK before running
    #[arg(short, long, default_value_t = true, action = ArgAction::Set)]
    latest: bool,

    /// Directory for per-flow JSON reports [default: <config dir>/reports]
    #[arg(long)]
    reports_dir: Option<PathBuf>,

    /// Exported to scripted flows as OKAREO_JSON_OUTPUT_FILE
    #[arg(long)]
    output_file: Option<PathBuf>,
}

impl RunArgs {
    fn flow_name(&self) -> Option<String> {
        (self.file != ALL_FLOWS).then(|| self.file.clone())
    }

    /// The `.okareo` directory: wherever the config file lives
    fn okareo_dir(&self) -> PathBuf {
        self.config
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    fn reports_dir(&self) -> PathBuf {
        self.reports_dir
            .clone()
            .unwrap_or_else(|| self.okareo_dir().join("reports"))
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run(args) => {
            telemetry::init_tracing(cli.json, telemetry::level_for(args.debug));
            run(args).await
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

async fn run(args: RunArgs) -> anyhow::Result<()> {
    let config = RunConfig::load(&args.config)?;
    let okareo_dir = args.okareo_dir();
    let reports_dir = args.reports_dir();
    let flow_name = args.flow_name();

    let client = OkareoClient::new(resolve_endpoint(), config.resolved_api_key())?;
    info!(endpoint = %client.endpoint(), config = %args.config.display(), "Loaded config");

    let runner = ScriptRunner::new(
        &okareo_dir,
        BootstrapOptions {
            install_latest: args.latest,
            upgrade: args.upgrade,
            debug: args.debug,
        },
    );
    let options = RunOptions {
        okareo_dir,
        reports_dir,
        flow_name,
        json_output_file: args.output_file,
    };

    let coordinator = RunCoordinator::new(config, options, client, runner);
    let run_id = coordinator.run_id().to_string();
    info!(%run_id, "Starting run");

    let outcome = coordinator
        .run()
        .await
        .with_context(|| format!("run {} failed", run_id))?;

    if let RunOutcome::Finished(summary) = outcome {
        info!(
            completed = summary.completed.len(),
            skipped = summary.skipped.len(),
            scripts = summary.scripts.len(),
            "Run finished"
        );
    }
    Ok(())
}
