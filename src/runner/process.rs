use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

use super::env::merge_env;
use crate::error::{Result, RunError};

/// One external program invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// `None` runs in the invocation root
    pub working_dir: Option<PathBuf>,
    /// Added on top of the inherited environment
    pub env: Vec<(&'static str, String)>,
    /// Relay stdout lines to our own stdout
    pub echo_stdout: bool,
    /// Inherit stderr; otherwise it is discarded
    pub inherit_stderr: bool,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            env: Vec::new(),
            echo_stdout: true,
            inherit_stderr: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn envs(mut self, env: Vec<(&'static str, String)>) -> Self {
        self.env = env;
        self
    }

    pub fn echo_stdout(mut self, echo: bool) -> Self {
        self.echo_stdout = echo;
        self
    }

    pub fn inherit_stderr(mut self, inherit: bool) -> Self {
        self.inherit_stderr = inherit;
        self
    }

    /// `program arg1 arg2`, for messages
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Run a command to completion, printing its stdout line by line as it arrives.
pub async fn run(spec: &CommandSpec) -> Result<()> {
    run_streaming(spec, |line| println!("{}", line)).await
}

/// Run a command to completion, handing each stdout line to `on_line`.
///
/// Lines are delivered as they are read, not after the process exits. Lines
/// are only delivered when `echo_stdout` is set; stdout is drained either way.
pub async fn run_streaming<F>(spec: &CommandSpec, mut on_line: F) -> Result<()>
where
    F: FnMut(&str),
{
    let env = merge_env(std::env::vars_os(), &spec.env);

    let mut command = Command::new(&spec.program);
    command
        .args(&spec.args)
        .env_clear()
        .envs(&env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(if spec.inherit_stderr {
            Stdio::inherit()
        } else {
            Stdio::null()
        });
    if let Some(dir) = &spec.working_dir {
        command.current_dir(dir);
    }

    debug!(command = %spec.display(), cwd = ?spec.working_dir, "Starting process");
    let mut child = command.spawn().map_err(|source| RunError::Spawn {
        program: spec.program.clone(),
        source,
    })?;

    if let Some(stdout) = child.stdout.take() {
        let mut segments = BufReader::new(stdout).split(b'\n');
        loop {
            match segments.next_segment().await {
                Ok(Some(mut bytes)) => {
                    if bytes.last() == Some(&b'\r') {
                        bytes.pop();
                    }
                    if spec.echo_stdout {
                        on_line(&String::from_utf8_lossy(&bytes));
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(command = %spec.display(), error = %e, "Stopped reading stdout");
                    break;
                }
            }
        }
    }

    let status = child.wait().await.map_err(|source| RunError::Spawn {
        program: spec.program.clone(),
        source,
    })?;
    debug!(command = %spec.display(), code = ?status.code(), "Process exited");

    if !status.success() {
        return Err(RunError::Exit {
            command: spec.display(),
            code: status.code(),
        });
    }
    Ok(())
}
