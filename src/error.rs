use std::path::PathBuf;

use thiserror::Error;

/// Failure to load the run configuration. Always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid file-pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Errors from the remote test-run service
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status}")]
    Status { status: u16, body: String },

    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("response has no '{0}' field")]
    MissingField(&'static str),
}

/// Conditions that abort the whole run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("cannot read flows directory {path}: {source}")]
    Discovery {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid flow name '{name}': {source}")]
    FlowName {
        name: String,
        #[source]
        source: regex::Error,
    },

    #[error("test run for flow '{flow}' could not be created: {source}")]
    RunCreation {
        flow: String,
        #[source]
        source: ApiError,
    },

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} failed (exit code: {code:?})")]
    Exit { command: String, code: Option<i32> },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("invalid API endpoint '{endpoint}': {reason}")]
    Endpoint { endpoint: String, reason: String },

    #[error("no interpreter for language '{language}'")]
    NoInterpreter { language: String },
}

pub type Result<T, E = RunError> = std::result::Result<T, E>;
