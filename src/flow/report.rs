use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{Result, RunError};

/// Replace every character outside `[A-Za-z0-9_]` with `_`
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Owns the reports directory for the duration of a run
pub struct ReportStore {
    dir: PathBuf,
    /// File stems already handed out in this run
    used: HashSet<String>,
}

impl ReportStore {
    /// Wipe and recreate the reports directory
    pub fn prepare(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        let io_err = |source| RunError::Io {
            path: dir.clone(),
            source,
        };

        if dir.exists() {
            fs::remove_dir_all(&dir).map_err(io_err)?;
        }
        fs::create_dir_all(&dir).map_err(io_err)?;

        Ok(Self {
            dir,
            used: HashSet::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Report path for a flow, unique within this run
    fn claim_path(&mut self, flow_name: &str) -> PathBuf {
        let base = sanitize_name(flow_name);
        let mut stem = base.clone();
        let mut n = 1;
        while !self.used.insert(stem.clone()) {
            n += 1;
            stem = format!("{}_{}", base, n);
        }
        self.dir.join(format!("{}.json", stem))
    }

    /// Write a flow's report as pretty-printed JSON
    pub fn write(&mut self, flow_name: &str, report: &Value) -> Result<PathBuf> {
        let path = self.claim_path(flow_name);
        serde_json::to_string_pretty(report)
            .map_err(std::io::Error::from)
            .and_then(|content| fs::write(&path, content))
            .map_err(|source| RunError::Io {
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }
}
