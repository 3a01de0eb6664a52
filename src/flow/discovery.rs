use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::debug;

use crate::config::Language;
use crate::error::{Result, RunError};

/// How candidate files are selected
#[derive(Debug, Clone)]
pub enum FlowSelector {
    /// Every file whose name matches the configured (end-anchored) pattern
    Pattern(Regex),
    /// An explicitly requested flow name
    Named(String),
}

/// A flow file and the file actually handed to the interpreter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFlow {
    pub source: PathBuf,
    pub target: PathBuf,
}

/// Finds scripted flows under `.okareo/flows`
pub struct FlowDiscovery {
    flows_dir: PathBuf,
    dist_dir: PathBuf,
    language: Language,
}

impl FlowDiscovery {
    pub fn new(okareo_dir: impl AsRef<Path>, language: Language) -> Self {
        let okareo_dir = okareo_dir.as_ref();
        Self {
            flows_dir: okareo_dir.join("flows"),
            dist_dir: okareo_dir.join("dist"),
            language,
        }
    }

    pub fn flows_dir(&self) -> &Path {
        &self.flows_dir
    }

    /// Regex for an explicitly named flow: `<name>(<ext>)`, unanchored.
    ///
    /// This matches any file whose name contains the requested name directly
    /// followed by the extension, e.g. `eval` also selects `my_eval.py`.
    pub fn named_matcher(&self, name: &str) -> Result<Regex> {
        let ext = self.language.extension().unwrap_or_default();
        Regex::new(&format!("{}({})", name, ext)).map_err(|source| RunError::FlowName {
            name: name.to_string(),
            source,
        })
    }

    /// Matching flows in directory iteration order (not sorted).
    pub fn discover(&self, selector: &FlowSelector) -> Result<Vec<DiscoveredFlow>> {
        let matcher = match selector {
            FlowSelector::Pattern(regex) => regex.clone(),
            FlowSelector::Named(name) => self.named_matcher(name)?,
        };

        let mut flows = self.scan(&self.flows_dir, &self.dist_dir, &matcher)?;

        // Compiled TypeScript configs live one level down; only pattern runs pick them up
        if self.language == Language::TypeScript && matches!(selector, FlowSelector::Pattern(_)) {
            let config_dir = self.flows_dir.join("config");
            if config_dir.is_dir() {
                flows.extend(self.scan(&config_dir, &self.dist_dir.join("config"), &matcher)?);
            }
        }

        Ok(flows)
    }

    fn scan(&self, dir: &Path, dist_dir: &Path, matcher: &Regex) -> Result<Vec<DiscoveredFlow>> {
        let read_err = |source| RunError::Discovery {
            path: dir.to_path_buf(),
            source,
        };

        let mut flows = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(read_err)? {
            let entry = entry.map_err(read_err)?;
            let file_name = entry.file_name().to_string_lossy().into_owned();
            let is_match = matcher.is_match(&file_name);
            debug!(file = %file_name, is_match, "Match file");
            if !is_match {
                continue;
            }

            let source = entry.path();
            let target = match self.language {
                Language::TypeScript => dist_dir.join(compiled_name(&file_name)),
                _ => source.clone(),
            };
            flows.push(DiscoveredFlow { source, target });
        }
        Ok(flows)
    }
}

/// `name.ts` -> `name.js`; everything after the first dot is replaced
fn compiled_name(file_name: &str) -> String {
    let stem = file_name.split('.').next().unwrap_or(file_name);
    format!("{}.js", stem)
}
