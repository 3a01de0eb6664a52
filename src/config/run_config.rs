use std::fmt;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Deserializer};
use uuid::Uuid;

use super::env::resolve_indirect;
use crate::error::ConfigError;

/// Scripting language selected for scripted flows
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Language {
    /// No scripted flows are attempted
    #[default]
    Unset,
    Python,
    JavaScript,
    TypeScript,
    /// A non-empty value naming no supported language
    Unsupported(String),
}

impl Language {
    /// Case-insensitive, with `py` / `js` / `ts` aliases
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        match trimmed.to_lowercase().as_str() {
            "" => Self::Unset,
            "python" | "py" => Self::Python,
            "javascript" | "js" => Self::JavaScript,
            "typescript" | "ts" => Self::TypeScript,
            _ => Self::Unsupported(trimmed.to_string()),
        }
    }

    /// Extension of flow source files, including the leading dot
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            Self::Python => Some(".py"),
            Self::JavaScript => Some(".js"),
            Self::TypeScript => Some(".ts"),
            Self::Unset | Self::Unsupported(_) => None,
        }
    }

    /// Program that executes a (compiled) flow file
    pub fn interpreter(&self) -> Option<&'static str> {
        match self {
            Self::Python => Some("python3"),
            Self::JavaScript | Self::TypeScript => Some("node"),
            Self::Unset | Self::Unsupported(_) => None,
        }
    }

    pub fn is_supported(&self) -> bool {
        self.extension().is_some()
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => f.write_str("unset"),
            Self::Python => f.write_str("python"),
            Self::JavaScript => f.write_str("javascript"),
            Self::TypeScript => f.write_str("typescript"),
            Self::Unsupported(raw) => f.write_str(raw),
        }
    }
}

impl<'de> Deserialize<'de> for Language {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.map(|value| Self::parse(&value)).unwrap_or_default())
    }
}

/// YAML `key:` with no value deserializes as null; treat it like a missing key.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One declarative evaluation request
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FlowDefinition {
    pub name: String,
    #[serde(default, rename = "model-id", deserialize_with = "nullable")]
    pub model_id: String,
    #[serde(default, rename = "scenario-id", deserialize_with = "nullable")]
    pub scenario_id: String,
    #[serde(default, rename = "type", deserialize_with = "nullable")]
    pub run_type: String,
    #[serde(default, deserialize_with = "nullable")]
    pub checks: Vec<String>,
    /// Back-filled from the model descriptor; never read from the file
    #[serde(skip)]
    pub project_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct FlowsSection {
    #[serde(default, rename = "file-pattern", deserialize_with = "nullable")]
    file_pattern: String,
    #[serde(default, deserialize_with = "nullable")]
    configs: Vec<FlowDefinition>,
}

#[derive(Debug, Default, Deserialize)]
struct RunSection {
    #[serde(default, deserialize_with = "nullable")]
    flows: FlowsSection,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default, deserialize_with = "nullable")]
    name: String,
    #[serde(default, rename = "api-key", deserialize_with = "nullable")]
    api_key: String,
    #[serde(default, rename = "project-id", deserialize_with = "nullable")]
    project_id: String,
    #[serde(default)]
    language: Language,
    #[serde(default, deserialize_with = "nullable")]
    run: RunSection,
}

/// Configuration for one invocation
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub name: String,
    /// Literal token or `${VAR}`; see [`RunConfig::resolved_api_key`]
    pub api_key: String,
    pub project_id: String,
    pub language: Language,
    /// Unanchored regex; `$` is appended before matching
    pub file_pattern: String,
    pub declarative_flows: Vec<FlowDefinition>,
}

impl RunConfig {
    /// Load from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content, path)
    }

    /// Parse YAML content; `origin` only labels errors
    pub fn from_yaml(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        let file: ConfigFile =
            serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
                path: origin.to_path_buf(),
                source,
            })?;

        let config = Self {
            name: file.name,
            api_key: file.api_key,
            project_id: file.project_id,
            language: file.language,
            file_pattern: file.run.flows.file_pattern,
            declarative_flows: file.run.flows.configs,
        };
        config.file_regex()?;
        Ok(config)
    }

    /// The configured pattern, or `.*\.<ext>` for the language when empty
    pub fn effective_pattern(&self) -> String {
        if !self.file_pattern.is_empty() {
            return self.file_pattern.clone();
        }
        match self.language.extension() {
            Some(ext) => format!(r".*\.{}", ext.trim_start_matches('.')),
            None => String::new(),
        }
    }

    /// End-anchored regex matched against bare file names
    pub fn file_regex(&self) -> Result<Regex, ConfigError> {
        let pattern = self.effective_pattern();
        Regex::new(&format!("{}$", pattern)).map_err(|source| ConfigError::Pattern {
            pattern,
            source,
        })
    }

    pub fn resolved_api_key(&self) -> String {
        resolve_indirect(&self.api_key)
    }

    pub fn resolved_project_id(&self) -> String {
        resolve_indirect(&self.project_id)
    }

    /// Unique identifier for this invocation: `<name>-<10 hex digits>`
    pub fn run_id(&self) -> String {
        let suffix = Uuid::new_v4().simple().to_string()[..10].to_uppercase();
        format!("{}-{}", self.name, suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const FULL_CONFIG: &str = r#"
name: CLI Evaluation
api-key: ${OKAREO_API_KEY}
project-id: proj-literal
language: Python
model-keys:
  values:
    openai: ignored
run:
  flows:
    file-pattern: '.*_flow\.py'
    configs:
      - name: "Flow A"
        model-id: "mut-1"
        scenario-id: "scn-1"
        type: "NL_GENERATION"
        project-id: "user-supplied"
        checks:
          - uniqueness
          - fluency
      - name: "Flow B"
        model-id: "mut-2"
        scenario-id: "scn-2"
        type: "MULTI_CLASS_CLASSIFICATION"
"#;

    fn parse(content: &str) -> Result<RunConfig, ConfigError> {
        RunConfig::from_yaml(content, Path::new("config.yml"))
    }

    #[test]
    fn test_parse_full_config() {
        let config = parse(FULL_CONFIG).unwrap();

        assert_eq!(config.name, "CLI Evaluation");
        assert_eq!(config.api_key, "${OKAREO_API_KEY}");
        assert_eq!(config.project_id, "proj-literal");
        assert_eq!(config.language, Language::Python);
        assert_eq!(config.file_pattern, r".*_flow\.py");
        assert_eq!(config.declarative_flows.len(), 2);

        let first = &config.declarative_flows[0];
        assert_eq!(first.name, "Flow A");
        assert_eq!(first.model_id, "mut-1");
        assert_eq!(first.scenario_id, "scn-1");
        assert_eq!(first.run_type, "NL_GENERATION");
        assert_eq!(first.checks, vec!["uniqueness", "fluency"]);

        assert!(config.declarative_flows[1].checks.is_empty());
    }

    #[test]
    fn test_flow_project_id_is_never_read_from_file() {
        let config = parse(FULL_CONFIG).unwrap();
        assert!(config.declarative_flows.iter().all(|f| f.project_id.is_empty()));
    }

    #[test]
    fn test_flow_order_is_preserved() {
        let config = parse(FULL_CONFIG).unwrap();
        let names: Vec<_> = config.declarative_flows.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Flow A", "Flow B"]);
    }

    #[test]
    fn test_language_aliases() {
        assert_eq!(Language::parse("py"), Language::Python);
        assert_eq!(Language::parse("PYTHON"), Language::Python);
        assert_eq!(Language::parse("js"), Language::JavaScript);
        assert_eq!(Language::parse("JavaScript"), Language::JavaScript);
        assert_eq!(Language::parse("TS"), Language::TypeScript);
        assert_eq!(Language::parse(" typescript "), Language::TypeScript);
        assert_eq!(Language::parse(""), Language::Unset);
        assert_eq!(
            Language::parse("Ruby"),
            Language::Unsupported("Ruby".to_string())
        );
    }

    #[test]
    fn test_language_extension_and_interpreter() {
        assert_eq!(Language::Python.extension(), Some(".py"));
        assert_eq!(Language::TypeScript.extension(), Some(".ts"));
        assert_eq!(Language::TypeScript.interpreter(), Some("node"));
        assert_eq!(Language::Python.interpreter(), Some("python3"));
        assert!(!Language::Unset.is_supported());
        assert!(!Language::Unsupported("go".into()).is_supported());
    }

    #[test]
    fn test_missing_language_means_no_scripts() {
        let config = parse("name: only-declarative\n").unwrap();
        assert_eq!(config.language, Language::Unset);
        assert!(config.declarative_flows.is_empty());
    }

    #[test]
    fn test_null_sections_are_empty() {
        // Shape written by a fresh scaffold: every flow entry commented out
        let content = r#"
name: CLI Evaluation
api-key: ${OKAREO_API_KEY}
language:
run:
  flows:
    configs:
#      - name: "Example Flow"
"#;
        let config = parse(content).unwrap();
        assert_eq!(config.language, Language::Unset);
        assert!(config.declarative_flows.is_empty());
        assert_eq!(config.file_pattern, "");
    }

    #[test]
    fn test_flow_without_name_is_parse_error() {
        let content = r#"
run:
  flows:
    configs:
      - model-id: "mut-1"
"#;
        assert!(matches!(parse(content), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_malformed_yaml_is_parse_error() {
        let result = parse("name: [unterminated");
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_invalid_pattern_is_rejected_at_load() {
        let content = "language: py\nrun:\n  flows:\n    file-pattern: '(unclosed'\n";
        assert!(matches!(parse(content), Err(ConfigError::Pattern { .. })));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = RunConfig::load(temp_dir.path().join("missing.yml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yml");
        std::fs::write(&path, FULL_CONFIG).unwrap();

        let config = RunConfig::load(&path).unwrap();
        assert_eq!(config.name, "CLI Evaluation");
    }

    #[test]
    fn test_effective_pattern_defaults_to_language_extension() {
        let config = parse("language: ts\n").unwrap();
        assert_eq!(config.effective_pattern(), r".*\.ts");

        let regex = config.file_regex().unwrap();
        assert!(regex.is_match("classification.ts"));
        assert!(!regex.is_match("classification.ts.map"));
    }

    #[test]
    fn test_file_regex_is_end_anchored() {
        let config = parse(FULL_CONFIG).unwrap();
        let regex = config.file_regex().unwrap();
        assert!(regex.is_match("eval_flow.py"));
        assert!(!regex.is_match("eval_flow.pyc"));
        assert!(!regex.is_match("helpers.py"));
    }

    #[test]
    fn test_run_id_has_name_and_random_suffix() {
        let config = parse("name: nightly\n").unwrap();
        let first = config.run_id();
        let second = config.run_id();

        assert!(first.starts_with("nightly-"));
        let suffix = first.trim_start_matches("nightly-");
        assert_eq!(suffix.len(), 10);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
        assert_ne!(first, second);
    }
}
