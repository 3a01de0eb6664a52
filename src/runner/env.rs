use std::collections::BTreeMap;
use std::ffi::OsString;

pub const RUN_ID_VAR: &str = "OKAREO_RUN_ID";
pub const API_KEY_VAR: &str = "OKAREO_API_KEY";
pub const PROJECT_ID_VAR: &str = "PROJECT_ID";
pub const JSON_OUTPUT_FILE_VAR: &str = "OKAREO_JSON_OUTPUT_FILE";
pub const REPORT_DIR_VAR: &str = "OKAREO_REPORT_DIR";

/// Values handed to every scripted flow through its environment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowEnv {
    pub run_id: String,
    pub api_key: String,
    pub project_id: String,
    pub json_output_file: String,
    pub report_dir: String,
}

impl FlowEnv {
    /// Non-empty entries only; an empty value is never exported
    pub fn overlay(&self) -> Vec<(&'static str, String)> {
        [
            (RUN_ID_VAR, &self.run_id),
            (API_KEY_VAR, &self.api_key),
            (PROJECT_ID_VAR, &self.project_id),
            (JSON_OUTPUT_FILE_VAR, &self.json_output_file),
            (REPORT_DIR_VAR, &self.report_dir),
        ]
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| (key, value.clone()))
        .collect()
    }
}

/// Overlay `overlay` on `base`. Base entries are kept; same-named keys are replaced.
pub fn merge_env<I>(base: I, overlay: &[(&str, String)]) -> BTreeMap<OsString, OsString>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    let mut merged: BTreeMap<OsString, OsString> = base.into_iter().collect();
    for (key, value) in overlay {
        merged.insert(OsString::from(key), OsString::from(value));
    }
    merged
}
