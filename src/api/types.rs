use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::config::{nullable, FlowDefinition};
use crate::error::ApiError;

/// A registered model-under-test. Missing and `null` fields decode to defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ModelDescriptor {
    #[serde(default, deserialize_with = "nullable")]
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub project_id: String,
    /// Provider name -> provider-specific config; one entry expected
    #[serde(default, deserialize_with = "nullable")]
    pub models: Map<String, Value>,
    #[serde(default, deserialize_with = "nullable")]
    pub datapoint_count: i64,
}

impl ModelDescriptor {
    /// Provider of the model (`openai`, ...), from the first `models` key
    pub fn provider(&self) -> Option<&str> {
        self.models.keys().next().map(String::as_str)
    }
}

/// The fields of a created test run the CLI relies on
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TestRunResult {
    pub id: String,
    pub name: String,
    pub app_link: String,
}

impl TestRunResult {
    /// Pull `id`, `name` and `app_link` out of an arbitrary response body.
    ///
    /// Top-level fields win; otherwise the first nested occurrence is used.
    /// Every other field is ignored, so server-side additions never break this.
    pub fn extract(body: &Value) -> Self {
        Self {
            id: find_field(body, "id").unwrap_or_default(),
            name: find_field(body, "name").unwrap_or_default(),
            app_link: find_field(body, "app_link").unwrap_or_default(),
        }
    }

    /// Extraction plus the `id`/`name` presence check
    pub fn from_response(body: &Value) -> Result<Self, ApiError> {
        let run = Self::extract(body);
        if run.id.is_empty() {
            return Err(ApiError::MissingField("id"));
        }
        if run.name.is_empty() {
            return Err(ApiError::MissingField("name"));
        }
        Ok(run)
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn find_field(value: &Value, key: &str) -> Option<String> {
    match value {
        Value::Object(map) => map.get(key).and_then(scalar).or_else(|| {
            map.values()
                .filter(|v| v.is_object() || v.is_array())
                .find_map(|v| find_field(v, key))
        }),
        Value::Array(items) => items.iter().find_map(|v| find_field(v, key)),
        _ => None,
    }
}

/// Environment variable holding the credential for a model provider
pub fn provider_key_var(provider: &str) -> String {
    match provider {
        "openai" => "OPENAI_API_KEY".to_string(),
        other => format!("{}_API_KEY", other.to_uppercase().replace('-', "_")),
    }
}

/// Credential for `provider`, read through `lookup`; empty when unset
pub fn provider_credential<F>(provider: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(&provider_key_var(provider)).unwrap_or_default()
}

/// Body of `POST /v0/test_run`
pub fn test_run_body(flow: &FlowDefinition, provider: Option<&str>, provider_key: &str) -> Value {
    let mut api_keys = Map::new();
    if let Some(provider) = provider {
        api_keys.insert(provider.to_string(), Value::String(provider_key.to_string()));
    }

    let mut body = json!({
        "name": flow.name,
        "project_id": flow.project_id,
        "scenario_id": flow.scenario_id,
        "mut_id": flow.model_id,
        "type": flow.run_type,
        "calculate_metrics": true,
        "api_keys": api_keys,
    });
    if !flow.checks.is_empty() {
        body["checks"] = json!(flow.checks);
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flow(checks: &[&str]) -> FlowDefinition {
        FlowDefinition {
            name: "Flow A".into(),
            model_id: "mut-1".into(),
            scenario_id: "scn-1".into(),
            run_type: "NL_GENERATION".into(),
            checks: checks.iter().map(|c| c.to_string()).collect(),
            project_id: "proj-1".into(),
        }
    }

    #[test]
    fn test_extract_ignores_unknown_fields() {
        let body: Value = serde_json::from_str(
            r#"{"id":"abc","extra_unused_field":{"x":1},"app_link":"https://x","name":"Run1"}"#,
        )
        .unwrap();

        let run = TestRunResult::extract(&body);
        assert_eq!(
            run,
            TestRunResult {
                id: "abc".into(),
                name: "Run1".into(),
                app_link: "https://x".into(),
            }
        );
    }

    #[test]
    fn test_extract_prefers_top_level_fields() {
        let body = json!({
            "model_metrics": {"id": "nested-id", "name": "nested-name"},
            "id": "top-id",
            "name": "top-name",
            "app_link": "https://app/top"
        });
        let run = TestRunResult::extract(&body);
        assert_eq!(run.id, "top-id");
        assert_eq!(run.name, "top-name");
    }

    #[test]
    fn test_extract_falls_back_to_nested_fields() {
        let body = json!({"test_run": {"id": "abc", "name": "Run1"}, "links": [{"app_link": "https://x"}]});
        let run = TestRunResult::extract(&body);
        assert_eq!(run.id, "abc");
        assert_eq!(run.name, "Run1");
        assert_eq!(run.app_link, "https://x");
    }

    #[test]
    fn test_extract_numeric_id_and_missing_link() {
        let body = json!({"id": 42, "name": "Run1"});
        let run = TestRunResult::extract(&body);
        assert_eq!(run.id, "42");
        assert_eq!(run.app_link, "");
    }

    #[test]
    fn test_from_response_requires_id_and_name() {
        let missing_id = json!({"name": "Run1", "app_link": "https://x"});
        assert!(matches!(
            TestRunResult::from_response(&missing_id),
            Err(ApiError::MissingField("id"))
        ));

        let empty_name = json!({"id": "abc", "name": ""});
        assert!(matches!(
            TestRunResult::from_response(&empty_name),
            Err(ApiError::MissingField("name"))
        ));

        let error_body = json!({"detail": "Scenario not found"});
        assert!(TestRunResult::from_response(&error_body).is_err());
    }

    #[test]
    fn test_body_api_keys_for_openai() {
        let lookup = |name: &str| (name == "OPENAI_API_KEY").then(|| "sk-test-openai".to_string());
        let key = provider_credential("openai", lookup);
        let body = test_run_body(&flow(&[]), Some("openai"), &key);

        assert_eq!(body["api_keys"], json!({"openai": "sk-test-openai"}));
    }

    #[test]
    fn test_body_fields() {
        let body = test_run_body(&flow(&["uniqueness", "fluency"]), Some("openai"), "k");

        assert_eq!(body["name"], "Flow A");
        assert_eq!(body["project_id"], "proj-1");
        assert_eq!(body["scenario_id"], "scn-1");
        assert_eq!(body["mut_id"], "mut-1");
        assert_eq!(body["type"], "NL_GENERATION");
        assert_eq!(body["calculate_metrics"], json!(true));
        assert_eq!(body["checks"], json!(["uniqueness", "fluency"]));
    }

    #[test]
    fn test_body_omits_empty_checks() {
        let body = test_run_body(&flow(&[]), Some("openai"), "k");
        assert!(body.get("checks").is_none());
    }

    #[test]
    fn test_body_without_provider_has_empty_api_keys() {
        let body = test_run_body(&flow(&[]), None, "");
        assert_eq!(body["api_keys"], json!({}));
    }

    #[test]
    fn test_body_escapes_strings() {
        let mut f = flow(&["a\"b"]);
        f.name = "quote \" and \\ backslash".into();
        let body = test_run_body(&f, None, "");

        let encoded = serde_json::to_string(&body).unwrap();
        let decoded: Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded["name"], "quote \" and \\ backslash");
    }

    #[test]
    fn test_provider_key_var() {
        assert_eq!(provider_key_var("openai"), "OPENAI_API_KEY");
        assert_eq!(provider_key_var("cohere"), "COHERE_API_KEY");
        assert_eq!(provider_key_var("azure-openai"), "AZURE_OPENAI_API_KEY");
    }

    #[test]
    fn test_provider_credential_unset_is_empty() {
        assert_eq!(provider_credential("cohere", |_| None), "");
    }

    #[test]
    fn test_model_descriptor_provider() {
        let model: ModelDescriptor = serde_json::from_value(json!({
            "id": "mut-1",
            "project_id": "proj-1",
            "name": "My model",
            "models": {"openai": {"model_id": "gpt-4o", "temperature": 0}},
            "tags": ["ci"],
            "datapoint_count": 3
        }))
        .unwrap();

        assert_eq!(model.provider(), Some("openai"));
        assert_eq!(model.project_id, "proj-1");
        assert_eq!(model.datapoint_count, 3);
        assert_eq!(ModelDescriptor::default().provider(), None);
    }

    #[test]
    fn test_model_descriptor_null_fields_default() {
        let model: ModelDescriptor = serde_json::from_value(json!({
            "id": "m",
            "project_id": "p",
            "name": null,
            "models": null,
            "datapoint_count": null
        }))
        .unwrap();

        assert_eq!(model.id, "m");
        assert_eq!(model.project_id, "p");
        assert!(model.models.is_empty());
        assert_eq!(model.datapoint_count, 0);
    }
}
