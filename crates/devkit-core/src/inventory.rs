use serde_json::Value;

use crate::api::InferenceApi;
use crate::benchmark::benchmark_stub;
use crate::error::Result;
use crate::model::{BenchmarkOutcome, Details, ModelDescriptor, ModelStub};
use crate::reporter::Reporter;

/// Parse a `/tags` response into inventory stubs. Entries without a name are
/// dropped; a missing size counts as zero.
pub fn parse_tags(data: &Value) -> Vec<ModelStub> {
    data.get("models")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|m| {
                    let name = m.get("name")?.as_str()?.to_string();
                    let size_bytes = m.get("size").and_then(|v| v.as_u64()).unwrap_or(0);
                    Some(ModelStub { name, size_bytes })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Flatten a `/show` response: the `details` object is merged in, and
/// `parameters` is reduced to its length under `parameters_len`.
pub fn parse_show(data: &Value) -> Details {
    let mut details = Details::new();
    if let Some(obj) = data.get("details").and_then(|v| v.as_object()) {
        details.extend(obj.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    let params_len = match data.get("parameters") {
        Some(Value::Array(arr)) => Some(arr.len()),
        Some(Value::Object(obj)) => Some(obj.len()),
        // A string block counts characters, not lines.
        Some(Value::String(s)) => Some(s.chars().count()),
        _ => None,
    };
    if let Some(n) = params_len {
        details.insert("parameters_len".into(), Value::from(n));
    }
    details
}

/// Installed models, or the error that prevented listing them.
pub async fn try_list_models<A: InferenceApi>(api: &A) -> Result<Vec<ModelStub>> {
    Ok(parse_tags(&api.tags().await?))
}

/// Installed models. An unreachable server or an error status yields an
/// empty list.
pub async fn list_models<A: InferenceApi>(api: &A) -> Vec<ModelStub> {
    try_list_models(api).await.unwrap_or_else(|e| {
        tracing::debug!(error = %e, "model inventory unavailable");
        Vec::new()
    })
}

/// Best-effort metadata for one model; empty on any failure.
pub async fn model_details<A: InferenceApi>(api: &A, name: &str) -> Details {
    match api.show(name).await {
        Ok(data) => parse_show(&data),
        Err(e) => {
            tracing::debug!(model = name, error = %e, "model details unavailable");
            Details::new()
        }
    }
}

/// Inventory every installed model: metadata, size gate, one benchmark each.
pub async fn audit_models<A: InferenceApi>(api: &A, log: &dyn Reporter) -> Vec<ModelDescriptor> {
    let stubs = match try_list_models(api).await {
        Ok(s) => s,
        Err(e) => {
            log.warn(&format!("Model inventory unavailable: {e}"));
            Vec::new()
        }
    };
    log.info(&format!("Found {} models. Starting audit...", stubs.len()));

    let mut report = Vec::with_capacity(stubs.len());
    for stub in stubs {
        log.info(&format!("Analyzing {}...", stub.name));
        let details = model_details(api, &stub.name).await;
        let metrics = benchmark_stub(api, &stub).await;
        match &metrics {
            BenchmarkOutcome::Success {
                tokens_per_second, ..
            } => log.success(&format!("{}: {tokens_per_second:.2} t/s", stub.name)),
            BenchmarkOutcome::Failure { reason } if stub.exceeds_size_threshold() => log.info(
                &format!("{}: {reason} ({:.1} GB)", stub.name, stub.size_gb()),
            ),
            BenchmarkOutcome::Failure { reason } => {
                log.warn(&format!("{}: benchmark failed: {reason}", stub.name))
            }
        }
        report.push(ModelDescriptor::new(stub, details, metrics));
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tags_skip_unnamed_and_default_size() {
        let stubs = parse_tags(&json!({
            "models": [
                {"name": "llama3:latest", "size": 4_661_224_676u64},
                {"size": 100},
                {"name": "tiny"}
            ]
        }));
        assert_eq!(stubs.len(), 2);
        assert_eq!(stubs[0].name, "llama3:latest");
        assert_eq!(stubs[0].size_bytes, 4_661_224_676);
        assert_eq!(stubs[1].size_bytes, 0);
    }

    #[test]
    fn tags_without_models_field_is_empty() {
        assert!(parse_tags(&json!({})).is_empty());
        assert!(parse_tags(&json!({"models": "nope"})).is_empty());
    }

    #[test]
    fn show_parameters_string_counts_chars() {
        let d = parse_show(&json!({"parameters": "num_ctx 8192"}));
        assert_eq!(d["parameters_len"], 12);
    }

    #[test]
    fn show_parameters_object_counts_keys() {
        let d = parse_show(&json!({"parameters": {"num_ctx": 8192, "temperature": 0.7}}));
        assert_eq!(d["parameters_len"], 2);
    }

    #[test]
    fn show_parameters_other_types_omit_key() {
        let d = parse_show(&json!({"parameters": 42}));
        assert!(d.get("parameters_len").is_none());
    }
}
