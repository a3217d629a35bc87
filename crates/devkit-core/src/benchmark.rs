use serde_json::Value;

use crate::api::{GenerateOptions, GenerateRequest, InferenceApi};
use crate::model::{BenchmarkOutcome, ModelStub};

/// Prompt used for every benchmark call.
pub const BENCH_PROMPT: &str = "Explain quantum computing in one sentence.";
/// Maximum generated tokens per benchmark call.
pub const BENCH_NUM_PREDICT: u32 = 100;
pub const BENCH_TEMPERATURE: f64 = 0.7;

const NS_PER_SEC: f64 = 1e9;

/// The fixed, non-streaming generation request for `model`.
pub fn benchmark_request(model: &str) -> GenerateRequest {
    GenerateRequest {
        model: model.to_string(),
        prompt: BENCH_PROMPT.to_string(),
        stream: false,
        options: GenerateOptions {
            num_predict: BENCH_NUM_PREDICT,
            temperature: BENCH_TEMPERATURE,
        },
    }
}

/// Tokens per second of evaluation time. Zero when no evaluation time was
/// reported.
pub fn throughput(eval_count: u64, eval_duration_ns: u64) -> f64 {
    if eval_duration_ns > 0 {
        eval_count as f64 / (eval_duration_ns as f64 / NS_PER_SEC)
    } else {
        0.0
    }
}

fn count_field(data: &Value, key: &str) -> u64 {
    data.get(key)
        .and_then(|v| v.as_u64().or_else(|| v.as_f64().map(|f| f.max(0.0) as u64)))
        .unwrap_or(0)
}

fn secs(ns: u64) -> f64 {
    ns as f64 / NS_PER_SEC
}

/// Build the outcome for a successful generate response. Missing timing
/// fields default to zero.
pub fn outcome_from_response(data: &Value) -> BenchmarkOutcome {
    let eval_count = count_field(data, "eval_count");
    let eval_duration = count_field(data, "eval_duration");

    BenchmarkOutcome::Success {
        tokens_per_second: throughput(eval_count, eval_duration),
        eval_token_count: eval_count,
        eval_duration_seconds: secs(eval_duration),
        total_duration_seconds: secs(count_field(data, "total_duration")),
        load_duration_seconds: secs(count_field(data, "load_duration")),
    }
}

/// Run one generation call against `model` and classify it. Exactly one
/// attempt; transport errors and non-success statuses become `Failure`.
pub async fn benchmark<A: InferenceApi>(api: &A, model: &str) -> BenchmarkOutcome {
    match api.generate(&benchmark_request(model)).await {
        Ok(data) => outcome_from_response(&data),
        Err(e) => {
            tracing::debug!(model, error = %e, "benchmark call failed");
            BenchmarkOutcome::failure(e.to_string())
        }
    }
}

/// Benchmark an inventory entry, skipping models over the size threshold
/// without touching the network.
pub async fn benchmark_stub<A: InferenceApi>(api: &A, stub: &ModelStub) -> BenchmarkOutcome {
    if stub.exceeds_size_threshold() {
        return BenchmarkOutcome::skipped_too_large();
    }
    benchmark(api, &stub.name).await
}
