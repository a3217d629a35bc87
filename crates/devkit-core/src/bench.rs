use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ToolkitConfig;
use crate::probe::Probe;
use crate::process::CommandRunner;
use crate::reporter::Reporter;

/// Latency and throughput snapshot across services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkRecord {
    pub timestamp: DateTime<Utc>,
    /// Per-container memory usage plus `gateway_<port>` reachability.
    pub latency_metrics: BTreeMap<String, String>,
    pub throughput_estimation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual_metrics: Option<VisualMetrics>,
    /// AI pipeline metrics as reported by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_metrics: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualMetrics {
    pub fps: f64,
    pub resolution: String,
    pub last_sync: Option<Value>,
}

/// Parse `docker stats --no-stream --format "{{.Name}}\t{{.MemUsage}}"`.
pub fn parse_mem_stats(output: &str) -> BTreeMap<String, String> {
    output
        .lines()
        .filter_map(|line| {
            let (name, usage) = line.split_once('\t')?;
            Some((name.trim().to_string(), usage.trim().to_string()))
        })
        .filter(|(name, _)| !name.is_empty())
        .collect()
}

/// Visual telemetry envelope: `{status: "success", data: {fps, resolution,
/// timestamp}}`. Anything but a success status yields `None`.
pub fn parse_visual_telemetry(body: &Value) -> Option<VisualMetrics> {
    if body.get("status").and_then(|v| v.as_str()) != Some("success") {
        return None;
    }
    let data = body.get("data");
    Some(VisualMetrics {
        fps: data
            .and_then(|d| d.get("fps"))
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0),
        resolution: data
            .and_then(|d| d.get("resolution"))
            .and_then(|v| v.as_str())
            .unwrap_or("0x0")
            .to_string(),
        last_sync: data.and_then(|d| d.get("timestamp")).cloned(),
    })
}

/// Memory usage per running container; empty when the runtime is unavailable.
pub async fn container_memory<R: CommandRunner>(
    runner: &R,
    log: &dyn Reporter,
) -> BTreeMap<String, String> {
    let out = runner
        .run(
            "docker",
            &["stats", "--no-stream", "--format", "{{.Name}}\t{{.MemUsage}}"],
            None,
        )
        .await;
    if out.success {
        parse_mem_stats(&out.output)
    } else {
        log.warn("Container stats unavailable");
        BTreeMap::new()
    }
}

pub async fn run_benchmarks<R: CommandRunner, P: Probe>(
    cfg: &ToolkitConfig,
    runner: &R,
    probe: &P,
    log: &dyn Reporter,
) -> BenchmarkRecord {
    log.info("Starting performance benchmarking");
    let mut record = BenchmarkRecord {
        timestamp: Utc::now(),
        latency_metrics: BTreeMap::new(),
        throughput_estimation: "N/A".into(),
        visual_metrics: None,
        ai_metrics: None,
    };

    log.info("Gathering memory footprint...");
    record
        .latency_metrics
        .extend(container_memory(runner, log).await);

    let bench = &cfg.bench;
    log.info("Measuring internal gateway latency...");
    let key = format!("gateway_{}", bench.gateway_port);
    if probe.tcp_reachable(&bench.gateway_host, bench.gateway_port).await {
        log.info("Network gateway: reachable");
        record.latency_metrics.insert(key, "Online".into());
    } else {
        log.warn("Network gateway: unreachable");
        record.latency_metrics.insert(key, "Offline".into());
    }

    log.info("Fetching visual telemetry...");
    match probe.get_json(&bench.visual_telemetry_url).await {
        Ok(body) => match parse_visual_telemetry(&body) {
            Some(vm) => {
                log.info(&format!("Visual profile: {} FPS @ {}", vm.fps, vm.resolution));
                record.visual_metrics = Some(vm);
            }
            None => log.warn("Visual telemetry: success flag false"),
        },
        Err(e) => log.warn(&format!("Visual telemetry: unreachable ({e})")),
    }

    log.info("Fetching AI pipeline metrics...");
    match probe.get_json(&bench.ai_metrics_url).await {
        Ok(metrics) => {
            let latency = metrics
                .get("avg_latency_ms")
                .and_then(|v| v.as_f64())
                .unwrap_or(0.0);
            let hits = metrics.get("cache_hits").and_then(|v| v.as_u64()).unwrap_or(0);
            log.info(&format!("AI profile: {latency:.2}ms latency | {hits} hits"));
            record.ai_metrics = Some(metrics);
        }
        Err(e) => log.warn(&format!("AI metrics: unreachable ({e})")),
    }

    record
}
