mod common;

use std::collections::HashMap;

use common::{scratch_dir, FakeProbe, FakeRunner};
use devkit_core::audit::{run_audit, DiskSpace};
use devkit_core::bench::run_benchmarks;
use devkit_core::config::CleanupStep;
use devkit_core::health::{run_healthcheck, HealthError, HealthReport};
use devkit_core::optimize::{run_optimization, OptimizationStatus};
use devkit_core::reporter::{Level, MemoryReporter};
use devkit_core::suites::{run_tests, Suite, SuiteStatus};
use devkit_core::{CommandOutput, ReportStore, ToolkitConfig};
use serde_json::json;

const DF_OUT: &str = "Filesystem 1024-blocks Used Available Capacity Mounted on\n\
                      /dev/sda1 104857600 52428800 52428800 50% /\n";

fn config_at(root: &std::path::Path) -> ToolkitConfig {
    ToolkitConfig::default().with_root(root)
}

#[tokio::test]
async fn audit_records_every_section() {
    let root = scratch_dir("audit");
    std::fs::create_dir_all(root.join("infra/config")).unwrap();
    std::fs::write(root.join("infra/config/.env"), "PORT=3000\n").unwrap();
    let runner = FakeRunner::new()
        .reply("docker ps", CommandOutput::ok("eq-backend\tUp 1 hour\n"))
        .reply("df -Pk", CommandOutput::ok(DF_OUT));
    let log = MemoryReporter::new();

    let audit = run_audit(&config_at(&root), &runner, &log).await.unwrap();

    assert_eq!(audit.containers["eq-backend"], "Up 1 hour");
    assert!(audit.env_validation.exists);
    assert_eq!(
        audit.disk_space,
        DiskSpace::Usage {
            total_gb: 100,
            used_gb: 50,
            free_gb: 50
        }
    );
    assert!(log.messages(Level::Error).is_empty());
    // Only running containers are listed.
    let calls = runner.calls.borrow();
    assert_eq!(calls[0].args, vec!["ps", "--format", "{{.Names}}\t{{.Status}}"]);
    std::fs::remove_dir_all(root).ok();
}

#[tokio::test]
async fn audit_failures_are_recorded_not_raised() {
    let root = scratch_dir("audit-fail");
    let runner = FakeRunner::new();
    let log = MemoryReporter::new();

    let audit = run_audit(&config_at(&root), &runner, &log).await.unwrap();

    assert!(audit.containers.is_empty());
    assert!(!audit.env_validation.exists);
    assert!(matches!(audit.disk_space, DiskSpace::Unavailable { .. }));
    assert_eq!(log.messages(Level::Error).len(), 1);
    // Both checks still ran after the container check failed.
    assert_eq!(runner.programs(), vec!["docker", "df"]);
    std::fs::remove_dir_all(root).ok();
}

#[tokio::test]
async fn audit_skips_containers_when_disabled() {
    let root = scratch_dir("audit-nocontainers");
    let mut cfg = config_at(&root);
    cfg.audit.containers = false;
    let runner = FakeRunner::new().reply("df -Pk", CommandOutput::ok(DF_OUT));

    run_audit(&cfg, &runner, &MemoryReporter::new()).await.unwrap();

    assert_eq!(runner.programs(), vec!["df"]);
    std::fs::remove_dir_all(root).ok();
}

#[tokio::test]
async fn healthcheck_fails_when_backend_missing() {
    let root = scratch_dir("health");
    let runner = FakeRunner::new().reply(
        "docker ps",
        CommandOutput::ok("eq-middleware\tUp 2 hours\neq-frontend\tUp 2 hours\n"),
    );

    let err = run_healthcheck(&config_at(&root), &runner, &MemoryReporter::new())
        .await
        .unwrap_err();

    assert!(matches!(err, HealthError::ServiceDown(ref s) if s == "backend"));
    assert!(err.to_string().contains("backend"));
    assert_eq!(err.exit_code(), 1);
    std::fs::remove_dir_all(root).ok();
}

#[tokio::test]
async fn healthcheck_passes_when_all_services_up() {
    let root = scratch_dir("health-ok");
    let runner = FakeRunner::new().reply(
        "docker ps",
        CommandOutput::ok("eq-backend\tUp 2 hours\neq-middleware\tUp 2 hours\neq-frontend\tUp 2 hours\n"),
    );

    let audit = run_healthcheck(&config_at(&root), &runner, &MemoryReporter::new())
        .await
        .unwrap();
    assert_eq!(audit.containers.len(), 3);

    let report = HealthReport::from_result(&Ok(audit));
    let v = serde_json::to_value(&report).unwrap();
    assert_eq!(v["healthy"], true);
    assert_eq!(v["exit_code"], 0);
    assert_eq!(v["audit"]["containers"]["eq-backend"], "Up 2 hours");
    std::fs::remove_dir_all(root).ok();
}

#[tokio::test]
async fn healthcheck_missing_root_is_critical() {
    let cfg = config_at(std::path::Path::new("/nonexistent/devkit/root"));
    let err = run_healthcheck(&cfg, &FakeRunner::new(), &MemoryReporter::new())
        .await
        .unwrap_err();
    assert!(matches!(err, HealthError::Critical(_)));
    assert_eq!(err.exit_code(), 2);
}

#[tokio::test]
async fn tests_backend_only_runs_cargo_in_backend_dir() {
    let root = scratch_dir("suites");
    let cfg = config_at(&root);
    let runner = FakeRunner::new().reply("cargo test", CommandOutput::ok("test result: ok"));

    let record = run_tests(&cfg, &runner, &Suite::select(false, true), &MemoryReporter::new()).await;

    assert_eq!(record.summary, "Partial Execution");
    assert_eq!(record.detailed.len(), 1);
    assert_eq!(record.detailed[0].module, "backend");
    assert_eq!(record.detailed[0].status, SuiteStatus::Passed);
    assert_eq!(record.detailed[0].logs, "Success");
    let calls = runner.calls.borrow();
    assert_eq!(calls[0].cwd.as_deref(), Some(root.join("apps/backend").as_path()));
    std::fs::remove_dir_all(&root).ok();
}

#[tokio::test]
async fn tests_all_records_failures_and_continues() {
    let root = scratch_dir("suites-all");
    let cfg = config_at(&root);
    let runner = FakeRunner::new()
        .reply("cargo test", CommandOutput::failed("1 test failed"))
        .reply("npm test", CommandOutput::ok("ok"));

    let record = run_tests(&cfg, &runner, &Suite::select(true, false), &MemoryReporter::new()).await;

    assert_eq!(record.summary, "Full Execution");
    assert_eq!(record.passed, 2);
    assert_eq!(record.failed, 1);
    assert_eq!(record.detailed[0].status, SuiteStatus::Failed);
    assert_eq!(record.detailed[0].logs, "1 test failed");
    let calls = runner.calls.borrow();
    assert_eq!(
        calls[2].args,
        vec!["test", "--", "--watch=false", "--browsers=ChromeHeadless"]
    );
    std::fs::remove_dir_all(&root).ok();
}

#[tokio::test]
async fn bench_collects_memory_gateway_and_telemetry() {
    let cfg = ToolkitConfig::default();
    let runner = FakeRunner::new().reply(
        "docker stats",
        CommandOutput::ok("eq-backend\t120MiB / 7.6GiB\n"),
    );
    let mut endpoints = HashMap::new();
    endpoints.insert(
        cfg.bench.visual_telemetry_url.clone(),
        json!({"status": "success", "data": {"fps": 60, "resolution": "1920x1080"}}),
    );
    endpoints.insert(
        cfg.bench.ai_metrics_url.clone(),
        json!({"avg_latency_ms": 12.5, "cache_hits": 4}),
    );
    let probe = FakeProbe {
        json: endpoints,
        open_ports: vec![3000],
        ..Default::default()
    };

    let record = run_benchmarks(&cfg, &runner, &probe, &MemoryReporter::new()).await;

    assert_eq!(record.latency_metrics["eq-backend"], "120MiB / 7.6GiB");
    assert_eq!(record.latency_metrics["gateway_3000"], "Online");
    assert_eq!(record.throughput_estimation, "N/A");
    let vm = record.visual_metrics.unwrap();
    assert_eq!(vm.fps, 60.0);
    assert_eq!(record.ai_metrics.unwrap()["cache_hits"], 4);
}

#[tokio::test]
async fn bench_with_everything_offline_still_produces_a_record() {
    let cfg = ToolkitConfig::default();
    let runner = FakeRunner::new();
    let probe = FakeProbe::default();
    let log = MemoryReporter::new();

    let record = run_benchmarks(&cfg, &runner, &probe, &log).await;

    assert_eq!(record.latency_metrics.len(), 1);
    assert_eq!(record.latency_metrics["gateway_3000"], "Offline");
    assert!(record.visual_metrics.is_none());
    assert!(record.ai_metrics.is_none());
    assert_eq!(probe.get_calls.borrow().len(), 2);
    assert_eq!(log.messages(Level::Warn).len(), 4);

    let v = serde_json::to_value(&record).unwrap();
    assert!(v.get("visual_metrics").is_none());
}

#[tokio::test]
async fn optimize_without_steps_is_skipped() {
    let record = run_optimization(&ToolkitConfig::default(), &FakeRunner::new(), &MemoryReporter::new()).await;
    assert_eq!(record.status, OptimizationStatus::Skipped);
    assert!(record.cleanup_results.is_empty());
    let v = serde_json::to_value(&record).unwrap();
    assert_eq!(v["status"], "Skipped");
}

#[tokio::test]
async fn optimize_runs_configured_steps() {
    let mut cfg = ToolkitConfig::default();
    cfg.optimize.cleanup = vec![
        CleanupStep {
            name: "images".into(),
            command: vec!["docker".into(), "image".into(), "prune".into(), "-f".into()],
        },
        CleanupStep {
            name: "npm cache".into(),
            command: vec!["npm".into(), "cache".into(), "verify".into()],
        },
        CleanupStep {
            name: "nothing".into(),
            command: vec![],
        },
    ];
    let runner = FakeRunner::new().reply("docker image", CommandOutput::ok("Total reclaimed space: 0B"));

    let record = run_optimization(&cfg, &runner, &MemoryReporter::new()).await;

    assert_eq!(record.status, OptimizationStatus::CompletedWithFailures);
    assert_eq!(record.cleanup_results["images"], "OK");
    assert!(record.cleanup_results["npm cache"].starts_with("FAILED"));
    assert_eq!(record.cleanup_results["nothing"], "FAILED: empty command");
    let v = serde_json::to_value(&record).unwrap();
    assert_eq!(v["status"], "Completed with failures");
}

#[tokio::test]
async fn records_round_trip_through_the_store() {
    let dir = scratch_dir("store");
    let store = ReportStore::new(&dir);
    let record = run_tests(
        &ToolkitConfig::default(),
        &FakeRunner::new(),
        &[],
        &MemoryReporter::new(),
    )
    .await;

    let path = store.save(&record, "test_report").unwrap();
    let back: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(back["summary"], "Partial Execution");
    assert_eq!(back["detailed"], json!([]));
    std::fs::remove_dir_all(dir).ok();
}
