use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::bench::container_memory;
use crate::config::ToolkitConfig;
use crate::process::CommandRunner;
use crate::reporter::Reporter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizationStatus {
    /// No cleanup steps configured.
    Skipped,
    Completed,
    #[serde(rename = "Completed with failures")]
    CompletedWithFailures,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationRecord {
    pub status: OptimizationStatus,
    /// Step name to `OK` or `FAILED: <output>`.
    pub cleanup_results: BTreeMap<String, String>,
    pub memory_snapshot: BTreeMap<String, String>,
}

/// Snapshot container memory, then run each configured cleanup command.
pub async fn run_optimization<R: CommandRunner>(
    cfg: &ToolkitConfig,
    runner: &R,
    log: &dyn Reporter,
) -> OptimizationRecord {
    log.info("Starting system optimization pass");
    let memory_snapshot = container_memory(runner, log).await;

    let steps = &cfg.optimize.cleanup;
    if steps.is_empty() {
        log.info("No cleanup steps configured");
        return OptimizationRecord {
            status: OptimizationStatus::Skipped,
            cleanup_results: BTreeMap::new(),
            memory_snapshot,
        };
    }

    let mut cleanup_results = BTreeMap::new();
    let mut failures = 0usize;
    for step in steps {
        let Some((program, args)) = step.command.split_first() else {
            log.error(&format!("{}: empty command", step.name));
            cleanup_results.insert(step.name.clone(), "FAILED: empty command".to_string());
            failures += 1;
            continue;
        };
        log.info(&format!("Running cleanup: {}", step.name));
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let out = runner.run(program, &args, Some(cfg.root())).await;
        let result = if out.success {
            log.success(&format!("{}: done", step.name));
            "OK".to_string()
        } else {
            log.error(&format!("{}: failed", step.name));
            failures += 1;
            format!("FAILED: {}", out.output.trim())
        };
        cleanup_results.insert(step.name.clone(), result);
    }

    OptimizationRecord {
        status: if failures == 0 {
            OptimizationStatus::Completed
        } else {
            OptimizationStatus::CompletedWithFailures
        },
        cleanup_results,
        memory_snapshot,
    }
}
