use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::ToolkitConfig;
use crate::process::CommandRunner;
use crate::reporter::Reporter;

/// A per-service test suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suite {
    /// Rust backend, `cargo test`.
    Backend,
    /// Node middleware, `npm test`.
    Middleware,
    /// Angular frontend, single headless Karma run.
    Frontend,
}

impl Suite {
    pub const ALL: [Suite; 3] = [Suite::Backend, Suite::Middleware, Suite::Frontend];

    pub fn name(self) -> &'static str {
        match self {
            Self::Backend => "backend",
            Self::Middleware => "middleware",
            Self::Frontend => "frontend",
        }
    }

    pub fn command(self) -> (&'static str, &'static [&'static str]) {
        match self {
            Self::Backend => ("cargo", &["test"]),
            Self::Middleware => ("npm", &["test"]),
            Self::Frontend => (
                "npm",
                &["test", "--", "--watch=false", "--browsers=ChromeHeadless"],
            ),
        }
    }

    pub fn dir(self, cfg: &ToolkitConfig) -> PathBuf {
        let rel = match self {
            Self::Backend => &cfg.tests.backend_dir,
            Self::Middleware => &cfg.tests.middleware_dir,
            Self::Frontend => &cfg.tests.frontend_dir,
        };
        cfg.root().join(rel)
    }

    /// Suites enabled by the `--all` / `--backend` flags.
    pub fn select(all: bool, backend: bool) -> Vec<Suite> {
        if all {
            Self::ALL.to_vec()
        } else if backend {
            vec![Self::Backend]
        } else {
            Vec::new()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SuiteStatus {
    Passed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub module: String,
    pub status: SuiteStatus,
    /// `"Success"` when passed, captured output otherwise.
    pub logs: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestRecord {
    pub summary: String,
    pub passed: usize,
    pub failed: usize,
    pub detailed: Vec<SuiteResult>,
}

pub async fn run_tests<R: CommandRunner>(
    cfg: &ToolkitConfig,
    runner: &R,
    suites: &[Suite],
    log: &dyn Reporter,
) -> TestRecord {
    log.info("Initializing integrated test suite");
    if suites.is_empty() {
        log.warn("No suites selected; pass --all or --backend");
    }

    let mut detailed = Vec::with_capacity(suites.len());
    for &suite in suites {
        log.info(&format!("Executing {} tests...", suite.name()));
        let (program, args) = suite.command();
        let dir = suite.dir(cfg);
        let out = runner.run(program, args, Some(dir.as_path())).await;
        let (status, logs) = if out.success {
            log.success(&format!("{} validation: PASSED", suite.name()));
            (SuiteStatus::Passed, "Success".to_string())
        } else {
            log.error(&format!("{} validation: FAILED", suite.name()));
            (SuiteStatus::Failed, out.output)
        };
        detailed.push(SuiteResult {
            module: suite.name().to_string(),
            status,
            logs,
        });
    }

    let passed = detailed
        .iter()
        .filter(|r| r.status == SuiteStatus::Passed)
        .count();
    let summary = if Suite::ALL.iter().all(|s| suites.contains(s)) {
        "Full Execution"
    } else {
        "Partial Execution"
    };

    TestRecord {
        summary: summary.to_string(),
        passed,
        failed: detailed.len() - passed,
        detailed,
    }
}
