use std::collections::BTreeMap;

use serde::Serialize;

use crate::audit::{run_audit, AuditRecord};
use crate::config::ToolkitConfig;
use crate::process::CommandRunner;
use crate::reporter::Reporter;

/// Fatal healthcheck outcomes. Each maps to its own process exit code.
#[derive(Debug, thiserror::Error)]
pub enum HealthError {
    #[error("Healthcheck Failed: {0} not running.")]
    ServiceDown(String),

    #[error("Healthcheck Critical Error: {0}")]
    Critical(String),
}

impl HealthError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ServiceDown(_) => 1,
            Self::Critical(_) => 2,
        }
    }
}

/// Machine-readable healthcheck outcome for `--json` output.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub healthy: bool,
    pub message: String,
    pub exit_code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit: Option<AuditRecord>,
}

impl HealthReport {
    pub fn from_result(result: &Result<AuditRecord, HealthError>) -> Self {
        match result {
            Ok(audit) => Self {
                healthy: true,
                message: "System Health: OPTIMAL".into(),
                exit_code: 0,
                audit: Some(audit.clone()),
            },
            Err(e) => Self {
                healthy: false,
                message: e.to_string(),
                exit_code: e.exit_code(),
                audit: None,
            },
        }
    }
}

/// True when some container's name contains `service` and its status
/// reads "up". Both comparisons ignore case.
pub fn service_is_up(containers: &BTreeMap<String, String>, service: &str) -> bool {
    let service = service.to_lowercase();
    containers.iter().any(|(name, status)| {
        name.to_lowercase().contains(&service) && status.to_lowercase().contains("up")
    })
}

/// Fail on the first essential service that is not up.
pub fn check_essential(
    containers: &BTreeMap<String, String>,
    essentials: &[String],
) -> Result<(), HealthError> {
    match essentials.iter().find(|s| !service_is_up(containers, s)) {
        Some(missing) => Err(HealthError::ServiceDown(missing.clone())),
        None => Ok(()),
    }
}

/// Audit the environment, then require every configured essential service to
/// be running.
pub async fn run_healthcheck<R: CommandRunner>(
    cfg: &ToolkitConfig,
    runner: &R,
    log: &dyn Reporter,
) -> Result<AuditRecord, HealthError> {
    let audit = run_audit(cfg, runner, log)
        .await
        .map_err(|e| HealthError::Critical(e.to_string()))?;
    check_essential(&audit.containers, &cfg.health.essential_services)?;
    Ok(audit)
}
