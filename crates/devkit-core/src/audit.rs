use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::ToolkitConfig;
use crate::error::{DevkitError, Result};
use crate::process::CommandRunner;
use crate::reporter::Reporter;

/// Environment audit: containers, env file, disk space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Container name to runtime status string, e.g. `"Up 3 hours"`.
    pub containers: BTreeMap<String, String>,
    pub env_validation: EnvValidation,
    pub disk_space: DiskSpace,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvValidation {
    pub path: PathBuf,
    pub exists: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DiskSpace {
    Usage {
        total_gb: u64,
        used_gb: u64,
        free_gb: u64,
    },
    Unavailable {
        error: String,
    },
}

/// Parse `docker ps --format "{{.Names}}\t{{.Status}}"` output.
pub fn parse_container_status(output: &str) -> BTreeMap<String, String> {
    output
        .lines()
        .filter_map(|line| {
            let (name, status) = line.split_once('\t')?;
            let name = name.trim();
            (!name.is_empty()).then(|| (name.to_string(), status.trim().to_string()))
        })
        .collect()
}

/// Parse POSIX `df -Pk <path>` output into whole GiB.
pub fn parse_df(output: &str) -> Option<DiskSpace> {
    let line = output.lines().skip(1).find(|l| !l.trim().is_empty())?;
    let fields: Vec<&str> = line.split_whitespace().collect();
    // Filesystem, 1024-blocks, Used, Available, Capacity, Mounted on
    if fields.len() < 6 {
        return None;
    }
    let total_kb: u64 = fields[1].parse().ok()?;
    let used_kb: u64 = fields[2].parse().ok()?;
    let free_kb: u64 = fields[3].parse().ok()?;
    const KIB_PER_GIB: u64 = 1 << 20;
    Some(DiskSpace::Usage {
        total_gb: total_kb / KIB_PER_GIB,
        used_gb: used_kb / KIB_PER_GIB,
        free_gb: free_kb / KIB_PER_GIB,
    })
}

async fn container_status<R: CommandRunner>(
    runner: &R,
    log: &dyn Reporter,
) -> BTreeMap<String, String> {
    let out = runner
        .run(
            "docker",
            &["ps", "--format", "{{.Names}}\t{{.Status}}"],
            None,
        )
        .await;
    if !out.success {
        log.warn(&format!("Container audit: runtime unavailable ({})", out.output.trim()));
        return BTreeMap::new();
    }
    let containers = parse_container_status(&out.output);
    log.info(&format!("Container audit: {} containers found", containers.len()));
    containers
}

async fn disk_space<R: CommandRunner>(
    runner: &R,
    cfg: &ToolkitConfig,
    log: &dyn Reporter,
) -> DiskSpace {
    let root = cfg.root().to_string_lossy().into_owned();
    let out = runner.run("df", &["-Pk", root.as_str()], None).await;
    let parsed = if out.success { parse_df(&out.output) } else { None };
    match parsed {
        Some(usage) => {
            if let DiskSpace::Usage { free_gb, .. } = &usage {
                log.info(&format!("Disk space: {free_gb} GB available"));
            }
            usage
        }
        None => {
            let error = if out.success {
                "unrecognised df output".to_string()
            } else {
                out.output.trim().to_string()
            };
            log.warn(&format!("Disk space: unavailable ({error})"));
            DiskSpace::Unavailable { error }
        }
    }
}

/// Run every audit check in order. Individual check failures are recorded in
/// the record; only a missing project root is an error.
pub async fn run_audit<R: CommandRunner>(
    cfg: &ToolkitConfig,
    runner: &R,
    log: &dyn Reporter,
) -> Result<AuditRecord> {
    if !cfg.root().is_dir() {
        return Err(DevkitError::Io(format!(
            "project root not found: {}",
            cfg.root().display()
        )));
    }
    log.info("Starting system audit");

    let containers = if cfg.audit.containers {
        container_status(runner, log).await
    } else {
        log.info("Skipping container audit (disabled in config)");
        BTreeMap::new()
    };

    let env_path = cfg.env_file_path();
    let exists = env_path.exists();
    if exists {
        log.info(&format!("Environment configuration found at {}", env_path.display()));
    } else {
        log.error(&format!("CRITICAL: env file missing at {}", env_path.display()));
    }

    let disk_space = disk_space(runner, cfg, log).await;

    Ok(AuditRecord {
        containers,
        env_validation: EnvValidation {
            path: env_path,
            exists,
        },
        disk_space,
    })
}
