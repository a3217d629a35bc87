use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DevkitError, Result};

/// Environment variable that overrides `inference.url`.
pub const INFERENCE_URL_ENV: &str = "DEVKIT_INFERENCE_URL";

const CONFIG_FILE: &str = "devkit.toml";

/// Toolkit configuration. Every field has a default, so an empty file (or no
/// file at all) is a valid configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolkitConfig {
    /// Reports directory, relative to the project root unless absolute.
    pub reports_dir: PathBuf,
    /// Log directory, relative to the project root unless absolute.
    pub logs_dir: PathBuf,
    /// Environment file whose presence the audit checks.
    pub env_file: PathBuf,
    pub inference: InferenceConfig,
    pub audit: AuditConfig,
    pub health: HealthConfig,
    pub bench: BenchConfig,
    pub optimize: OptimizeConfig,
    pub tests: TestsConfig,

    #[serde(skip)]
    root: PathBuf,
    #[serde(skip)]
    source: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Base URL of the inference API, including the `/api` prefix.
    pub url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Query the container runtime for container status.
    pub containers: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub essential_services: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    pub gateway_host: String,
    pub gateway_port: u16,
    pub visual_telemetry_url: String,
    pub ai_metrics_url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizeConfig {
    pub cleanup: Vec<CleanupStep>,
}

/// A named cleanup command, e.g. `{ name = "dangling images", command =
/// ["docker", "image", "prune", "-f"] }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupStep {
    pub name: String,
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TestsConfig {
    pub backend_dir: PathBuf,
    pub middleware_dir: PathBuf,
    pub frontend_dir: PathBuf,
}

impl Default for ToolkitConfig {
    fn default() -> Self {
        Self {
            reports_dir: PathBuf::from("infra/build/reports"),
            logs_dir: PathBuf::from("infra/build/logs"),
            env_file: PathBuf::from("infra/config/.env"),
            inference: InferenceConfig::default(),
            audit: AuditConfig::default(),
            health: HealthConfig::default(),
            bench: BenchConfig::default(),
            optimize: OptimizeConfig::default(),
            tests: TestsConfig::default(),
            root: PathBuf::from("."),
            source: None,
        }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:11434/api".into(),
            timeout_secs: 120,
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self { containers: true }
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            essential_services: vec!["backend".into(), "middleware".into(), "frontend".into()],
        }
    }
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            gateway_host: "localhost".into(),
            gateway_port: 3000,
            visual_telemetry_url: "http://localhost:3001/api/v1/telemetry/visual".into(),
            ai_metrics_url: "http://localhost:3000/api/v1/ai/metrics".into(),
        }
    }
}

impl Default for TestsConfig {
    fn default() -> Self {
        Self {
            backend_dir: PathBuf::from("apps/backend"),
            middleware_dir: PathBuf::from("apps/middleware"),
            frontend_dir: PathBuf::from("apps/frontend"),
        }
    }
}

impl ToolkitConfig {
    /// Parse a configuration from a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| DevkitError::Config(e.to_string()))
    }

    /// Load configuration for the project rooted at `root`.
    ///
    /// Lookup order: `explicit` (must exist), `<root>/devkit.toml`, the user
    /// config dir's `devkit/config.toml`, then built-in defaults. The
    /// `DEVKIT_INFERENCE_URL` variable overrides the inference URL.
    pub fn load(explicit: Option<&Path>, root: &Path) -> Result<Self> {
        let path = match explicit {
            Some(p) => {
                if !p.exists() {
                    return Err(DevkitError::Config(format!(
                        "config file not found: {}",
                        p.display()
                    )));
                }
                Some(p.to_path_buf())
            }
            None => [
                Some(root.join(CONFIG_FILE)),
                dirs::config_dir().map(|d| d.join("devkit").join("config.toml")),
            ]
            .into_iter()
            .flatten()
            .find(|p| p.exists()),
        };

        let mut config = match &path {
            Some(p) => {
                let content = std::fs::read_to_string(p)?;
                Self::parse(&content)?
            }
            None => Self::default(),
        };

        if let Ok(url) = std::env::var(INFERENCE_URL_ENV) {
            if !url.trim().is_empty() {
                config.inference.url = url.trim().to_string();
            }
        }

        config.root = root.to_path_buf();
        config.source = path;
        Ok(config)
    }

    /// Return a copy of this config anchored at `root`.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File the configuration was read from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn reports_path(&self) -> PathBuf {
        self.root.join(&self.reports_dir)
    }

    pub fn logs_path(&self) -> PathBuf {
        self.root.join(&self.logs_dir)
    }

    pub fn env_file_path(&self) -> PathBuf {
        self.root.join(&self.env_file)
    }
}
