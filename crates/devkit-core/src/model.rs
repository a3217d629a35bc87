use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Bytes per GiB.
pub const GIB: f64 = (1u64 << 30) as f64;

/// Models at or above this size (GiB) are never benchmarked.
pub const SIZE_THRESHOLD_GIB: f64 = 20.0;

/// Provider-reported model metadata. The upstream schema is not fixed, so this
/// stays an open JSON mapping.
pub type Details = Map<String, Value>;

/// One entry of the installed-model inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelStub {
    pub name: String,
    pub size_bytes: u64,
}

impl ModelStub {
    pub fn size_gb(&self) -> f64 {
        self.size_bytes as f64 / GIB
    }

    pub fn exceeds_size_threshold(&self) -> bool {
        self.size_gb() >= SIZE_THRESHOLD_GIB
    }
}

/// Result of a single benchmark call. Exactly one variant is populated, so a
/// partial record cannot be represented.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BenchmarkOutcome {
    Success {
        tokens_per_second: f64,
        eval_token_count: u64,
        eval_duration_seconds: f64,
        total_duration_seconds: f64,
        load_duration_seconds: f64,
    },
    Failure {
        reason: String,
    },
}

impl BenchmarkOutcome {
    pub const SKIPPED_TOO_LARGE: &'static str = "skipped: exceeds size threshold";

    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
        }
    }

    pub fn skipped_too_large() -> Self {
        Self::failure(Self::SKIPPED_TOO_LARGE)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn tokens_per_second(&self) -> Option<f64> {
        match self {
            Self::Success {
                tokens_per_second, ..
            } => Some(*tokens_per_second),
            Self::Failure { .. } => None,
        }
    }
}

/// A fully audited model: inventory data, metadata and benchmark outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub name: String,
    pub size_bytes: u64,
    pub size_gb: f64,
    pub details: Details,
    pub metrics: BenchmarkOutcome,
}

impl ModelDescriptor {
    pub fn new(stub: ModelStub, details: Details, metrics: BenchmarkOutcome) -> Self {
        let size_gb = stub.size_gb();
        Self {
            name: stub.name,
            size_bytes: stub.size_bytes,
            size_gb,
            details,
            metrics,
        }
    }

    /// Look up a string-valued detail such as `family` or `quantization_level`.
    pub fn detail_str(&self, key: &str) -> Option<&str> {
        self.details.get(key).and_then(|v| v.as_str())
    }
}
