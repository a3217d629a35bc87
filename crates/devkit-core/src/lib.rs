pub mod api;
pub mod audit;
pub mod bench;
pub mod benchmark;
pub mod config;
pub mod error;
pub mod health;
pub mod inventory;
pub mod model;
pub mod optimize;
pub mod probe;
pub mod process;
pub mod report;
pub mod reporter;
pub mod suites;

pub use config::ToolkitConfig;
pub use error::{DevkitError, Result};
pub use model::{BenchmarkOutcome, Details, ModelDescriptor, ModelStub};
pub use process::{CommandOutput, CommandRunner, SystemRunner};
pub use report::ReportStore;
pub use reporter::{Reporter, TracingReporter};
