#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use devkit_core::api::{GenerateRequest, InferenceApi};
use devkit_core::probe::Probe;
use devkit_core::{CommandOutput, CommandRunner, DevkitError, Result};
use serde_json::Value;

/// Canned reply for one fake endpoint.
#[derive(Clone)]
pub enum Reply {
    Json(Value),
    Status(u16),
    Unreachable,
}

impl Reply {
    fn to_result(&self) -> Result<Value> {
        match self {
            Reply::Json(v) => Ok(v.clone()),
            Reply::Status(status) => Err(DevkitError::Api {
                status: *status,
                body: "internal error".into(),
            }),
            Reply::Unreachable => Err(DevkitError::Other("connection refused".into())),
        }
    }
}

pub struct FakeApi {
    pub tags: Reply,
    pub show: HashMap<String, Reply>,
    pub generate: Reply,
    pub tags_calls: Cell<usize>,
    pub show_calls: Cell<usize>,
    pub generate_calls: RefCell<Vec<GenerateRequest>>,
}

impl FakeApi {
    pub fn new(tags: Reply, generate: Reply) -> Self {
        Self {
            tags,
            show: HashMap::new(),
            generate,
            tags_calls: Cell::new(0),
            show_calls: Cell::new(0),
            generate_calls: RefCell::new(Vec::new()),
        }
    }

    pub fn with_show(mut self, name: &str, reply: Reply) -> Self {
        self.show.insert(name.to_string(), reply);
        self
    }

    pub fn generate_count(&self) -> usize {
        self.generate_calls.borrow().len()
    }
}

impl InferenceApi for FakeApi {
    async fn tags(&self) -> Result<Value> {
        self.tags_calls.set(self.tags_calls.get() + 1);
        self.tags.to_result()
    }

    async fn show(&self, name: &str) -> Result<Value> {
        self.show_calls.set(self.show_calls.get() + 1);
        self.show
            .get(name)
            .cloned()
            .unwrap_or(Reply::Status(404))
            .to_result()
    }

    async fn generate(&self, req: &GenerateRequest) -> Result<Value> {
        self.generate_calls.borrow_mut().push(req.clone());
        self.generate.to_result()
    }
}

/// One recorded process invocation.
#[derive(Debug, Clone)]
pub struct Call {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

/// Replies keyed by `"<program> <first arg>"`; unknown commands fail as if
/// the program were missing.
#[derive(Default)]
pub struct FakeRunner {
    replies: HashMap<String, CommandOutput>,
    pub calls: RefCell<Vec<Call>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, key: &str, out: CommandOutput) -> Self {
        self.replies.insert(key.to_string(), out);
        self
    }

    pub fn programs(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|c| c.program.clone()).collect()
    }
}

impl CommandRunner for FakeRunner {
    async fn run(&self, program: &str, args: &[&str], cwd: Option<&Path>) -> CommandOutput {
        self.calls.borrow_mut().push(Call {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            cwd: cwd.map(Path::to_path_buf),
        });
        let key = match args.first() {
            Some(first) => format!("{program} {first}"),
            None => program.to_string(),
        };
        self.replies
            .get(&key)
            .cloned()
            .unwrap_or_else(|| CommandOutput::failed(format!("failed to run {program}: not found")))
    }
}

#[derive(Default)]
pub struct FakeProbe {
    pub json: HashMap<String, Value>,
    pub open_ports: Vec<u16>,
    pub get_calls: RefCell<Vec<String>>,
}

impl Probe for FakeProbe {
    async fn get_json(&self, url: &str) -> Result<Value> {
        self.get_calls.borrow_mut().push(url.to_string());
        self.json
            .get(url)
            .cloned()
            .ok_or_else(|| DevkitError::Other(format!("{url}: connection refused")))
    }

    async fn tcp_reachable(&self, _host: &str, port: u16) -> bool {
        self.open_ports.contains(&port)
    }
}

/// Fresh, empty directory under the system temp dir.
pub fn scratch_dir(tag: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("devkit-{tag}-{}-{nanos}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

pub const GIB: u64 = 1 << 30;
