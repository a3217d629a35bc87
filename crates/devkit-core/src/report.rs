use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{DevkitError, Result};

/// Writes run records as pretty JSON under one directory.
#[derive(Debug, Clone)]
pub struct ReportStore {
    dir: PathBuf,
}

impl ReportStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Serialize `record` to `<dir>/<name>_<YYYYmmdd_HHMMSS>.json` and return
    /// the path. A `_<n>` suffix is added when that file already exists, so
    /// a report is never overwritten.
    pub fn save<T: Serialize>(&self, record: &T, name: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            DevkitError::Io(format!("cannot create {}: {e}", self.dir.display()))
        })?;

        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let body = serde_json::to_string_pretty(record)?;

        let mut n = 0u32;
        loop {
            let file = if n == 0 {
                format!("{name}_{stamp}.json")
            } else {
                format!("{name}_{stamp}_{n}.json")
            };
            let path = self.dir.join(file);
            match std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
            {
                Ok(mut f) => {
                    use std::io::Write as _;
                    f.write_all(body.as_bytes()).map_err(|e| {
                        DevkitError::Io(format!("failed to write {}: {e}", path.display()))
                    })?;
                    tracing::debug!(path = %path.display(), "report written");
                    return Ok(path);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => n += 1,
                Err(e) => {
                    return Err(DevkitError::Io(format!(
                        "failed to create {}: {e}",
                        path.display()
                    )))
                }
            }
        }
    }
}
