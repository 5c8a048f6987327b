//! Audit persistence collaborator.
//!
//! Writes each full query response (query text, resolved filter/intent,
//! result, recommendations, timestamp) as a pretty-printed JSON file. The
//! analysis core hands the response over read-only and has no opinion on
//! storage; failures here are reported to the caller but never abort a query.

use crate::analyzer::QueryResponse;
use crate::error::Result;
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

pub struct AuditLog {
    dir: PathBuf,
}

impl AuditLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persists one response and returns the file it was written to.
    pub fn record(&self, response: &QueryResponse) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;

        let stamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
        let id = Uuid::new_v4().simple().to_string();
        let path = self.dir.join(format!("audit_{}_{}.json", stamp, &id[..8]));

        let file = fs::File::create(&path)?;
        serde_json::to_writer_pretty(file, response)?;
        info!("Audit record written to {}", path.display());
        Ok(path)
    }
}
