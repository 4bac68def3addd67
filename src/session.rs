use std::io::Write;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::grid::Grid;
use crate::models::StudentRecord;

pub const DEFAULT_SESSION_FILE: &str = "plan.json";

/// Form values and tracking grid for one student, kept between commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub record: StudentRecord,
    pub grid: Grid,
}

impl Session {
    pub fn new(record: StudentRecord, grid: Grid) -> Self {
        Self { record, grid }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path).with_context(|| {
            format!(
                "failed to read session {} (run `init` first)",
                path.display()
            )
        })?;
        let session = serde_json::from_str(&raw)
            .with_context(|| format!("invalid session file {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded session");
        Ok(session)
    }

    /// Replaces the file atomically so an interrupted save keeps the old session.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let body = serde_json::to_string_pretty(self).context("failed to serialize session")?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create directory {}", dir.display()))?;
        let mut tmp = NamedTempFile::new_in(dir)
            .with_context(|| format!("failed to create temp file in {}", dir.display()))?;
        tmp.write_all(body.as_bytes())
            .context("failed to write session")?;
        tmp.persist(path)
            .map_err(|err| err.error)
            .with_context(|| format!("failed to save session {}", path.display()))?;
        tracing::debug!(path = %path.display(), rows = self.grid.len(), "saved session");
        Ok(())
    }
}
