use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::models::StatusRecord;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Pure data-access layer over status records: one JSON file per job
/// id, no business logic. Writes are temp-file + rename so a poller
/// never reads a torn record.
pub struct StatusStore {
    dir: PathBuf,
}

impl StatusStore {
    pub fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn record_path(&self, job_id: &str) -> PathBuf {
        self.dir.join(format!("{job_id}.json"))
    }

    pub fn write(&self, record: &StatusRecord) -> Result<(), StoreError> {
        let path = self.record_path(&record.job_id);
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer_pretty(&mut tmp, record)?;
        tmp.write_all(b"\n")?;
        tmp.persist(&path).map_err(|e| e.error)?;
        debug!(job_id = %record.job_id, status = %record.status, "Status record written");
        Ok(())
    }

    pub fn read(&self, job_id: &str) -> Result<Option<StatusRecord>, StoreError> {
        let path = self.record_path(job_id);
        let data = match std::fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&data)?))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
