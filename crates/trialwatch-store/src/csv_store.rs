use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use trialwatch_core::error::AppError;
use trialwatch_core::models::{Record, Snapshot};
use trialwatch_core::traits::SnapshotStore;

/// Snapshot file used when no path is configured.
pub const DEFAULT_SNAPSHOT_PATH: &str = "previous_data.csv";

const HEADERS: [&str; 5] = [
    "sequence_id",
    "approval_date",
    "item_name",
    "title",
    "observed_at",
];

/// Snapshot store backed by a single header-bearing CSV file.
///
/// Saves go through a temporary file in the same directory that is then
/// renamed over the target, so readers never see a partial snapshot.
#[derive(Debug, Clone)]
pub struct CsvSnapshotStore {
    path: PathBuf,
}

impl CsvSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read the persisted snapshot. `Ok(None)` if no file exists yet.
    pub fn read(&self) -> Result<Option<Snapshot>, AppError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .from_path(&self.path)
            .map_err(|e| snapshot_error(&self.path, e))?;

        let records = reader
            .deserialize::<Record>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| snapshot_error(&self.path, e))?;

        Ok(Some(Snapshot::new(records)))
    }

    fn write(&self, snapshot: &Snapshot) -> Result<(), AppError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|e| snapshot_error(dir, e))?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| snapshot_error(dir, e))?;
        {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(&mut tmp);
            writer
                .write_record(HEADERS)
                .map_err(|e| snapshot_error(&self.path, e))?;
            for record in snapshot {
                writer
                    .serialize(record)
                    .map_err(|e| snapshot_error(&self.path, e))?;
            }
            writer.flush().map_err(|e| snapshot_error(&self.path, e))?;
        }
        tmp.flush().map_err(|e| snapshot_error(&self.path, e))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| snapshot_error(&self.path, e))?;

        tmp.persist(&self.path)
            .map_err(|e| snapshot_error(&self.path, e.error))?;
        Ok(())
    }
}

impl Default for CsvSnapshotStore {
    fn default() -> Self {
        Self::new(DEFAULT_SNAPSHOT_PATH)
    }
}

impl SnapshotStore for CsvSnapshotStore {
    fn load(&self) -> Snapshot {
        match self.read() {
            Ok(Some(snapshot)) => {
                tracing::debug!(path = %self.path.display(), records = snapshot.len(), "Snapshot read");
                snapshot
            }
            Ok(None) => {
                tracing::info!(path = %self.path.display(), "No snapshot file yet");
                Snapshot::empty()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Snapshot unreadable, treating as first run");
                Snapshot::empty()
            }
        }
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), AppError> {
        self.write(snapshot)?;
        tracing::debug!(path = %self.path.display(), records = snapshot.len(), "Snapshot written");
        Ok(())
    }
}

fn snapshot_error(path: &Path, err: impl std::fmt::Display) -> AppError {
    AppError::SnapshotError(format!("{}: {err}", path.display()))
}
