use std::path::PathBuf;

use tempfile::TempDir;
use trialwatch_core::Snapshot;
use trialwatch_core::testutil::record;
use trialwatch_store::CsvSnapshotStore;

/// A store in a fresh temp directory, pre-seeded with `ids`.
///
/// The `TempDir` must be kept in scope for the test duration.
pub fn seeded_store(ids: &[&str]) -> (CsvSnapshotStore, PathBuf, TempDir) {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("previous_data.csv");
    let store = CsvSnapshotStore::new(&path);
    if !ids.is_empty() {
        let snapshot: Snapshot = ids.iter().map(|id| record(id, &format!("Title {id}"))).collect();
        trialwatch_core::SnapshotStore::save(&store, &snapshot).expect("seed snapshot");
    }
    (store, path, dir)
}
