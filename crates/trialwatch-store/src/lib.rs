pub mod csv_store;

pub use csv_store::{CsvSnapshotStore, DEFAULT_SNAPSHOT_PATH};
