pub mod config;
pub mod diff;
pub mod error;
pub mod extract;
pub mod models;
pub mod monitor;
pub mod report;
pub mod traits;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use config::MonitorConfig;
pub use diff::{FirstRunPolicy, new_items};
pub use error::AppError;
pub use models::{Record, RowCells, Snapshot, compute_hash};
pub use monitor::{MonitorService, RunPlan, RunReport, TracingReporter};
pub use report::Notification;
pub use traits::{Notifier, PageSource, SnapshotStore};
