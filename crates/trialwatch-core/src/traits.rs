use std::future::Future;

use crate::error::AppError;
use crate::models::{RowCells, Snapshot};
use crate::report::Notification;

/// Supplies the rendered rows of one registry listing page.
///
/// Implementations own navigation (page 1 is the initial listing, later
/// pages are reached through the registry's pagination control) and any
/// settle delay needed before the rows can be read.
pub trait PageSource: Send + Sync {
    fn page_rows(&self, page: u32) -> impl Future<Output = Result<Vec<RowCells>, AppError>> + Send;
}

/// Loads and persists the snapshot of the most recent successful run.
pub trait SnapshotStore: Send + Sync {
    /// Load the previous snapshot.
    ///
    /// Returns an empty snapshot when nothing was persisted yet or the
    /// stored data cannot be read; both are treated as a first run.
    fn load(&self) -> Snapshot;

    /// Replace the persisted snapshot atomically.
    fn save(&self, snapshot: &Snapshot) -> Result<(), AppError>;
}

/// Delivers a rendered notification.
pub trait Notifier: Send + Sync {
    fn send(&self, notification: &Notification) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// A Notifier that drops every notification, for dry runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    async fn send(&self, _notification: &Notification) -> Result<(), AppError> {
        Ok(())
    }
}
