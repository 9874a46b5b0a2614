//! Test utilities: mock implementations of all core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::AppError;
use crate::models::{Record, RowCells, Snapshot};
use crate::monitor::{MonitorEvent, MonitorReporter};
use crate::report::Notification;
use crate::traits::{Notifier, PageSource, SnapshotStore};

// ---------------------------------------------------------------------------
// MockPageSource
// ---------------------------------------------------------------------------

/// Mock page source that returns a queue of page results.
#[derive(Clone)]
pub struct MockPageSource {
    /// Queue of responses. Each call pops the first element.
    /// If empty, returns a page without rows.
    pages: Arc<Mutex<Vec<Result<Vec<RowCells>, AppError>>>>,
    requested: Arc<Mutex<Vec<u32>>>,
}

impl MockPageSource {
    pub fn with_pages(pages: Vec<Result<Vec<RowCells>, AppError>>) -> Self {
        Self {
            pages: Arc::new(Mutex::new(pages)),
            requested: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Pages requested so far, in call order.
    pub fn requested_pages(&self) -> Vec<u32> {
        self.requested.lock().unwrap().clone()
    }
}

impl PageSource for MockPageSource {
    async fn page_rows(&self, page: u32) -> Result<Vec<RowCells>, AppError> {
        self.requested.lock().unwrap().push(page);
        let mut pages = self.pages.lock().unwrap();
        if pages.is_empty() {
            Ok(Vec::new())
        } else {
            pages.remove(0)
        }
    }
}

// ---------------------------------------------------------------------------
// MockSnapshotStore
// ---------------------------------------------------------------------------

/// Mock store that records saves and returns a configurable previous snapshot.
#[derive(Clone)]
pub struct MockSnapshotStore {
    pub saved: Arc<Mutex<Vec<Snapshot>>>,
    previous: Arc<Mutex<Snapshot>>,
    save_error: Arc<Mutex<Option<AppError>>>,
}

impl MockSnapshotStore {
    /// Empty store: first run, no previous data.
    pub fn empty() -> Self {
        Self::with_previous(Snapshot::empty())
    }

    pub fn with_previous(previous: Snapshot) -> Self {
        Self {
            saved: Arc::new(Mutex::new(Vec::new())),
            previous: Arc::new(Mutex::new(previous)),
            save_error: Arc::new(Mutex::new(None)),
        }
    }

    /// Store that returns an error on save.
    pub fn with_save_error(previous: Snapshot, error: AppError) -> Self {
        Self {
            saved: Arc::new(Mutex::new(Vec::new())),
            previous: Arc::new(Mutex::new(previous)),
            save_error: Arc::new(Mutex::new(Some(error))),
        }
    }
}

impl SnapshotStore for MockSnapshotStore {
    fn load(&self) -> Snapshot {
        self.previous.lock().unwrap().clone()
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), AppError> {
        if let Some(e) = self.save_error.lock().unwrap().take() {
            return Err(e);
        }
        self.saved.lock().unwrap().push(snapshot.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockNotifier
// ---------------------------------------------------------------------------

/// Mock notifier that records every notification it is asked to send.
#[derive(Clone, Default)]
pub struct MockNotifier {
    pub sent: Arc<Mutex<Vec<Notification>>>,
    error: Arc<Mutex<Option<AppError>>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_error(error: AppError) -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            error: Arc::new(Mutex::new(Some(error))),
        }
    }

    pub fn call_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

impl Notifier for MockNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), AppError> {
        if let Some(e) = self.error.lock().unwrap().take() {
            return Err(e);
        }
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RecordingReporter
// ---------------------------------------------------------------------------

/// Reporter that records the label of every event.
#[derive(Default)]
pub struct RecordingReporter {
    pub events: Arc<Mutex<Vec<String>>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn labels(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl MonitorReporter for RecordingReporter {
    fn report(&self, event: MonitorEvent<'_>) {
        let label = match &event {
            MonitorEvent::ScanStarted { .. } => "ScanStarted",
            MonitorEvent::PageLoaded { .. } => "PageLoaded",
            MonitorEvent::PageSkipped { .. } => "PageSkipped",
            MonitorEvent::ScanFinished { .. } => "ScanFinished",
            MonitorEvent::PreviousLoaded { .. } => "PreviousLoaded",
            MonitorEvent::DiffComputed { .. } => "DiffComputed",
            MonitorEvent::NotificationSent { .. } => "NotificationSent",
            MonitorEvent::NothingToSend => "NothingToSend",
            MonitorEvent::SnapshotSaved { .. } => "SnapshotSaved",
        };
        self.events.lock().unwrap().push(label.to_string());
    }
}

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// A fixed capture time, 2024-05-17 09:30:00.
pub fn fixed_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 17)
        .and_then(|d| d.and_hms_opt(9, 30, 0))
        .unwrap()
}

/// A record with the given id and title and fixed remaining fields.
pub fn record(sequence_id: &str, title: &str) -> Record {
    Record {
        sequence_id: sequence_id.to_string(),
        approval_date: "2024-05-17".to_string(),
        item_name: format!("품목 {sequence_id}"),
        title: title.to_string(),
        observed_at: fixed_time(),
    }
}

/// Build a table row from cell texts.
pub fn row(cells: &[&str]) -> RowCells {
    cells.iter().map(|c| c.to_string()).collect()
}
