use chrono::NaiveDateTime;

use crate::config::MonitorConfig;
use crate::diff::new_items_with_policy;
use crate::error::AppError;
use crate::extract::extract_records;
use crate::models::{PageOutcome, Snapshot};
use crate::report::{Notification, classify, render};
use crate::traits::{Notifier, PageSource, SnapshotStore};

/// Events emitted during a run for monitoring/logging.
#[derive(Debug)]
pub enum MonitorEvent<'a> {
    ScanStarted {
        max_pages: u32,
    },
    PageLoaded {
        page: u32,
        rows: usize,
        records: usize,
    },
    PageSkipped {
        page: u32,
        reason: &'a AppError,
    },
    ScanFinished {
        records: usize,
        pages_skipped: usize,
    },
    PreviousLoaded {
        records: usize,
    },
    DiffComputed {
        new_items: usize,
        flagged: usize,
        first_run: bool,
    },
    NotificationSent {
        subject: &'a str,
    },
    NothingToSend,
    SnapshotSaved {
        records: usize,
        fingerprint: &'a str,
        changed: bool,
    },
}

/// Trait for receiving run events (decoupled logging).
pub trait MonitorReporter: Send + Sync {
    fn report(&self, event: MonitorEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl MonitorReporter for TracingReporter {
    fn report(&self, event: MonitorEvent<'_>) {
        match event {
            MonitorEvent::ScanStarted { max_pages } => {
                tracing::info!(%max_pages, "Scanning registry");
            }
            MonitorEvent::PageLoaded {
                page,
                rows,
                records,
            } => {
                tracing::info!(%page, %rows, %records, "Page extracted");
            }
            MonitorEvent::PageSkipped { page, reason } => {
                tracing::warn!(%page, error = %reason, "Page skipped");
            }
            MonitorEvent::ScanFinished {
                records,
                pages_skipped,
            } => {
                tracing::info!(%records, %pages_skipped, "Scan finished");
            }
            MonitorEvent::PreviousLoaded { records } => {
                if records == 0 {
                    tracing::info!("No previous snapshot, treating as first run");
                } else {
                    tracing::info!(%records, "Previous snapshot loaded");
                }
            }
            MonitorEvent::DiffComputed {
                new_items,
                flagged,
                first_run,
            } => {
                tracing::info!(%new_items, %flagged, %first_run, "Diff computed");
            }
            MonitorEvent::NotificationSent { subject } => {
                tracing::info!(%subject, "Notification sent");
            }
            MonitorEvent::NothingToSend => {
                tracing::info!("No new items, nothing to send");
            }
            MonitorEvent::SnapshotSaved {
                records,
                fingerprint,
                changed,
            } => {
                let short = &fingerprint[..fingerprint.len().min(8)];
                if changed {
                    tracing::info!(%records, fingerprint = %short, "Listing CHANGED, snapshot saved");
                } else {
                    tracing::info!(%records, fingerprint = %short, "Listing unchanged, snapshot saved");
                }
            }
        }
    }
}

/// Aggregated outcome of scanning all pages of one run.
#[derive(Debug, Default)]
pub struct ScanReport {
    pub snapshot: Snapshot,
    pub pages_scanned: u32,
    pub skipped_pages: Vec<u32>,
}

impl ScanReport {
    /// Concatenate loaded pages in page order; failed pages count as empty.
    pub fn from_outcomes(outcomes: Vec<PageOutcome>) -> Self {
        let pages_scanned = outcomes.len() as u32;
        let mut skipped_pages = Vec::new();
        let mut records = Vec::new();

        for outcome in outcomes {
            match outcome {
                PageOutcome::Loaded {
                    records: page_records,
                    ..
                } => records.extend(page_records),
                PageOutcome::Failed { page, .. } => skipped_pages.push(page),
            }
        }

        Self {
            snapshot: Snapshot::new(records),
            pages_scanned,
            skipped_pages,
        }
    }
}

/// Everything a run would do, computed without side effects.
#[derive(Debug)]
pub struct RunPlan {
    pub current: Snapshot,
    pub previous: Snapshot,
    pub new_items: Snapshot,
    pub flagged: usize,
    pub skipped_pages: Vec<u32>,
    pub notification: Option<Notification>,
}

impl RunPlan {
    pub fn is_first_run(&self) -> bool {
        self.previous.is_empty()
    }

    /// Whether the observed listing differs from the previous one at all.
    pub fn listing_changed(&self) -> bool {
        self.current.fingerprint() != self.previous.fingerprint()
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub records_seen: usize,
    pub new_items: usize,
    pub flagged: usize,
    pub skipped_pages: Vec<u32>,
    pub notified: bool,
    pub fingerprint: String,
}

/// Orchestrates one monitor run: scan → diff → notify → persist.
///
/// Generic over the rendering collaborator, the snapshot store and the
/// notifier so the whole pipeline runs against mocks in tests.
pub struct MonitorService<P, S, N>
where
    P: PageSource,
    S: SnapshotStore,
    N: Notifier,
{
    source: P,
    store: S,
    notifier: N,
    config: MonitorConfig,
}

impl<P, S, N> MonitorService<P, S, N>
where
    P: PageSource,
    S: SnapshotStore,
    N: Notifier,
{
    pub fn new(source: P, store: S, notifier: N, config: MonitorConfig) -> Self {
        Self {
            source,
            store,
            notifier,
            config,
        }
    }

    /// Release the collaborators, e.g. to shut the browser down.
    pub fn into_parts(self) -> (P, S, N) {
        (self.source, self.store, self.notifier)
    }

    /// Scan pages 1..=max_pages, one attempt per page.
    ///
    /// A page-local failure is reported and the page counts as empty.
    /// Any other failure aborts the scan, as does an invalid config.
    pub async fn scan<R: MonitorReporter>(
        &self,
        observed_at: NaiveDateTime,
        reporter: &R,
    ) -> Result<ScanReport, AppError> {
        self.config.validate()?;
        reporter.report(MonitorEvent::ScanStarted {
            max_pages: self.config.max_pages,
        });

        let mut outcomes = Vec::new();
        for page in 1..=self.config.max_pages {
            let outcome = match self.source.page_rows(page).await {
                Ok(rows) => {
                    let records = extract_records(page, &rows, observed_at);
                    reporter.report(MonitorEvent::PageLoaded {
                        page,
                        rows: rows.len(),
                        records: records.len(),
                    });
                    PageOutcome::Loaded { page, records }
                }
                Err(reason) if reason.is_page_local() => {
                    reporter.report(MonitorEvent::PageSkipped {
                        page,
                        reason: &reason,
                    });
                    PageOutcome::Failed { page, reason }
                }
                Err(e) => return Err(e),
            };
            outcomes.push(outcome);
        }

        let scan = ScanReport::from_outcomes(outcomes);
        reporter.report(MonitorEvent::ScanFinished {
            records: scan.snapshot.len(),
            pages_skipped: scan.skipped_pages.len(),
        });
        Ok(scan)
    }

    /// Scan, diff against the persisted snapshot and render the payload.
    ///
    /// Nothing is sent and nothing is persisted.
    pub async fn plan<R: MonitorReporter>(
        &self,
        observed_at: NaiveDateTime,
        reporter: &R,
    ) -> Result<RunPlan, AppError> {
        let scan = self.scan(observed_at, reporter).await?;
        if scan.snapshot.is_empty() {
            return Err(AppError::NoRecords {
                pages_scanned: scan.pages_scanned,
            });
        }

        let previous = self.store.load();
        reporter.report(MonitorEvent::PreviousLoaded {
            records: previous.len(),
        });

        let new_items = new_items_with_policy(&scan.snapshot, &previous, self.config.first_run);
        let flagged = classify(&new_items, &self.config.flag_marker).flagged.len();
        reporter.report(MonitorEvent::DiffComputed {
            new_items: new_items.len(),
            flagged,
            first_run: previous.is_empty(),
        });

        let notification = render(&new_items, &self.config.flag_marker, observed_at.date());

        Ok(RunPlan {
            current: scan.snapshot,
            previous,
            new_items,
            flagged,
            skipped_pages: scan.skipped_pages,
            notification,
        })
    }

    /// Run the full pipeline.
    ///
    /// 1. Scan all pages into the current snapshot
    /// 2. Abort if nothing was extracted
    /// 3. Diff against the persisted snapshot
    /// 4. Send the notification, if there is anything new
    /// 5. Persist the current snapshot
    ///
    /// The persisted snapshot is only replaced once every earlier step
    /// succeeded, so a failed run can be retried against the same base.
    pub async fn run<R: MonitorReporter>(
        &self,
        observed_at: NaiveDateTime,
        reporter: &R,
    ) -> Result<RunReport, AppError> {
        let plan = self.plan(observed_at, reporter).await?;

        let notified = match &plan.notification {
            Some(notification) => {
                self.notifier.send(notification).await?;
                reporter.report(MonitorEvent::NotificationSent {
                    subject: &notification.subject,
                });
                true
            }
            None => {
                reporter.report(MonitorEvent::NothingToSend);
                false
            }
        };

        self.store.save(&plan.current)?;
        let fingerprint = plan.current.fingerprint();
        reporter.report(MonitorEvent::SnapshotSaved {
            records: plan.current.len(),
            fingerprint: &fingerprint,
            changed: plan.listing_changed(),
        });

        Ok(RunReport {
            records_seen: plan.current.len(),
            new_items: plan.new_items.len(),
            flagged: plan.flagged,
            skipped_pages: plan.skipped_pages,
            notified,
            fingerprint,
        })
    }
}
