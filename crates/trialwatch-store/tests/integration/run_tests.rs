use std::fs;

use trialwatch_core::testutil::{
    MockNotifier, MockPageSource, RecordingReporter, fixed_time, row,
};
use trialwatch_core::{AppError, MonitorConfig, MonitorService, SnapshotStore};

use crate::common::seeded_store;

#[tokio::test]
async fn zero_data_run_leaves_snapshot_file_byte_identical() {
    let (store, path, _dir) = seeded_store(&["2", "1"]);
    let before = fs::read(&path).unwrap();

    let source = MockPageSource::with_pages(vec![
        Ok(vec![row(&["조회된 결과가 없습니다."])]),
        Err(AppError::RenderError {
            page: 2,
            message: "pagination script missing".into(),
        }),
        Ok(Vec::new()),
    ]);
    let notifier = MockNotifier::new();
    let svc = MonitorService::new(
        source,
        store,
        notifier.clone(),
        MonitorConfig::default().with_max_pages(3),
    );

    let err = svc
        .run(fixed_time(), &RecordingReporter::new())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NoRecords { pages_scanned: 3 }));
    assert_eq!(notifier.call_count(), 0);
    assert_eq!(fs::read(&path).unwrap(), before);
}

#[tokio::test]
async fn successful_run_persists_current_listing() {
    let (store, path, _dir) = seeded_store(&["2", "1"]);

    let source = MockPageSource::with_pages(vec![Ok(vec![
        row(&["3", "2024-05-17", "AI SW", "[디지털의료기기] X"]),
        row(&["2", "2024-05-16", "품목 2", "Title 2"]),
        row(&["1", "2024-05-15", "품목 1", "Title 1"]),
    ])]);
    let notifier = MockNotifier::new();
    let svc = MonitorService::new(
        source,
        store.clone(),
        notifier.clone(),
        MonitorConfig::default().with_max_pages(1),
    );

    let report = svc.run(fixed_time(), &RecordingReporter::new()).await.unwrap();

    assert_eq!(report.new_items, 1);
    assert_eq!(report.flagged, 1);
    assert_eq!(notifier.call_count(), 1);

    let reloaded = store.load();
    let ids: Vec<_> = reloaded.iter().map(|r| r.sequence_id.as_str()).collect();
    assert_eq!(ids, ["3", "2", "1"]);
    assert_eq!(report.fingerprint, reloaded.fingerprint());
    assert!(path.exists());
}

#[tokio::test]
async fn failed_delivery_keeps_previous_snapshot() {
    let (store, path, _dir) = seeded_store(&["1"]);
    let before = fs::read(&path).unwrap();

    let source = MockPageSource::with_pages(vec![Ok(vec![
        row(&["2", "2024-05-17", "품목 2", "Title 2"]),
        row(&["1", "2024-05-15", "품목 1", "Title 1"]),
    ])]);
    let notifier = MockNotifier::with_error(AppError::DeliveryError("535 auth failed".into()));
    let svc = MonitorService::new(
        source,
        store,
        notifier,
        MonitorConfig::default().with_max_pages(1),
    );

    let err = svc
        .run(fixed_time(), &RecordingReporter::new())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::DeliveryError(_)));
    assert_eq!(fs::read(&path).unwrap(), before);
}
