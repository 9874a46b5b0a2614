//! Record extraction: rendered table rows to [`Record`]s.
//!
//! The cell-to-field mapping is positional and fixed:
//!
//! | cell | field           |
//! |------|-----------------|
//! | 0    | `sequence_id`   |
//! | 1    | `approval_date` |
//! | 2    | `item_name`     |
//! | 3    | `title`         |
//!
//! Cells past the fourth are ignored. Rows with fewer than four cells
//! (placeholder "no results" rows, spacer rows) are skipped, not errors.

use chrono::NaiveDateTime;

use crate::models::{Record, RowCells};

/// Minimum number of cells a row needs to become a record.
pub const MIN_CELLS: usize = 4;

/// Map one row to a record, or `None` if the row is too short.
pub fn record_from_row(row: &[String], observed_at: NaiveDateTime) -> Option<Record> {
    let [sequence_id, approval_date, item_name, title, ..] = row else {
        return None;
    };

    Some(Record {
        sequence_id: sequence_id.trim().to_string(),
        approval_date: approval_date.trim().to_string(),
        item_name: item_name.trim().to_string(),
        title: title.trim().to_string(),
        observed_at,
    })
}

/// Extract all records from one page's rows, preserving row order.
///
/// Every record gets the same `observed_at`, the run's capture time.
pub fn extract_records(page: u32, rows: &[RowCells], observed_at: NaiveDateTime) -> Vec<Record> {
    let records: Vec<Record> = rows
        .iter()
        .enumerate()
        .filter_map(|(idx, row)| {
            let record = record_from_row(row, observed_at);
            if record.is_none() {
                tracing::debug!(page, row = idx, cells = row.len(), "Skipping short row");
            }
            record
        })
        .collect();

    if records.len() < rows.len() {
        tracing::debug!(
            page,
            rows = rows.len(),
            records = records.len(),
            "Dropped malformed rows"
        );
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{fixed_time, row};

    #[test]
    fn rows_with_fewer_than_four_cells_are_dropped() {
        let rows = vec![
            row(&["1", "2024-01-02", "Item A", "Title A"]),
            row(&["no", "results", "here"]),
            row(&["2", "2024-01-03", "Item B", "Title B", "extra"]),
            row(&["3", "2024-01-04", "Item C", "Title C"]),
        ];

        let records = extract_records(1, &rows, fixed_time());

        assert_eq!(records.len(), 3);
        let ids: Vec<_> = records.iter().map(|r| r.sequence_id.as_str()).collect();
        assert_eq!(ids, ["1", "2", "3"]);
    }

    #[test]
    fn cells_map_positionally() {
        let rows = vec![row(&[
            " 1042 ",
            "2024-05-17",
            "AI 판독 소프트웨어",
            "[디지털의료기기] 영상 판독 보조 임상시험",
        ])];

        let records = extract_records(1, &rows, fixed_time());

        let r = &records[0];
        assert_eq!(r.sequence_id, "1042");
        assert_eq!(r.approval_date, "2024-05-17");
        assert_eq!(r.item_name, "AI 판독 소프트웨어");
        assert_eq!(r.title, "[디지털의료기기] 영상 판독 보조 임상시험");
        assert_eq!(r.observed_at, fixed_time());
    }

    #[test]
    fn every_record_shares_the_run_timestamp() {
        let rows = vec![row(&["1", "d", "i", "t"]), row(&["2", "d", "i", "t"])];
        let records = extract_records(3, &rows, fixed_time());
        assert!(records.iter().all(|r| r.observed_at == fixed_time()));
    }

    #[test]
    fn empty_page_yields_no_records() {
        assert!(extract_records(1, &[], fixed_time()).is_empty());
        assert!(extract_records(1, &[row(&[])], fixed_time()).is_empty());
    }
}
