use std::collections::HashSet;

use chrono::NaiveDateTime;
use sha2::{Digest, Sha256};

use crate::error::AppError;

/// Ordered cell texts of one rendered table row.
pub type RowCells = Vec<String>;

/// One registry entry as observed by a run.
///
/// The serde aliases accept the column headers written by earlier
/// deployments of the monitor, so an existing snapshot file carries over.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Record {
    /// Registry-assigned identifier; the only identity key used for diffing.
    #[serde(alias = "연번")]
    pub sequence_id: String,
    /// Display-formatted approval date, kept as text.
    #[serde(alias = "승인일자", default)]
    pub approval_date: String,
    #[serde(alias = "품목명", default)]
    pub item_name: String,
    /// Trial title; may embed a bracketed category marker.
    #[serde(alias = "임상시험의 제목", default)]
    pub title: String,
    /// When the run captured this record.
    #[serde(alias = "크롤링일시", with = "observed_at_format")]
    pub observed_at: NaiveDateTime,
}

/// Text format of [`Record::observed_at`] in persisted snapshots.
pub mod observed_at_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(raw.trim(), FORMAT).map_err(serde::de::Error::custom)
    }
}

/// The full ordered set of records observed in one run.
///
/// Order is the registry's display order (front = first row of page 1).
/// A snapshot is never mutated after capture; the diff engine builds new
/// snapshots instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    records: Vec<Record>,
}

impl Snapshot {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// Set of sequence ids; duplicates collapse.
    pub fn sequence_ids(&self) -> HashSet<&str> {
        self.records.iter().map(|r| r.sequence_id.as_str()).collect()
    }

    /// The first `n` records in display order.
    pub fn head(&self, n: usize) -> Snapshot {
        self.records.iter().take(n).cloned().collect()
    }

    /// SHA-256 over the ordered sequence ids, as 64-char hex.
    ///
    /// Two runs that observed the same registry listing share a fingerprint.
    pub fn fingerprint(&self) -> String {
        let joined = self
            .records
            .iter()
            .map(|r| r.sequence_id.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        compute_hash(&joined)
    }
}

impl FromIterator<Record> for Snapshot {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Result of scanning one registry page.
#[derive(Debug)]
pub enum PageOutcome {
    Loaded { page: u32, records: Vec<Record> },
    Failed { page: u32, reason: AppError },
}

/// Compute a SHA-256 hash of a string, returned as 64-char hex.
pub fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
