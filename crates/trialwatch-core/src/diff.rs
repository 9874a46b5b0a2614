//! Incremental diff between the current and the previous snapshot.
//!
//! The diff is a set-membership filter over the current snapshot's order,
//! not a multiset diff: a record is new when its `sequence_id` does not
//! occur anywhere in the previous snapshot. Order and multiplicity of the
//! current snapshot are kept as they are.

use std::fmt;
use std::str::FromStr;

use crate::models::Snapshot;

/// What to report when there is no previous snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FirstRunPolicy {
    /// Report nothing; the historical backlog is only recorded.
    #[default]
    Suppress,
    /// Report the first `n` current records. Debug use only.
    Sample(usize),
}

impl fmt::Display for FirstRunPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FirstRunPolicy::Suppress => write!(f, "suppress"),
            FirstRunPolicy::Sample(n) => write!(f, "sample:{n}"),
        }
    }
}

impl FromStr for FirstRunPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        if s == "suppress" {
            return Ok(FirstRunPolicy::Suppress);
        }
        let count = s.strip_prefix("sample:").unwrap_or(s.as_str());
        count
            .parse::<usize>()
            .map(FirstRunPolicy::Sample)
            .map_err(|_| format!("Unknown first-run policy: {s}"))
    }
}

/// Records of `current` whose `sequence_id` is absent from `previous`.
///
/// An empty `previous` means no prior run exists, and the result is empty.
pub fn new_items(current: &Snapshot, previous: &Snapshot) -> Snapshot {
    new_items_with_policy(current, previous, FirstRunPolicy::Suppress)
}

/// Like [`new_items`], with an explicit policy for the first run.
pub fn new_items_with_policy(
    current: &Snapshot,
    previous: &Snapshot,
    first_run: FirstRunPolicy,
) -> Snapshot {
    if previous.is_empty() {
        return match first_run {
            FirstRunPolicy::Suppress => Snapshot::empty(),
            FirstRunPolicy::Sample(n) => {
                tracing::warn!(sample = n, "First run: sampling records for a test notification");
                current.head(n)
            }
        };
    }

    let seen = previous.sequence_ids();
    current
        .iter()
        .filter(|r| !seen.contains(r.sequence_id.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::record;

    fn ids(snapshot: &Snapshot) -> Vec<&str> {
        snapshot.iter().map(|r| r.sequence_id.as_str()).collect()
    }

    #[test]
    fn first_run_reports_nothing() {
        let current = Snapshot::new(vec![record("1", "A"), record("2", "B")]);
        assert!(new_items(&current, &Snapshot::empty()).is_empty());
    }

    #[test]
    fn first_run_sample_takes_head_of_current() {
        let current: Snapshot = (1..=8).map(|i| record(&i.to_string(), "t")).collect();
        let result = new_items_with_policy(&current, &Snapshot::empty(), FirstRunPolicy::Sample(5));
        assert_eq!(ids(&result), ["1", "2", "3", "4", "5"]);
    }

    #[test]
    fn sample_policy_is_ignored_once_a_previous_snapshot_exists() {
        let previous = Snapshot::new(vec![record("1", "A")]);
        let current = Snapshot::new(vec![record("1", "A")]);
        assert!(new_items_with_policy(&current, &previous, FirstRunPolicy::Sample(5)).is_empty());
    }

    #[test]
    fn unchanged_listing_yields_nothing() {
        let current = Snapshot::new(vec![record("1", "A"), record("2", "B"), record("3", "C")]);
        assert!(new_items(&current, &current).is_empty());
    }

    #[test]
    fn returns_only_unseen_ids() {
        let previous = Snapshot::new(vec![record("1", "A"), record("2", "B")]);
        let current = Snapshot::new(vec![
            record("1", "A"),
            record("2", "B"),
            record("3", "[디지털의료기기] X"),
        ]);

        let result = new_items(&current, &previous);

        assert_eq!(ids(&result), ["3"]);
        assert_eq!(result.records()[0].title, "[디지털의료기기] X");
    }

    #[test]
    fn result_is_subset_of_current_and_disjoint_from_previous() {
        let previous = Snapshot::new(vec![record("10", "a"), record("11", "b"), record("99", "z")]);
        let current = Snapshot::new(vec![
            record("13", "n"),
            record("12", "m"),
            record("11", "b"),
            record("10", "a"),
        ]);

        let result = new_items(&current, &previous);
        let prev_ids = previous.sequence_ids();

        assert!(result.iter().all(|r| current.records().contains(r)));
        assert!(result.iter().all(|r| !prev_ids.contains(r.sequence_id.as_str())));
        assert_eq!(ids(&result), ["13", "12"]);
    }

    #[test]
    fn duplicates_in_current_are_kept() {
        let previous = Snapshot::new(vec![record("1", "A")]);
        let current = Snapshot::new(vec![record("2", "B"), record("1", "A"), record("2", "B")]);
        assert_eq!(ids(&new_items(&current, &previous)), ["2", "2"]);
    }

    #[test]
    fn previous_is_left_untouched() {
        let previous = Snapshot::new(vec![record("1", "A")]);
        let before = previous.clone();
        let current = Snapshot::new(vec![record("2", "B")]);
        let _ = new_items(&current, &previous);
        assert_eq!(previous, before);
    }

    #[test]
    fn policy_parses_from_text() {
        assert_eq!("suppress".parse::<FirstRunPolicy>(), Ok(FirstRunPolicy::Suppress));
        assert_eq!("sample:5".parse::<FirstRunPolicy>(), Ok(FirstRunPolicy::Sample(5)));
        assert_eq!("3".parse::<FirstRunPolicy>(), Ok(FirstRunPolicy::Sample(3)));
        assert!("sometimes".parse::<FirstRunPolicy>().is_err());
        assert_eq!(FirstRunPolicy::Sample(5).to_string(), "sample:5");
    }
}
