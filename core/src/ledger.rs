//! Append-only, id-deduplicated transaction ledger

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::transaction::TransactionRecord;

/// Outcome of one append batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppendSummary {
    /// Records newly stored
    pub added: usize,
    /// Records whose id was already present
    pub duplicates: usize,
    /// Zero-coin or non-stash records
    pub ignored: usize,
}

impl AppendSummary {
    pub fn changed(&self) -> bool {
        self.added > 0
    }
}

/// Ordered-by-id set of treasury records.
///
/// Records are never removed or rewritten once stored. Persisted as a plain
/// array sorted ascending by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<TransactionRecord>", into = "Vec<TransactionRecord>")]
pub struct Ledger {
    records: BTreeMap<u64, TransactionRecord>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert every record whose id is unknown, normalizing withdrawals.
    pub fn append<I>(&mut self, records: I) -> AppendSummary
    where
        I: IntoIterator<Item = TransactionRecord>,
    {
        let mut summary = AppendSummary::default();

        for record in records {
            if self.records.contains_key(&record.id) {
                summary.duplicates += 1;
                continue;
            }
            if !record.is_eligible() {
                summary.ignored += 1;
                continue;
            }

            let record = record.normalized();
            debug!(id = record.id, user = %record.user, coins = record.coins, "ledger append");
            self.records.insert(record.id, record);
            summary.added += 1;
        }

        summary
    }

    /// Highest stored id, used as the fetch cursor
    pub fn last_id(&self) -> Option<u64> {
        self.records.keys().next_back().copied()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.records.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in ascending id order
    pub fn iter(&self) -> impl Iterator<Item = &TransactionRecord> {
        self.records.values()
    }

    /// Records with `start <= time < end`
    pub fn records_in(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> impl Iterator<Item = &TransactionRecord> {
        self.iter()
            .filter(move |record| record.time >= start && record.time < end)
    }
}

impl From<Vec<TransactionRecord>> for Ledger {
    fn from(records: Vec<TransactionRecord>) -> Self {
        let mut ledger = Ledger::new();
        ledger.append(records);
        ledger
    }
}

impl From<Ledger> for Vec<TransactionRecord> {
    fn from(ledger: Ledger) -> Self {
        ledger.records.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{Operation, RecordKind};
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_append_dedups_by_id() {
        let mut once = Ledger::new();
        once.append(vec![TransactionRecord::deposit(1, "X", 50_000, at(3))]);

        let mut twice = Ledger::new();
        twice.append(vec![TransactionRecord::deposit(1, "X", 50_000, at(3))]);
        let summary = twice.append(vec![TransactionRecord::deposit(1, "X", 50_000, at(3))]);

        assert_eq!(summary.duplicates, 1);
        assert!(!summary.changed());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_first_copy_of_an_id_wins() {
        let mut ledger = Ledger::new();
        ledger.append(vec![TransactionRecord::deposit(1, "X", 50_000, at(3))]);
        ledger.append(vec![TransactionRecord::deposit(1, "Y", 90_000, at(4))]);

        let stored = ledger.iter().next().unwrap();
        assert_eq!(stored.user, "X");
        assert_eq!(stored.coins, 50_000);
    }

    #[test]
    fn test_sorted_by_id_regardless_of_arrival() {
        let mut ledger = Ledger::new();
        ledger.append(vec![
            TransactionRecord::deposit(30, "A", 10_000, at(3)),
            TransactionRecord::deposit(10, "B", 10_000, at(3)),
        ]);
        ledger.append(vec![TransactionRecord::deposit(20, "C", 10_000, at(3))]);

        let ids: Vec<u64> = ledger.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![10, 20, 30]);
        assert_eq!(ledger.last_id(), Some(30));
    }

    #[test]
    fn test_withdrawal_normalized_on_append() {
        let mut ledger = Ledger::new();
        ledger.append(vec![TransactionRecord::withdrawal(5, "X", 3000, at(3))]);

        let stored = ledger.iter().next().unwrap();
        assert_eq!(stored.coins, -3000);
    }

    #[test]
    fn test_zero_and_non_stash_ignored() {
        let mut other = TransactionRecord::deposit(2, "X", 10_000, at(3));
        other.kind = RecordKind::Other;

        let mut ledger = Ledger::new();
        let summary = ledger.append(vec![
            TransactionRecord::deposit(1, "X", 0, at(3)),
            other,
        ]);

        assert_eq!(summary.ignored, 2);
        assert!(ledger.is_empty());
        assert_eq!(ledger.last_id(), None);
    }

    #[test]
    fn test_records_in_window_is_half_open() {
        let mut ledger = Ledger::new();
        ledger.append(vec![
            TransactionRecord::deposit(1, "X", 10_000, at(1)),
            TransactionRecord::deposit(2, "X", 10_000, at(2)),
            TransactionRecord::deposit(3, "X", 10_000, at(3)),
        ]);

        let ids: Vec<u64> = ledger.records_in(at(1), at(3)).map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_snapshot_is_sorted_array() {
        let mut ledger = Ledger::new();
        ledger.append(vec![
            TransactionRecord::deposit(2, "B", 10_000, at(3)),
            TransactionRecord::withdrawal(1, "A", 500, at(3)),
        ]);

        let json = serde_json::to_value(&ledger).unwrap();
        let array = json.as_array().unwrap();
        assert_eq!(array.len(), 2);
        assert_eq!(array[0]["id"], 1);
        assert_eq!(array[0]["coins"], -500);

        let restored: Ledger = serde_json::from_value(json).unwrap();
        assert_eq!(restored, ledger);
        assert_eq!(
            restored.iter().next().map(|r| r.operation),
            Some(Operation::Withdraw)
        );
    }
}
