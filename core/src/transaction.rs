//! Treasury log records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::STASH_TYPE;
use crate::error::{CoreError, Result};

/// Kind of guild log entry; only stash entries move coins
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Stash,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Deposit,
    Withdraw,
}

/// A single treasury transaction as stored in the ledger
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionRecord {
    pub id: u64,
    pub user: String,
    /// Signed amount in copper; withdrawals are negative once normalized
    pub coins: i64,
    #[serde(rename = "type")]
    pub kind: RecordKind,
    pub operation: Operation,
    pub time: DateTime<Utc>,
}

impl TransactionRecord {
    pub fn deposit(id: u64, user: impl Into<String>, coins: i64, time: DateTime<Utc>) -> Self {
        Self {
            id,
            user: user.into(),
            coins,
            kind: RecordKind::Stash,
            operation: Operation::Deposit,
            time,
        }
    }

    pub fn withdrawal(id: u64, user: impl Into<String>, coins: i64, time: DateTime<Utc>) -> Self {
        Self {
            id,
            user: user.into(),
            coins,
            kind: RecordKind::Stash,
            operation: Operation::Withdraw,
            time,
        }
    }

    /// Withdrawals always carry a negative amount
    pub fn normalized(mut self) -> Self {
        if self.operation == Operation::Withdraw && self.coins > 0 {
            self.coins = -self.coins;
        }
        self
    }

    /// Whether the record can contribute to a lottery at all
    pub fn is_eligible(&self) -> bool {
        self.kind == RecordKind::Stash && self.coins != 0
    }
}

/// Guild log entry as delivered by the transaction source.
///
/// The log mixes many entry types (joins, upgrades, motd changes...), so every
/// field is optional and validated in [`RawLogEntry::into_record`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawLogEntry {
    pub id: Option<u64>,
    pub time: Option<String>,
    pub user: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub operation: Option<String>,
    pub coins: Option<i64>,
    /// Why the source could not decode this entry, if it could not
    #[serde(skip)]
    pub defect: Option<String>,
}

impl RawLogEntry {
    /// Placeholder for an entry the source received but could not decode
    pub fn undecodable(id: Option<u64>, reason: impl Into<String>) -> Self {
        Self {
            id,
            defect: Some(reason.into()),
            ..Default::default()
        }
    }

    /// Convert into a ledger record.
    ///
    /// Returns `Ok(None)` for entries that never feed the lottery (other entry
    /// types, item moves, zero-coin stash entries) and `MalformedRecord` for
    /// stash entries missing the fields a record needs.
    pub fn into_record(self) -> Result<Option<TransactionRecord>> {
        if let Some(reason) = self.defect {
            return Err(CoreError::MalformedRecord { id: self.id, reason });
        }

        let id = self.id.ok_or_else(|| CoreError::MalformedRecord {
            id: None,
            reason: "missing id".to_string(),
        })?;

        if self.kind.as_deref() != Some(STASH_TYPE) {
            return Ok(None);
        }

        let coins = self.coins.unwrap_or(0);
        if coins == 0 {
            return Ok(None);
        }

        let operation = match self.operation.as_deref() {
            Some("deposit") => Operation::Deposit,
            Some("withdraw") => Operation::Withdraw,
            Some("move") => return Ok(None),
            other => {
                return Err(CoreError::MalformedRecord {
                    id: Some(id),
                    reason: format!("unknown stash operation {:?}", other),
                })
            }
        };

        let user = match self.user {
            Some(user) if !user.is_empty() => user,
            _ => {
                return Err(CoreError::MalformedRecord {
                    id: Some(id),
                    reason: "missing user".to_string(),
                })
            }
        };

        let raw_time = self.time.ok_or_else(|| CoreError::MalformedRecord {
            id: Some(id),
            reason: "missing time".to_string(),
        })?;
        let time = DateTime::parse_from_rfc3339(&raw_time)
            .map_err(|e| CoreError::MalformedRecord {
                id: Some(id),
                reason: format!("bad time {:?}: {}", raw_time, e),
            })?
            .with_timezone(&Utc);

        Ok(Some(
            TransactionRecord {
                id,
                user,
                coins,
                kind: RecordKind::Stash,
                operation,
                time,
            }
            .normalized(),
        ))
    }
}
