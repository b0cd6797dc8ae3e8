//! Test doubles for the engine collaborators

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use lotto_core::{Board, DrawResult, RawLogEntry, SourceError, TransactionSource};
use lotto_engine::{MessageRef, Presenter, PresenterError};
use lotto_storage::{MemoryStore, Result as StorageResult, StateStore, StorageError};
use parking_lot::Mutex;

pub fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

pub fn deposit(id: u64, user: &str, coins: i64, time: &str) -> RawLogEntry {
    RawLogEntry {
        id: Some(id),
        time: Some(time.to_string()),
        user: Some(user.to_string()),
        kind: Some("stash".to_string()),
        operation: Some("deposit".to_string()),
        coins: Some(coins),
        defect: None,
    }
}

/// Serves queued responses, then empty batches; records every cursor
#[derive(Default)]
pub struct MockSource {
    responses: Mutex<VecDeque<Result<Vec<RawLogEntry>, SourceError>>>,
    pub cursors: Mutex<Vec<Option<u64>>>,
}

impl MockSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, entries: Vec<RawLogEntry>) {
        self.responses.lock().push_back(Ok(entries));
    }

    pub fn push_failure(&self) {
        self.responses
            .lock()
            .push_back(Err(SourceError::Unavailable("connection refused".to_string())));
    }
}

#[async_trait::async_trait]
impl TransactionSource for MockSource {
    async fn fetch_since(&self, cursor: Option<u64>) -> Result<Vec<RawLogEntry>, SourceError> {
        self.cursors.lock().push(cursor);
        self.responses.lock().pop_front().unwrap_or(Ok(Vec::new()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shown {
    Board {
        message: MessageRef,
        edited: Option<MessageRef>,
        board: Board,
    },
    Results {
        edited: Option<MessageRef>,
        result: DrawResult,
    },
}

/// Keeps every render; message refs are `msg-1`, `msg-2`, ...
#[derive(Default)]
pub struct RecordingPresenter {
    pub shown: Mutex<Vec<Shown>>,
    fingerprint: Mutex<Option<String>>,
    next_id: Mutex<u64>,
    pub fail: Mutex<bool>,
    /// Treat every existing message as deleted
    pub lost: Mutex<bool>,
}

impl RecordingPresenter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn issue(&self) -> MessageRef {
        let mut next = self.next_id.lock();
        *next += 1;
        MessageRef(format!("msg-{}", *next))
    }

    pub fn boards(&self) -> Vec<Board> {
        self.shown
            .lock()
            .iter()
            .filter_map(|s| match s {
                Shown::Board { board, .. } => Some(board.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn results(&self) -> Vec<DrawResult> {
        self.shown
            .lock()
            .iter()
            .filter_map(|s| match s {
                Shown::Results { result, .. } => Some(result.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl Presenter for RecordingPresenter {
    async fn show_board(
        &self,
        board: &Board,
        existing: Option<&MessageRef>,
    ) -> Result<MessageRef, PresenterError> {
        if *self.fail.lock() {
            return Err(PresenterError::Unavailable("chat offline".to_string()));
        }
        if let (Some(existing), true) = (existing, *self.lost.lock()) {
            return Err(PresenterError::MessageNotFound(existing.clone()));
        }
        let message = existing.cloned().unwrap_or_else(|| self.issue());
        *self.fingerprint.lock() = Some(board.fingerprint());
        self.shown.lock().push(Shown::Board {
            message: message.clone(),
            edited: existing.cloned(),
            board: board.clone(),
        });
        Ok(message)
    }

    async fn show_results(
        &self,
        result: &DrawResult,
        existing: Option<&MessageRef>,
    ) -> Result<MessageRef, PresenterError> {
        if *self.fail.lock() {
            return Err(PresenterError::Unavailable("chat offline".to_string()));
        }
        let message = existing.cloned().unwrap_or_else(|| self.issue());
        self.shown.lock().push(Shown::Results {
            edited: existing.cloned(),
            result: result.clone(),
        });
        Ok(message)
    }

    fn current_fingerprint(&self) -> Option<String> {
        self.fingerprint.lock().clone()
    }
}

/// Memory store that fails the next N saves of chosen keys
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    failures: Mutex<HashMap<String, usize>>,
    pub saves: Mutex<Vec<String>>,
}

impl FlakyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_next_saves(&self, key: &str, times: usize) {
        self.failures.lock().insert(key.to_string(), times);
    }

    pub fn saves_of(&self, key: &str) -> usize {
        self.saves.lock().iter().filter(|k| k.as_str() == key).count()
    }
}

impl StateStore for FlakyStore {
    fn load_raw(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        self.inner.load_raw(key)
    }

    fn save_raw(&self, key: &str, bytes: &[u8]) -> StorageResult<()> {
        if let Some(remaining) = self.failures.lock().get_mut(key) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(StorageError::IoError(std::io::Error::other("disk full")));
            }
        }
        self.saves.lock().push(key.to_string());
        self.inner.save_raw(key, bytes)
    }

    fn keys_with_prefix(&self, prefix: &str) -> StorageResult<Vec<String>> {
        self.inner.keys_with_prefix(prefix)
    }
}
