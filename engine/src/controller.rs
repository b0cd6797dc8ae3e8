//! Sync controller: pulls the treasury log, keeps the board fresh and
//! executes draws on request.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use lotto_core::{AppendSummary, Board, DrawResult, Phase, TransactionSource};
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::machine::{DrawEngine, DrawOutcome};
use crate::presenter::{Presenter, PresenterError};
use crate::state::MessageRef;

/// What one poll tick did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// `None` when the source could not be reached
    pub appended: Option<AppendSummary>,
    pub malformed: usize,
    pub display_updated: bool,
    pub draw: Option<DrawOutcome>,
}

pub struct SyncController {
    engine: DrawEngine,
    source: Arc<dyn TransactionSource>,
    presenter: Arc<dyn Presenter>,
    auto_draw: bool,
}

impl SyncController {
    pub fn new(
        engine: DrawEngine,
        source: Arc<dyn TransactionSource>,
        presenter: Arc<dyn Presenter>,
    ) -> Self {
        Self {
            engine,
            source,
            presenter,
            auto_draw: false,
        }
    }

    /// Draw automatically once the interval is due
    pub fn with_auto_draw(mut self, auto_draw: bool) -> Self {
        self.auto_draw = auto_draw;
        self
    }

    pub fn engine(&self) -> &DrawEngine {
        &self.engine
    }

    /// One poll cycle. Never fails: every error is logged and the next tick
    /// starts from whatever state was committed.
    pub async fn tick(&mut self, now: DateTime<Utc>) -> TickReport {
        let mut report = TickReport::default();

        match self.pull().await {
            Ok((summary, malformed)) => {
                report.appended = Some(summary);
                report.malformed = malformed;
            }
            Err(e) => warn!(error = %e, "sync skipped"),
        }

        if self.auto_draw && self.engine.phase(now) == Phase::Due {
            match self.draw(now).await {
                Ok(outcome) => report.draw = Some(outcome),
                Err(e) => error!(error = %e, interval = %self.engine.interval(), "automatic draw failed"),
            }
        }

        match self.refresh_display(now).await {
            Ok(updated) => report.display_updated = updated,
            Err(e) => warn!(error = %e, "display refresh failed"),
        }

        report
    }

    /// Fetch entries past the ledger cursor and append them
    pub async fn pull(&mut self) -> Result<(AppendSummary, usize)> {
        let cursor = self.engine.ledger().last_id();
        let entries = self.source.fetch_since(cursor).await?;

        let mut records = Vec::with_capacity(entries.len());
        let mut malformed = 0;
        for entry in entries {
            match entry.into_record() {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => {
                    malformed += 1;
                    warn!(error = %e, "skipping malformed log entry");
                }
            }
        }

        let summary = self.engine.append(records)?;
        if summary.changed() {
            info!(
                added = summary.added,
                duplicates = summary.duplicates,
                last_id = ?self.engine.ledger().last_id(),
                "ledger updated"
            );
        } else {
            debug!(?cursor, "no new ledger records");
        }
        Ok((summary, malformed))
    }

    /// Re-render the board when its fingerprint differs from what is shown
    pub async fn refresh_display(&mut self, now: DateTime<Utc>) -> Result<bool> {
        let board = self.engine.board(now);
        let fingerprint = board.fingerprint();

        if self.presenter.current_fingerprint().as_deref() == Some(fingerprint.as_str()) {
            return Ok(false);
        }

        let existing = self.engine.state().last_displayed_message_ref.clone();
        let message = self.show_board(&board, existing.as_ref()).await?;
        self.engine.set_message_ref(Some(message))?;
        debug!(%fingerprint, "board refreshed");
        Ok(true)
    }

    /// Operator draw request
    pub async fn draw(&mut self, now: DateTime<Utc>) -> Result<DrawOutcome> {
        let shown = self.engine.state().last_displayed_message_ref.clone();
        let outcome = self.engine.attempt_draw(now)?;

        if let Some(result) = outcome.result() {
            // The draw is committed; display problems must not undo it
            if let Err(e) = self.announce(result, shown.as_ref(), now).await {
                error!(error = %e, interval = %result.interval, "failed to display draw results");
            }
        }

        Ok(outcome)
    }

    /// Post a fresh board, abandoning the previously displayed one
    pub async fn repost(&mut self, now: DateTime<Utc>) -> Result<MessageRef> {
        let board = self.engine.board(now);
        let message = self.presenter.show_board(&board, None).await?;
        self.engine.set_message_ref(Some(message.clone()))?;
        info!(%message, interval = %board.interval, "board reposted");
        Ok(message)
    }

    async fn announce(
        &mut self,
        result: &DrawResult,
        shown: Option<&MessageRef>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.presenter.show_results(result, shown).await?;

        let board = self.engine.board(now);
        let message = self.presenter.show_board(&board, None).await?;
        self.engine.set_message_ref(Some(message))?;
        Ok(())
    }

    /// Edit the shown board, falling back to a new message if it vanished
    async fn show_board(
        &self,
        board: &Board,
        existing: Option<&MessageRef>,
    ) -> std::result::Result<MessageRef, PresenterError> {
        match self.presenter.show_board(board, existing).await {
            Err(PresenterError::MessageNotFound(missing)) => {
                warn!(message = %missing, "displayed board is gone, posting a new one");
                self.presenter.show_board(board, None).await
            }
            other => other,
        }
    }
}
