//! Interval state machine
//!
//! OPEN -> DUE once the cashout passes. A draw runs DUE -> DRAWN -> ROLLED_OVER:
//! the persisted draw log is the commit point, then the interval pointer is
//! advanced and persisted. A draw log for the stored interval means the
//! rollover was interrupted; it is finished without drawing again.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use lotto_core::pot::prize_base;
use lotto_core::{
    compute_tally, fresh_seed, select_winners_seeded, AppendSummary, Board, DrawResult, Interval,
    Ledger, LotteryRules, Phase, TicketTally, TransactionRecord, Winner,
};
use lotto_storage::{keys, StateStore, StoreExt};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::state::{EngineState, MessageRef};

/// What a draw attempt did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawOutcome {
    /// Cashout not reached yet; nothing changed
    NotDue {
        interval: Interval,
        next_draw: DateTime<Utc>,
    },
    /// Fresh draw committed and interval advanced
    Drawn(DrawResult),
    /// The interval had already been drawn; only the rollover was completed
    Recovered(DrawResult),
}

impl DrawOutcome {
    pub fn result(&self) -> Option<&DrawResult> {
        match self {
            DrawOutcome::Drawn(result) | DrawOutcome::Recovered(result) => Some(result),
            DrawOutcome::NotDue { .. } => None,
        }
    }
}

/// Owns the ledger and the interval pointer; the single writer of both
pub struct DrawEngine {
    store: Arc<dyn StateStore>,
    rules: LotteryRules,
    state: EngineState,
    ledger: Ledger,
    /// Ledger changes not yet persisted
    ledger_dirty: bool,
}

impl DrawEngine {
    /// Load persisted state, creating it for the month of `now` on first run,
    /// and finish any interrupted rollover.
    pub fn open(store: Arc<dyn StateStore>, rules: LotteryRules, now: DateTime<Utc>) -> Result<Self> {
        rules.validate()?;

        let ledger: Ledger = store.load(keys::LEDGER)?.unwrap_or_default();
        let state = match store.load::<EngineState>(keys::CURRENT_INTERVAL)? {
            Some(state) => state,
            None => {
                let state = EngineState::new(Interval::containing(now, &rules.utc_offset));
                store.save(keys::CURRENT_INTERVAL, &state)?;
                info!(interval = %state.interval, "initialized lottery state");
                state
            }
        };

        let mut engine = Self {
            store,
            rules,
            state,
            ledger,
            ledger_dirty: false,
        };

        if let Some(result) = engine.recover()? {
            info!(drawn = %result.interval, current = %engine.state.interval, "completed interrupted rollover");
        }

        info!(
            interval = %engine.state.interval,
            records = engine.ledger.len(),
            last_id = ?engine.ledger.last_id(),
            "lottery state loaded"
        );
        Ok(engine)
    }

    pub fn rules(&self) -> &LotteryRules {
        &self.rules
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn interval(&self) -> Interval {
        self.state.interval
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn ledger_dirty(&self) -> bool {
        self.ledger_dirty
    }

    pub fn phase(&self, now: DateTime<Utc>) -> Phase {
        Phase::at(&self.state.interval, now, &self.rules)
    }

    pub fn next_draw(&self) -> DateTime<Utc> {
        self.state.interval.cashout_date(&self.rules.utc_offset)
    }

    /// Tally of `interval`'s window under the configured rules
    pub fn tally(&self, interval: Interval) -> TicketTally {
        compute_tally(
            &self.ledger,
            &interval.window(&self.rules.utc_offset),
            &self.rules.excluded_users,
            self.rules.unit_size,
        )
    }

    pub fn board(&self, now: DateTime<Utc>) -> Board {
        Board::build(&self.ledger, self.state.interval, &self.rules, now)
    }

    /// Append a batch and persist the ledger if anything is unsaved.
    ///
    /// On a failed save the records stay in memory and the ledger stays dirty,
    /// so the next call saves again even without new records.
    pub fn append(&mut self, records: Vec<TransactionRecord>) -> Result<AppendSummary> {
        let summary = self.ledger.append(records);
        if summary.changed() {
            self.ledger_dirty = true;
        }
        self.persist_ledger()?;
        Ok(summary)
    }

    pub fn persist_ledger(&mut self) -> Result<()> {
        if !self.ledger_dirty {
            return Ok(());
        }
        self.store.save(keys::LEDGER, &self.ledger)?;
        self.ledger_dirty = false;
        debug!(records = self.ledger.len(), "ledger persisted");
        Ok(())
    }

    /// Record the message now showing the board
    pub fn set_message_ref(&mut self, message: Option<MessageRef>) -> Result<()> {
        if self.state.last_displayed_message_ref == message {
            return Ok(());
        }
        let next = EngineState {
            interval: self.state.interval,
            last_displayed_message_ref: message,
        };
        self.store.save(keys::CURRENT_INTERVAL, &next)?;
        self.state = next;
        Ok(())
    }

    pub fn draw_result(&self, interval: Interval) -> Result<Option<DrawResult>> {
        Ok(self.store.load(&keys::draw_log(interval))?)
    }

    /// Intervals with a persisted draw, oldest first
    pub fn history(&self) -> Result<Vec<Interval>> {
        let stored = self.store.keys_with_prefix(keys::DRAW_LOG_PREFIX)?;
        let mut intervals: Vec<Interval> = stored
            .iter()
            .filter_map(|key| key.strip_prefix(keys::DRAW_LOG_PREFIX))
            .filter_map(|key| key.parse().ok())
            .collect();
        intervals.sort();
        Ok(intervals)
    }

    /// Finish a rollover whose draw log was committed but whose interval
    /// pointer was not advanced.
    pub fn recover(&mut self) -> Result<Option<DrawResult>> {
        let interval = self.state.interval;
        match self.draw_result(interval)? {
            Some(result) => {
                warn!(%interval, "draw log exists for current interval, advancing");
                self.rollover(interval)?;
                Ok(Some(result))
            }
            None => Ok(None),
        }
    }

    /// Run the draw for the current interval if it is due
    pub fn attempt_draw(&mut self, now: DateTime<Utc>) -> Result<DrawOutcome> {
        self.attempt_draw_seeded(now, fresh_seed())
    }

    /// [`DrawEngine::attempt_draw`] with a caller-chosen shuffle seed
    pub fn attempt_draw_seeded(&mut self, now: DateTime<Utc>, seed: u64) -> Result<DrawOutcome> {
        let interval = self.state.interval;

        if self.phase(now) == Phase::Open {
            debug!(%interval, "draw not due");
            return Ok(DrawOutcome::NotDue {
                interval,
                next_draw: self.next_draw(),
            });
        }

        if let Some(result) = self.recover()? {
            return Ok(DrawOutcome::Recovered(result));
        }

        let result = self.compute_draw(interval, now, seed);

        // Commit point: from here on this interval is drawn
        self.store.save(&keys::draw_log(interval), &result)?;
        info!(
            %interval,
            pot = result.pot,
            tickets = result.log.len(),
            seed = result.seed,
            winners = ?result.winners.iter().map(|w| w.to_string()).collect::<Vec<_>>(),
            "draw committed"
        );

        self.rollover(interval)?;
        Ok(DrawOutcome::Drawn(result))
    }

    fn compute_draw(&self, interval: Interval, now: DateTime<Utc>, seed: u64) -> DrawResult {
        let tally = self.tally(interval);
        let selection = select_winners_seeded(&tally.tokens_by_user, self.rules.winners(), seed);

        let mut winners = selection.winners;
        winners.push(Winner::Sink(self.rules.sink_label.clone()));

        DrawResult {
            interval,
            drawn_at: now,
            pot: tally.pot,
            ranks: self
                .rules
                .prize_split
                .ranks(prize_base(tally.pot), &self.rules.sink_label),
            winners,
            tickets: tally.tokens_by_user,
            seed,
            log: selection.pool,
        }
    }

    /// Advance past `drawn`; a no-op when the pointer already moved on
    fn rollover(&mut self, drawn: Interval) -> Result<()> {
        if self.state.interval != drawn {
            return Ok(());
        }
        let next = self.state.advanced();
        self.store.save(keys::CURRENT_INTERVAL, &next)?;
        info!(from = %drawn, to = %next.interval, "interval rolled over");
        self.state = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use lotto_storage::MemoryStore;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn engine_in_may(store: Arc<MemoryStore>) -> DrawEngine {
        DrawEngine::open(store, LotteryRules::default(), at(2024, 5, 2, 12)).unwrap()
    }

    #[test]
    fn test_first_open_creates_state_for_current_month() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_in_may(store.clone());

        assert_eq!(engine.interval().to_string(), "2024-05");
        let saved: EngineState = store.load(keys::CURRENT_INTERVAL).unwrap().unwrap();
        assert_eq!(saved, *engine.state());
    }

    #[test]
    fn test_not_due_before_cashout() {
        let store = Arc::new(MemoryStore::new());
        let mut engine = engine_in_may(store.clone());

        let outcome = engine.attempt_draw_seeded(at(2024, 5, 5, 20), 1).unwrap();

        assert!(matches!(outcome, DrawOutcome::NotDue { .. }));
        assert_eq!(engine.interval().to_string(), "2024-05");
        assert!(engine.history().unwrap().is_empty());
    }

    #[test]
    fn test_draw_commits_and_rolls_over() {
        let store = Arc::new(MemoryStore::new());
        let mut engine = engine_in_may(store.clone());
        engine
            .append(vec![
                TransactionRecord::deposit(1, "X", 50_000, at(2024, 4, 20, 9)),
                TransactionRecord::deposit(2, "Y", 20_000, at(2024, 4, 21, 9)),
            ])
            .unwrap();

        let outcome = engine.attempt_draw_seeded(at(2024, 5, 5, 21), 3).unwrap();

        let result = match outcome {
            DrawOutcome::Drawn(result) => result,
            other => panic!("unexpected outcome {:?}", other),
        };
        assert_eq!(result.pot, 70_000);
        assert_eq!(result.log.len(), 7);
        assert_eq!(result.winners.len(), 4);
        assert_eq!(result.winners[2], Winner::Nobody);
        assert_eq!(result.winners[3], Winner::Sink("Guild Bank".to_string()));
        assert!(result.verify().is_ok());

        assert_eq!(engine.interval().to_string(), "2024-06");
        assert_eq!(engine.history().unwrap(), vec![result.interval]);
    }
}
