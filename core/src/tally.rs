//! Ticket aggregation over a draw window

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::interval::Window;
use crate::ledger::Ledger;

/// Per-user ticket counts and pot of one window. Derived, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketTally {
    pub tokens_by_user: BTreeMap<String, u64>,
    /// Raw signed sum of all contributing records
    pub pot: i64,
}

impl TicketTally {
    pub fn total_tickets(&self) -> u64 {
        self.tokens_by_user
            .values()
            .fold(0u64, |total, tokens| total.saturating_add(*tokens))
    }

    pub fn holders(&self) -> usize {
        self.tokens_by_user.len()
    }

    /// Users by ticket count, most tickets first, ties by name
    pub fn standings(&self) -> Vec<(String, u64)> {
        let mut standings: Vec<(String, u64)> = self
            .tokens_by_user
            .iter()
            .map(|(user, tokens)| (user.clone(), *tokens))
            .collect();
        standings.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        standings
    }
}

/// Fold every ledger record inside `window` into a tally.
///
/// Every record of a non-excluded user counts toward the pot. Tickets are the
/// whole units of a record's amount, so only deposits of at least one unit
/// earn tickets and withdrawals never take tickets away.
pub fn compute_tally(
    ledger: &Ledger,
    window: &Window,
    excluded_users: &BTreeSet<String>,
    unit_size: u64,
) -> TicketTally {
    let unit = i64::try_from(unit_size.max(1)).unwrap_or(i64::MAX);
    let mut tally = TicketTally::default();

    for record in ledger.records_in(window.start, window.end) {
        if excluded_users.contains(&record.user) {
            continue;
        }

        tally.pot = match tally.pot.checked_add(record.coins) {
            Some(pot) => pot,
            None => {
                warn!(id = record.id, coins = record.coins, "pot overflow, saturating");
                tally.pot.saturating_add(record.coins)
            }
        };

        let tokens = record.coins.div_euclid(unit);
        if tokens > 0 {
            let held = tally.tokens_by_user.entry(record.user.clone()).or_insert(0);
            *held = held.saturating_add(tokens as u64);
        }
    }

    tally
}
