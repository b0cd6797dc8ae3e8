//! Live standings board of the current interval

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::interval::Interval;
use crate::ledger::Ledger;
use crate::pot::{prize_base, Rank};
use crate::rules::LotteryRules;
use crate::tally::compute_tally;

/// Externally observable interval state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Window still collecting deposits
    Open,
    /// Cashout passed, the draw may run
    Due,
}

impl Phase {
    pub fn at(interval: &Interval, now: DateTime<Utc>, rules: &LotteryRules) -> Self {
        if now >= interval.cashout_date(&rules.utc_offset) {
            Phase::Due
        } else {
            Phase::Open
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    pub user: String,
    pub tickets: u64,
}

/// Immutable snapshot handed to the presenter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub interval: Interval,
    pub phase: Phase,
    pub last_draw: DateTime<Utc>,
    pub next_draw: DateTime<Utc>,
    pub pot: i64,
    pub ranks: Vec<Rank>,
    pub standings: Vec<Standing>,
    pub total_tickets: u64,
}

impl Board {
    pub fn build(
        ledger: &Ledger,
        interval: Interval,
        rules: &LotteryRules,
        now: DateTime<Utc>,
    ) -> Self {
        let window = interval.window(&rules.utc_offset);
        let tally = compute_tally(ledger, &window, &rules.excluded_users, rules.unit_size);

        Self {
            interval,
            phase: Phase::at(&interval, now, rules),
            last_draw: window.start,
            next_draw: window.end,
            pot: tally.pot,
            ranks: rules
                .prize_split
                .ranks(prize_base(tally.pot), &rules.sink_label),
            standings: tally
                .standings()
                .into_iter()
                .map(|(user, tickets)| Standing { user, tickets })
                .collect(),
            total_tickets: tally.total_tickets(),
        }
    }

    /// Content hash used for change detection
    pub fn fingerprint(&self) -> String {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        format!("{:x}", md5::compute(bytes))
    }
}
