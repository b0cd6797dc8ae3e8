//! Weighted, duplicate-free winner selection
//!
//! Every ticket becomes one pool entry holding its owner's handle. The pool is
//! shuffled with Fisher-Yates and scanned left to right; each rank takes the
//! first handle not already picked. The shuffled pool is kept as the audit
//! log, and a seeded draw can be replayed by anyone holding the ticket counts.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::interval::Interval;
use crate::pot::Rank;

/// Occupant of a prize rank
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    User(String),
    /// Not enough distinct ticket holders to fill the rank
    Nobody,
    /// Fixed, non-drawn recipient of the remainder
    Sink(String),
}

impl Winner {
    pub fn user(&self) -> Option<&str> {
        match self {
            Winner::User(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Winner::User(name) => write!(f, "{}", name),
            Winner::Nobody => write!(f, "/"),
            Winner::Sink(label) => write!(f, "{}", label),
        }
    }
}

/// Result of sampling the ticket pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Exactly `count` entries, `Nobody` where the pool ran dry
    pub winners: Vec<Winner>,
    /// Ticket-expanded pool after the shuffle
    pub pool: Vec<String>,
}

/// One entry per ticket, users in ascending handle order
pub fn expand_pool(tokens_by_user: &BTreeMap<String, u64>) -> Vec<String> {
    let total: u64 = tokens_by_user.values().sum();
    let mut pool = Vec::with_capacity(total as usize);
    for (user, tokens) in tokens_by_user {
        for _ in 0..*tokens {
            pool.push(user.clone());
        }
    }
    pool
}

/// First `count` distinct handles of `pool`, padded with `Nobody`
pub fn pick_distinct(pool: &[String], count: usize) -> Vec<Winner> {
    let mut winners: Vec<Winner> = Vec::with_capacity(count);

    for handle in pool {
        if winners.len() == count {
            break;
        }
        if winners.iter().any(|w| w.user() == Some(handle.as_str())) {
            continue;
        }
        winners.push(Winner::User(handle.clone()));
    }

    winners.resize(count, Winner::Nobody);
    winners
}

/// Shuffle the ticket pool with `rng` and pick `count` distinct winners
pub fn select_winners<R: Rng + ?Sized>(
    tokens_by_user: &BTreeMap<String, u64>,
    count: usize,
    rng: &mut R,
) -> Selection {
    let mut pool = expand_pool(tokens_by_user);
    pool.shuffle(rng);
    let winners = pick_distinct(&pool, count);
    Selection { winners, pool }
}

/// Replayable draw driven by a ChaCha stream seeded with `seed`
pub fn select_winners_seeded(
    tokens_by_user: &BTreeMap<String, u64>,
    count: usize,
    seed: u64,
) -> Selection {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    select_winners(tokens_by_user, count, &mut rng)
}

/// Fresh seed for a live draw
pub fn fresh_seed() -> u64 {
    rand::rng().random()
}

/// Immutable record of one interval's draw, persisted for audit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawResult {
    pub interval: Interval,
    pub drawn_at: DateTime<Utc>,
    /// Raw signed pot of the window
    pub pot: i64,
    /// Prize lines, sink last
    pub ranks: Vec<Rank>,
    /// Winner per rank, sink last
    pub winners: Vec<Winner>,
    /// Pre-shuffle ticket counts
    pub tickets: BTreeMap<String, u64>,
    pub seed: u64,
    /// Shuffled ticket pool
    pub log: Vec<String>,
}

impl DrawResult {
    /// Drawn ranks, excluding the sink
    pub fn drawn_ranks(&self) -> usize {
        self.ranks.len().saturating_sub(1)
    }

    /// Rank lines paired with their winner
    pub fn placements(&self) -> impl Iterator<Item = (&Rank, &Winner)> {
        self.ranks.iter().zip(self.winners.iter())
    }

    /// Replay the shuffle from the recorded seed and tickets and check that it
    /// reproduces the stored pool and winners.
    pub fn verify(&self) -> Result<()> {
        let fail = |reason: String| CoreError::VerificationFailed {
            interval: self.interval.to_string(),
            reason,
        };

        let count = self.drawn_ranks();
        let replay = select_winners_seeded(&self.tickets, count, self.seed);

        if replay.pool != self.log {
            return Err(fail("shuffled pool differs from replay".to_string()));
        }
        if self.winners.len() != count + 1 {
            return Err(fail(format!(
                "expected {} winner slots, found {}",
                count + 1,
                self.winners.len()
            )));
        }
        if replay.winners[..] != self.winners[..count] {
            return Err(fail("drawn winners differ from replay".to_string()));
        }
        if !matches!(self.winners[count], Winner::Sink(_)) {
            return Err(fail("last rank is not the sink".to_string()));
        }
        Ok(())
    }
}
