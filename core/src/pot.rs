//! Prize pot allocation

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_PRIZE_SHARES;
use crate::error::{CoreError, Result};

/// One ranked prize line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rank {
    pub label: String,
    pub amount: u64,
}

/// Percentage shares of the drawn ranks; the remainder goes to the sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizeSplit {
    shares_percent: Vec<u8>,
}

impl Default for PrizeSplit {
    fn default() -> Self {
        Self {
            shares_percent: DEFAULT_PRIZE_SHARES.to_vec(),
        }
    }
}

impl PrizeSplit {
    pub fn new(shares_percent: Vec<u8>) -> Result<Self> {
        if shares_percent.is_empty() {
            return Err(CoreError::InvalidPrizeSplit(
                "at least one ranked share is required".to_string(),
            ));
        }
        let total: u32 = shares_percent.iter().map(|s| u32::from(*s)).sum();
        if total > 100 {
            return Err(CoreError::InvalidPrizeSplit(format!(
                "shares add up to {}%",
                total
            )));
        }
        Ok(Self { shares_percent })
    }

    /// Number of drawn ranks (the sink is not counted)
    pub fn winners(&self) -> usize {
        self.shares_percent.len()
    }

    pub fn shares_percent(&self) -> &[u8] {
        &self.shares_percent
    }

    /// Amounts for every drawn rank followed by the sink.
    ///
    /// Each rank gets the floor of its share; the sink absorbs the remainder,
    /// so the result always sums to `pot`.
    pub fn split(&self, pot: u64) -> Vec<u64> {
        let mut amounts: Vec<u64> = self
            .shares_percent
            .iter()
            .map(|share| (u128::from(pot) * u128::from(*share) / 100) as u64)
            .collect();
        let allocated: u64 = amounts.iter().sum();
        amounts.push(pot - allocated);
        amounts
    }

    /// Labelled prize lines, sink last
    pub fn ranks(&self, pot: u64, sink_label: &str) -> Vec<Rank> {
        let amounts = self.split(pot);
        let last = amounts.len() - 1;
        amounts
            .into_iter()
            .enumerate()
            .map(|(i, amount)| Rank {
                label: if i == last {
                    sink_label.to_string()
                } else {
                    rank_label(i + 1)
                },
                amount,
            })
            .collect()
    }
}

/// 50/20/10 split with the remainder to the sink
pub fn split_pot(pot: u64) -> Vec<u64> {
    PrizeSplit::default().split(pot)
}

/// Prize base for a signed pot; net withdrawals leave nothing to win
pub fn prize_base(pot: i64) -> u64 {
    pot.max(0) as u64
}

pub fn rank_label(place: usize) -> String {
    let suffix = match (place % 10, place % 100) {
        (1, n) if n != 11 => "st",
        (2, n) if n != 12 => "nd",
        (3, n) if n != 13 => "rd",
        _ => "th",
    };
    format!("{}{}", place, suffix)
}
