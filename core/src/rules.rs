//! Static lottery rules

use std::collections::BTreeSet;

use chrono::{FixedOffset, Offset, Utc};

use crate::constants::{DEFAULT_SINK_LABEL, UNIT_SIZE};
use crate::error::{CoreError, Result};
use crate::pot::PrizeSplit;

/// Everything that decides tickets, prizes and draw times
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LotteryRules {
    /// Copper per ticket
    pub unit_size: u64,
    pub prize_split: PrizeSplit,
    pub sink_label: String,
    /// Handles that never earn tickets or feed the pot
    pub excluded_users: BTreeSet<String>,
    /// Offset the 21:00 cashout time is expressed in
    pub utc_offset: FixedOffset,
}

impl Default for LotteryRules {
    fn default() -> Self {
        Self {
            unit_size: UNIT_SIZE,
            prize_split: PrizeSplit::default(),
            sink_label: DEFAULT_SINK_LABEL.to_string(),
            excluded_users: BTreeSet::new(),
            utc_offset: Utc.fix(),
        }
    }
}

impl LotteryRules {
    pub fn with_utc_offset_minutes(mut self, minutes: i32) -> Result<Self> {
        self.utc_offset = FixedOffset::east_opt(minutes * 60).ok_or_else(|| {
            CoreError::InvalidRules(format!("utc offset of {} minutes out of range", minutes))
        })?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.unit_size == 0 {
            return Err(CoreError::InvalidRules("unit size must be positive".to_string()));
        }
        if i64::try_from(self.unit_size).is_err() {
            return Err(CoreError::InvalidRules(format!(
                "unit size {} exceeds {}",
                self.unit_size,
                i64::MAX
            )));
        }
        if self.sink_label.trim().is_empty() {
            return Err(CoreError::InvalidRules("sink label is empty".to_string()));
        }
        Ok(())
    }

    /// Number of drawn ranks
    pub fn winners(&self) -> usize {
        self.prize_split.winners()
    }
}
