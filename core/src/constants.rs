//! Lottery constants

/// Copper per gold; one ticket costs one gold
pub const UNIT_SIZE: u64 = 10_000;

/// Copper per silver
pub const SILVER: u64 = 100;

/// Prize shares for ranks 1..=3 in percent; the rest goes to the sink
pub const DEFAULT_PRIZE_SHARES: [u8; 3] = [50, 20, 10];

/// Label of the non-drawn rank receiving the remainder
pub const DEFAULT_SINK_LABEL: &str = "Guild Bank";

/// Hour of day (interval-local) at which a draw becomes due
pub const CASHOUT_HOUR: u32 = 21;

/// Only stash entries of the guild log feed the lottery
pub const STASH_TYPE: &str = "stash";
