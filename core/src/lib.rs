//! Guild Lottery Core Library
//!
//! Pure draw-engine building blocks: the treasury ledger, ticket tallies,
//! prize splits, winner selection and monthly draw intervals.

pub mod board;
pub mod constants;
pub mod draw;
pub mod error;
pub mod interval;
pub mod ledger;
pub mod pot;
pub mod rules;
pub mod source;
pub mod tally;
pub mod transaction;

pub use board::{Board, Phase, Standing};
pub use draw::{
    fresh_seed, select_winners, select_winners_seeded, DrawResult, Selection, Winner,
};
pub use error::{CoreError, Result};
pub use interval::{Interval, Window};
pub use ledger::{AppendSummary, Ledger};
pub use pot::{split_pot, PrizeSplit, Rank};
pub use rules::LotteryRules;
pub use source::{SourceError, TransactionSource};
pub use tally::{compute_tally, TicketTally};
pub use transaction::{Operation, RawLogEntry, RecordKind, TransactionRecord};
