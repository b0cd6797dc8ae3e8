//! Guild Lottery Network Module
//!
//! HTTP access to the game's guild log, exposed as a
//! [`lotto_core::TransactionSource`].

pub mod guild_log;

pub use guild_log::{GuildLogClient, GuildLogConfig, DEFAULT_API_BASE_URL};
