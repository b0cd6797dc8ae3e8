//! Guild Lottery binaries support: configuration, command line, logging and
//! the file-backed display used by `lottod` and `lotto-cli`.

pub mod app;
pub mod args;
pub mod config;
pub mod display;
pub mod logging;

pub use args::{DaemonArgs, OperatorArgs, OperatorCommand};
pub use config::{Backend, Config, ConfigError};
pub use display::{format_coins, render_board, render_results, FilePresenter};
