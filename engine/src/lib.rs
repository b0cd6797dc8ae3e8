//! Guild Lottery Draw Engine
//!
//! Runs the monthly draw cycle on top of the pure core: the interval state
//! machine with crash-safe rollover, the sync controller feeding the ledger
//! and the display, and the command queue that serializes every trigger.

pub mod controller;
pub mod error;
pub mod machine;
pub mod presenter;
pub mod service;
pub mod state;

pub use controller::{SyncController, TickReport};
pub use error::{EngineError, Result};
pub use machine::{DrawEngine, DrawOutcome};
pub use presenter::{Presenter, PresenterError};
pub use service::{spawn, Clock, EngineHandle, EngineService, Schedule, StatusReport, SystemClock};
pub use state::{EngineState, MessageRef};
