//! Persisted pointer to the current interval

use std::fmt;

use lotto_core::Interval;
use serde::{Deserialize, Serialize};

/// Opaque handle of a displayed message, issued by the presenter
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageRef(pub String);

impl fmt::Display for MessageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The only mutable engine state, stored under `current-interval`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineState {
    pub interval: Interval,
    #[serde(default)]
    pub last_displayed_message_ref: Option<MessageRef>,
}

impl EngineState {
    pub fn new(interval: Interval) -> Self {
        Self {
            interval,
            last_displayed_message_ref: None,
        }
    }

    /// State after this interval's draw
    pub fn advanced(&self) -> Self {
        Self {
            interval: self.interval.next(),
            last_displayed_message_ref: self.last_displayed_message_ref.clone(),
        }
    }
}
