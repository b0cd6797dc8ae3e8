//! Single-consumer command queue around the controller
//!
//! Timer ticks, operator requests and any other trigger are turned into
//! [`Command`]s and handled one at a time by a single task, so two draws for
//! the same interval can never race.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use lotto_core::{Interval, Phase};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

use crate::controller::{SyncController, TickReport};
use crate::error::{EngineError, Result};
use crate::machine::DrawOutcome;
use crate::state::MessageRef;

const QUEUE_DEPTH: usize = 32;

/// Poll timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub initial_delay: Duration,
    pub poll_interval: Duration,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(10),
            poll_interval: Duration::from_secs(30),
        }
    }
}

/// Source of "now" for the engine task
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Snapshot for operators
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub interval: Interval,
    pub phase: Phase,
    pub next_draw: DateTime<Utc>,
    pub records: usize,
    pub last_id: Option<u64>,
    pub pot: i64,
    pub total_tickets: u64,
    pub holders: usize,
    pub message: Option<MessageRef>,
    pub ledger_dirty: bool,
}

pub enum Command {
    Tick {
        reply: Option<oneshot::Sender<TickReport>>,
    },
    Draw {
        reply: oneshot::Sender<Result<DrawOutcome>>,
    },
    Repost {
        reply: oneshot::Sender<Result<MessageRef>>,
    },
    Status {
        reply: oneshot::Sender<StatusReport>,
    },
    /// Finish the current command and stop
    Shutdown,
}

/// Cloneable sender side of the engine task
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<Command>,
}

impl EngineHandle {
    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| EngineError::Stopped)?;
        rx.await.map_err(|_| EngineError::Stopped)
    }

    /// Run a poll cycle now and wait for it
    pub async fn tick(&self) -> Result<TickReport> {
        self.request(|reply| Command::Tick { reply: Some(reply) }).await
    }

    pub async fn draw(&self) -> Result<DrawOutcome> {
        self.request(|reply| Command::Draw { reply }).await?
    }

    pub async fn repost(&self) -> Result<MessageRef> {
        self.request(|reply| Command::Repost { reply }).await?
    }

    pub async fn status(&self) -> Result<StatusReport> {
        self.request(|reply| Command::Status { reply }).await
    }
}

/// Handles of a running engine
pub struct EngineService {
    pub handle: EngineHandle,
    pub worker: JoinHandle<()>,
    pub ticker: JoinHandle<()>,
}

impl EngineService {
    /// Stop the timer and let the worker finish its current command
    pub async fn shutdown(self) {
        self.ticker.abort();
        let _ = self.handle.tx.send(Command::Shutdown).await;
        let _ = self.worker.await;
    }
}

/// Spawn the engine task and its poll timer
pub fn spawn(controller: SyncController, schedule: Schedule, clock: Arc<dyn Clock>) -> EngineService {
    let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
    let worker = tokio::spawn(run(controller, rx, clock));

    let ticks = tx.clone();
    let ticker = tokio::spawn(async move {
        time::sleep(schedule.initial_delay).await;
        let mut interval = time::interval(schedule.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            if ticks.send(Command::Tick { reply: None }).await.is_err() {
                debug!("engine stopped, ending poll timer");
                break;
            }
        }
    });

    EngineService {
        handle: EngineHandle { tx },
        worker,
        ticker,
    }
}

async fn run(mut controller: SyncController, mut rx: mpsc::Receiver<Command>, clock: Arc<dyn Clock>) {
    info!(interval = %controller.engine().interval(), "lottery engine started");

    while let Some(command) = rx.recv().await {
        let now = clock.now();
        match command {
            Command::Tick { reply } => {
                let report = controller.tick(now).await;
                if let Some(reply) = reply {
                    let _ = reply.send(report);
                }
            }
            Command::Draw { reply } => {
                let _ = reply.send(controller.draw(now).await);
            }
            Command::Repost { reply } => {
                let _ = reply.send(controller.repost(now).await);
            }
            Command::Status { reply } => {
                let _ = reply.send(status(&controller, now));
            }
            Command::Shutdown => break,
        }
    }

    info!("lottery engine stopped");
}

fn status(controller: &SyncController, now: DateTime<Utc>) -> StatusReport {
    let engine = controller.engine();
    let tally = engine.tally(engine.interval());
    StatusReport {
        interval: engine.interval(),
        phase: engine.phase(now),
        next_draw: engine.next_draw(),
        records: engine.ledger().len(),
        last_id: engine.ledger().last_id(),
        pot: tally.pot,
        total_tickets: tally.total_tickets(),
        holders: tally.holders(),
        message: engine.state().last_displayed_message_ref.clone(),
        ledger_dirty: engine.ledger_dirty(),
    }
}
