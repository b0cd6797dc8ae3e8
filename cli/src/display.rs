//! Text rendering of boards and draw results
//!
//! [`FilePresenter`] stands in for a chat channel: every message is a text
//! file under `<data_dir>/display/`, named by its message ref. Editing a
//! message rewrites its file.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, Utc};
use lotto_core::constants::{SILVER, UNIT_SIZE};
use lotto_core::{Board, DrawResult, Phase};
use lotto_engine::{MessageRef, Presenter, PresenterError};
use parking_lot::Mutex;
use tracing::info;

const TITLE: &str = "Guild Lottery";
const MESSAGE_PREFIX: &str = "msg-";

/// `G g SS s CC c`
pub fn format_coins(coins: i64) -> String {
    let sign = if coins < 0 { "-" } else { "" };
    let copper = coins.unsigned_abs();
    format!(
        "{}{} g {:02} s {:02} c",
        sign,
        copper / UNIT_SIZE,
        (copper % UNIT_SIZE) / SILVER,
        copper % SILVER
    )
}

fn format_time(time: DateTime<Utc>, offset: &FixedOffset) -> String {
    time.with_timezone(offset).format("%d.%m.%Y %H:%M").to_string()
}

pub fn phase_marker(phase: Phase) -> &'static str {
    match phase {
        Phase::Open => "⏳",
        Phase::Due => "✅",
    }
}

/// Live board: dates, pot, ticket standings and prize lines
pub fn render_board(board: &Board, unit_size: u64, offset: &FixedOffset) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {} {}", TITLE, board.interval, phase_marker(board.phase));
    let ticket_price = i64::try_from(unit_size).unwrap_or(i64::MAX);
    let _ = writeln!(out, "1 ticket costs {}", format_coins(ticket_price));
    let _ = writeln!(out);
    let _ = writeln!(out, "Next draw:  {}", format_time(board.next_draw, offset));
    let _ = writeln!(out, "Last draw:  {}", format_time(board.last_draw, offset));
    let _ = writeln!(out, "Pot:        {}", format_coins(board.pot));
    let _ = writeln!(out);

    let _ = writeln!(out, "Tickets ({})", board.total_tickets);
    if board.standings.is_empty() {
        let _ = writeln!(out, "  /");
    }
    for standing in &board.standings {
        let _ = writeln!(out, "  {}: {}", standing.user, standing.tickets);
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Prizes");
    for rank in &board.ranks {
        let _ = writeln!(out, "  {:<12} {}", rank.label, format_coins(rank.amount as i64));
    }
    out
}

/// Results view: each rank with its winner and prize
pub fn render_results(result: &DrawResult, offset: &FixedOffset) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {} results", TITLE, result.interval);
    let _ = writeln!(out);
    let _ = writeln!(out, "Drawn:  {}", format_time(result.drawn_at, offset));
    let _ = writeln!(out, "Pot:    {}", format_coins(result.pot));
    let _ = writeln!(out, "Tickets: {}", result.log.len());
    let _ = writeln!(out);

    let width = result
        .winners
        .iter()
        .map(|w| w.to_string().chars().count())
        .max()
        .unwrap_or(0);
    for (rank, winner) in result.placements() {
        let _ = writeln!(
            out,
            "  {:<12} {:<width$}  {}",
            rank.label,
            winner.to_string(),
            format_coins(rank.amount as i64),
            width = width
        );
    }
    out
}

struct DisplayState {
    next_id: u64,
    fingerprint: Option<String>,
}

/// Presenter writing one text file per message
pub struct FilePresenter {
    dir: PathBuf,
    unit_size: u64,
    offset: FixedOffset,
    state: Mutex<DisplayState>,
}

impl FilePresenter {
    /// Open `<data_dir>/display`, continuing the message numbering found there
    pub fn open<P: AsRef<Path>>(data_dir: P, unit_size: u64, offset: FixedOffset) -> std::io::Result<Self> {
        let dir = data_dir.as_ref().join("display");
        std::fs::create_dir_all(&dir)?;

        let mut last_id = 0;
        for entry in std::fs::read_dir(&dir)? {
            let name = entry?.file_name();
            let id = name
                .to_str()
                .and_then(|n| n.strip_suffix(".txt"))
                .and_then(|n| n.strip_prefix(MESSAGE_PREFIX))
                .and_then(|n| n.parse::<u64>().ok());
            if let Some(id) = id {
                last_id = last_id.max(id);
            }
        }

        Ok(Self {
            dir,
            unit_size,
            offset,
            state: Mutex::new(DisplayState {
                next_id: last_id + 1,
                fingerprint: None,
            }),
        })
    }

    pub fn message_path(&self, message: &MessageRef) -> PathBuf {
        self.dir.join(format!("{}.txt", message))
    }

    fn issue(&self) -> MessageRef {
        let mut state = self.state.lock();
        let id = state.next_id;
        state.next_id += 1;
        MessageRef(format!("{}{}", MESSAGE_PREFIX, id))
    }

    async fn write(&self, existing: Option<&MessageRef>, text: &str) -> Result<MessageRef, PresenterError> {
        let message = match existing {
            Some(message) => {
                let exists = tokio::fs::try_exists(self.message_path(message))
                    .await
                    .map_err(|e| PresenterError::Unavailable(e.to_string()))?;
                if !exists {
                    return Err(PresenterError::MessageNotFound(message.clone()));
                }
                message.clone()
            }
            None => self.issue(),
        };

        tokio::fs::write(self.message_path(&message), text)
            .await
            .map_err(|e| PresenterError::Unavailable(e.to_string()))?;
        Ok(message)
    }
}

#[async_trait::async_trait]
impl Presenter for FilePresenter {
    async fn show_board(
        &self,
        board: &Board,
        existing: Option<&MessageRef>,
    ) -> Result<MessageRef, PresenterError> {
        let text = render_board(board, self.unit_size, &self.offset);
        let message = self.write(existing, &text).await?;

        self.state.lock().fingerprint = Some(board.fingerprint());
        info!(
            %message,
            interval = %board.interval,
            pot = board.pot,
            tickets = board.total_tickets,
            edited = existing.is_some(),
            "board displayed"
        );
        Ok(message)
    }

    async fn show_results(
        &self,
        result: &DrawResult,
        existing: Option<&MessageRef>,
    ) -> Result<MessageRef, PresenterError> {
        let text = render_results(result, &self.offset);
        let message = self.write(existing, &text).await?;

        info!(
            %message,
            interval = %result.interval,
            winners = ?result.winners.iter().map(|w| w.to_string()).collect::<Vec<_>>(),
            "results displayed"
        );
        Ok(message)
    }

    fn current_fingerprint(&self) -> Option<String> {
        self.state.lock().fingerprint.clone()
    }
}
