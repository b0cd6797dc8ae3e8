//! End to end: config, file store, file display and a full draw cycle

use std::path::Path;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use lotto_cli::app::{open_engine, open_presenter};
use lotto_cli::Config;
use lotto_core::{RawLogEntry, SourceError, TransactionSource};
use lotto_engine::{DrawOutcome, SyncController};
use parking_lot::Mutex;
use tempfile::tempdir;

/// Serves one batch, then nothing
struct OneBatch(Mutex<Option<Vec<RawLogEntry>>>);

#[async_trait::async_trait]
impl TransactionSource for OneBatch {
    async fn fetch_since(&self, _cursor: Option<u64>) -> Result<Vec<RawLogEntry>, SourceError> {
        Ok(self.0.lock().take().unwrap_or_default())
    }
}

fn entry(id: u64, user: &str, operation: &str, coins: i64, time: &str) -> RawLogEntry {
    RawLogEntry {
        id: Some(id),
        time: Some(time.to_string()),
        user: Some(user.to_string()),
        kind: Some("stash".to_string()),
        operation: Some(operation.to_string()),
        coins: Some(coins),
        defect: None,
    }
}

fn config(data_dir: &Path) -> Config {
    let mut config = Config::parse(
        r#"
        [guild]
        id = "GUILD-1"

        [lottery]
        excluded_users = ["Treasurer.0001"]
        "#,
    )
    .unwrap();
    config.storage.data_dir = data_dir.to_path_buf();
    config
}

#[tokio::test]
async fn test_draw_cycle_on_disk() {
    let dir = tempdir().unwrap();
    let config = config(dir.path());
    let opened = Utc.with_ymd_and_hms(2024, 5, 2, 12, 0, 0).unwrap();

    let source = Arc::new(OneBatch(Mutex::new(Some(vec![
        entry(1, "Alice.1111", "deposit", 40_000, "2024-04-20T10:00:00.000Z"),
        entry(2, "Bob.2222", "deposit", 25_000, "2024-04-21T10:00:00.000Z"),
        entry(3, "Bob.2222", "withdraw", 5_000, "2024-04-22T10:00:00.000Z"),
        entry(4, "Treasurer.0001", "deposit", 500_000, "2024-04-23T10:00:00.000Z"),
    ]))));
    let engine = open_engine(&config, opened).unwrap();
    let presenter = Arc::new(open_presenter(&config).unwrap());
    let mut controller = SyncController::new(engine, source, presenter);

    let report = controller.tick(opened).await;
    assert_eq!(report.appended.map(|a| a.added), Some(4));
    let board_file = dir.path().join("display").join("msg-1.txt");
    let board = std::fs::read_to_string(&board_file).unwrap();
    assert!(board.contains("Pot:        6 g 00 s 00 c"), "{}", board);
    assert!(board.contains("Alice.1111: 4"));

    let outcome = controller
        .draw(Utc.with_ymd_and_hms(2024, 5, 5, 21, 30, 0).unwrap())
        .await
        .unwrap();
    let result = match outcome {
        DrawOutcome::Drawn(result) => result,
        other => panic!("unexpected outcome {:?}", other),
    };
    assert_eq!(result.pot, 60_000);
    assert_eq!(result.log.len(), 6);

    // Old board became the results, a new board was posted
    let results = std::fs::read_to_string(&board_file).unwrap();
    assert!(results.starts_with("Guild Lottery 2024-05 results"), "{}", results);
    let next_board = std::fs::read_to_string(dir.path().join("display").join("msg-2.txt")).unwrap();
    assert!(next_board.starts_with("Guild Lottery 2024-06"));
    drop(controller);

    let reopened = open_engine(&config, Utc.with_ymd_and_hms(2024, 5, 6, 0, 0, 0).unwrap()).unwrap();
    assert_eq!(reopened.interval().to_string(), "2024-06");
    assert_eq!(reopened.ledger().len(), 4);
    assert_eq!(
        reopened.state().last_displayed_message_ref.as_ref().map(|m| m.to_string()),
        Some("msg-2".to_string())
    );

    let stored = reopened
        .draw_result("2024-05".parse().unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(stored, result);
    assert!(stored.verify().is_ok());
}
