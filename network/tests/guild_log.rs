//! Guild log client against a scripted local HTTP endpoint

use std::time::Duration;

use lotto_core::{CoreError, SourceError, TransactionSource};
use lotto_network::{GuildLogClient, GuildLogConfig};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// Serve one canned response and report the raw request head
async fn serve_once(status: &'static str, body: &'static str) -> (String, mpsc::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::channel(1);

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        tx.send(String::from_utf8_lossy(&buf).to_string()).await.unwrap();

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
    });

    (format!("http://{}", addr), rx)
}

fn client(base_url: String) -> GuildLogClient {
    GuildLogClient::new(GuildLogConfig {
        base_url,
        guild_id: "GUILD-1".to_string(),
        api_key: "leader-key".to_string(),
        request_timeout: Duration::from_secs(5),
    })
    .unwrap()
}

#[tokio::test]
async fn test_fetch_since_sends_cursor_and_token() {
    let body = r#"[
        {"id": 43, "time": "2024-05-03T18:30:00.000Z", "type": "stash", "user": "Hero.1234",
         "operation": "deposit", "item_id": 0, "count": 0, "coins": 50000},
        {"id": 42, "time": "2024-05-03T18:00:00.000Z", "type": "joined", "user": "Newbie.5678"}
    ]"#;
    let (base_url, mut requests) = serve_once("200 OK", body).await;

    let entries = client(base_url).fetch_since(Some(41)).await.unwrap();

    let request = requests.recv().await.unwrap();
    assert!(request.starts_with("GET /v2/guild/GUILD-1/log?since=41 "), "{}", request);
    assert!(request
        .to_ascii_lowercase()
        .contains("authorization: bearer leader-key"));

    assert_eq!(entries.len(), 2);
    let record = entries[0].clone().into_record().unwrap().unwrap();
    assert_eq!(record.id, 43);
    assert_eq!(record.coins, 50_000);
    assert_eq!(entries[1].clone().into_record().unwrap(), None);
}

#[tokio::test]
async fn test_first_fetch_has_no_cursor() {
    let (base_url, mut requests) = serve_once("200 OK", "[]").await;

    let entries = client(base_url).fetch_since(None).await.unwrap();

    let request = requests.recv().await.unwrap();
    assert!(request.starts_with("GET /v2/guild/GUILD-1/log "), "{}", request);
    assert!(entries.is_empty());
}

#[tokio::test]
async fn test_error_status_is_rejected() {
    let (base_url, _requests) =
        serve_once("403 Forbidden", r#"{"text": "requires scope guilds"}"#).await;

    let result = client(base_url).fetch_since(None).await;

    match result {
        Err(SourceError::Rejected { status, message }) => {
            assert_eq!(status, 403);
            assert!(message.contains("requires scope"));
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[tokio::test]
async fn test_garbage_body_is_invalid_response() {
    let (base_url, _requests) = serve_once("200 OK", "not json").await;

    let result = client(base_url).fetch_since(None).await;

    assert!(matches!(result, Err(SourceError::InvalidResponse(_))));
}

#[tokio::test]
async fn test_badly_typed_entry_does_not_drop_the_page() {
    let body = r#"[
        {"id": 44, "time": "2024-05-03T19:00:00.000Z", "type": "stash", "user": "Hero.1234",
         "operation": "deposit", "coins": "lots"},
        {"id": 43, "time": "2024-05-03T18:30:00.000Z", "type": "stash", "user": "Hero.1234",
         "operation": "deposit", "coins": 50000}
    ]"#;
    let (base_url, _requests) = serve_once("200 OK", body).await;

    let entries = client(base_url).fetch_since(Some(42)).await.unwrap();

    assert_eq!(entries.len(), 2);
    assert!(matches!(
        entries[0].clone().into_record(),
        Err(CoreError::MalformedRecord { id: Some(44), .. })
    ));
    let record = entries[1].clone().into_record().unwrap().unwrap();
    assert_eq!(record.id, 43);
    assert_eq!(record.coins, 50_000);
}
