use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use numbercontest_execution::ContestConfig;
use numbercontest_table::{serve, AppState, TableConfig};
use numbercontest_types::PlayerId;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const STEP: Duration = Duration::from_secs(10);

async fn send(client: &mut Client, value: Value) {
    client
        .send(Message::Text(value.to_string()))
        .await
        .expect("send");
}

async fn next_json(client: &mut Client) -> Value {
    loop {
        let message = timeout(STEP, client.next())
            .await
            .expect("timed out waiting for message")
            .expect("stream ended")
            .expect("websocket error");
        if let Message::Text(text) = message {
            return serde_json::from_str(&text).expect("json");
        }
    }
}

/// Read messages up to and including the first one of type `kind`.
async fn collect_until(client: &mut Client, kind: &str) -> Vec<Value> {
    let mut seen = Vec::new();
    loop {
        let value = next_json(client).await;
        let done = value["type"] == kind;
        seen.push(value);
        if done {
            return seen;
        }
    }
}

fn numbers_in(messages: &[Value]) -> Vec<&Value> {
    messages
        .iter()
        .filter(|value| value["type"] == "assign_number")
        .collect()
}

#[tokio::test]
async fn test_two_player_round_over_websocket() {
    let config = TableConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        min_players: 2,
        contest: ContestConfig {
            seed: Some(11),
            decision_window_ms: 5_000,
            next_round_delay_ms: 60_000,
            ..ContestConfig::default()
        },
        ..TableConfig::default()
    };
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let state = AppState::new(&config);
    let server = tokio::spawn(serve(listener, state, config, shutdown_rx));

    let url = format!("ws://{addr}/ws");
    let (mut first, _) = connect_async(url.as_str()).await.expect("connect first");
    let (mut second, _) = connect_async(url.as_str()).await.expect("connect second");

    // Decisions before joining are rejected.
    send(
        &mut first,
        json!({"type": "decision", "requestId": "early", "playerId": 1, "decision": "Fold"}),
    )
    .await;
    let rejected = collect_until(&mut first, "error").await;
    let error = rejected.last().unwrap();
    assert_eq!(error["requestId"], "early");
    assert_eq!(error["code"], "NOT_JOINED");

    send(&mut first, json!({"type": "join", "requestId": "j1", "playerId": 1})).await;
    let joined = collect_until(&mut first, "ack").await;
    assert_eq!(joined.last().unwrap()["requestId"], "j1");

    send(&mut second, json!({"type": "join", "requestId": "j2", "playerId": 2})).await;

    let first_opening = collect_until(&mut first, "start_timer").await;
    let second_opening = collect_until(&mut second, "start_timer").await;

    let first_numbers = numbers_in(&first_opening);
    assert_eq!(first_numbers.len(), 1);
    assert_eq!(first_numbers[0]["playerId"], 1);
    let first_number = first_numbers[0]["number"].as_u64().unwrap();
    assert!((1..=100).contains(&first_number));

    let second_numbers = numbers_in(&second_opening);
    assert_eq!(second_numbers.len(), 1);
    assert_eq!(second_numbers[0]["playerId"], 2);

    assert!(first_opening.iter().any(|value| value["type"] == "reset_ui"));
    assert_eq!(first_opening.last().unwrap()["durationSeconds"], 5);

    // A connection cannot speak for another player.
    send(
        &mut second,
        json!({"type": "decision", "requestId": "spoof", "playerId": 1, "decision": "Fold"}),
    )
    .await;
    let spoofed = collect_until(&mut second, "error").await;
    assert_eq!(spoofed.last().unwrap()["code"], "PLAYER_MISMATCH");

    send(
        &mut first,
        json!({"type": "decision", "requestId": "d1", "playerId": 1, "decision": "Contest", "betAmount": 20}),
    )
    .await;
    send(
        &mut second,
        json!({"type": "decision", "requestId": "d2", "playerId": 2, "decision": "Fold"}),
    )
    .await;

    // Both players decided, so the window closes well before it expires.
    for client in [&mut first, &mut second] {
        let messages = collect_until(client, "display_result").await;
        let display = messages.last().unwrap();
        let message = display["message"].as_str().unwrap();
        assert!(message.starts_with("Player 1 wins by default"), "{message}");
        assert_eq!(display["result"]["winner"], 1);
        assert_eq!(display["result"]["totalPot"], 20);
        assert_eq!(display["result"]["winningNumber"], first_number);
        assert_eq!(display["result"]["counts"]["folded"], 1);

        let balances = display["result"]["balances"].as_array().unwrap();
        assert!(balances
            .iter()
            .any(|entry| entry["playerId"] == 1 && entry["balance"] == 100));
    }

    first.close(None).await.ok();
    second.close(None).await.ok();
    shutdown_tx.send(true).unwrap();
    let stopped = timeout(STEP, server).await.expect("server should stop");
    stopped.expect("server task").expect("server result");
}

#[tokio::test]
async fn test_healthz() {
    let config = TableConfig::default();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let state = AppState::new(&config);
    let server = tokio::spawn(serve(listener, state, config, shutdown_rx));

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /healthz HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    timeout(STEP, stream.read_to_string(&mut response))
        .await
        .expect("timed out")
        .unwrap();
    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.ends_with("ok"));

    shutdown_tx.send(true).unwrap();
    timeout(STEP, server).await.expect("server should stop").unwrap().unwrap();
}

#[tokio::test]
async fn test_second_connection_cannot_take_a_seated_player() {
    let config = TableConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        min_players: 2,
        contest: ContestConfig {
            seed: Some(4),
            decision_window_ms: 5_000,
            next_round_delay_ms: 60_000,
            ..ContestConfig::default()
        },
        ..TableConfig::default()
    };
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let state = AppState::new(&config);
    let table = state.clone();
    let server = tokio::spawn(serve(listener, state, config, shutdown_rx));

    let url = format!("ws://{addr}/ws");
    let (mut owner, _) = connect_async(url.as_str()).await.expect("connect owner");
    let (mut intruder, _) = connect_async(url.as_str()).await.expect("connect intruder");

    send(&mut owner, json!({"type": "join", "requestId": "j1", "playerId": 1})).await;
    collect_until(&mut owner, "ack").await;

    send(&mut intruder, json!({"type": "join", "requestId": "j1b", "playerId": 1})).await;
    let rejected = collect_until(&mut intruder, "error").await;
    let error = rejected.last().unwrap();
    assert_eq!(error["requestId"], "j1b");
    assert_eq!(error["code"], "ALREADY_JOINED");

    // The rejected connection can still seat its own player, and then only
    // ever sees that player's number.
    send(&mut intruder, json!({"type": "join", "requestId": "j2", "playerId": 2})).await;
    let opening = collect_until(&mut intruder, "start_timer").await;
    let numbers = numbers_in(&opening);
    assert_eq!(numbers.len(), 1);
    assert_eq!(numbers[0]["playerId"], 2);

    let owner_opening = collect_until(&mut owner, "start_timer").await;
    let owner_numbers = numbers_in(&owner_opening);
    assert_eq!(owner_numbers.len(), 1);
    assert_eq!(owner_numbers[0]["playerId"], 1);

    intruder.close(None).await.ok();
    drop(intruder);
    let mut released = false;
    for _ in 0..100 {
        if !table.lock_engine().is_seated(PlayerId(2)) {
            released = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(released, "closed connection should release its own seat");
    assert!(table.lock_engine().is_seated(PlayerId(1)));

    owner.close(None).await.ok();
    shutdown_tx.send(true).unwrap();
    timeout(STEP, server)
        .await
        .expect("server should stop")
        .expect("server task")
        .expect("server result");
}
