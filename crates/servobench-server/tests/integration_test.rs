//! Integration tests for the servo command WebSocket server.
//!
//! These tests start an actual server and connect with a WebSocket client
//! to verify end-to-end functionality.

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::MaybeTlsStream;
use tokio_tungstenite::WebSocketStream;

use servobench_core::{MemorySettings, NullPwm, ServoBank};
use servobench_server::{ServerConfig, ServoServer};

/// Find an available port for testing.
async fn find_available_port() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Start a test server and return its address and task handle.
async fn start_test_server() -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let addr = find_available_port().await;

    let config = ServerConfig {
        name: "test-server".to_string(),
        bind_addr: addr,
    };
    let bank = ServoBank::new(NullPwm, MemorySettings::new());
    let server = ServoServer::new(config, bank);

    let handle = tokio::spawn(async move {
        let _ = server.run().await;
    });

    // Give server time to start
    tokio::time::sleep(Duration::from_millis(50)).await;

    (addr, handle)
}

/// Connect a WebSocket client to the given address.
async fn connect_client(addr: SocketAddr) -> WebSocketStream<MaybeTlsStream<TcpStream>> {
    let url = format!("ws://{}/ws", addr);
    let (ws_stream, _) = tokio_tungstenite::connect_async(&url)
        .await
        .expect("Failed to connect");
    ws_stream
}

/// Wait for a text message with timeout.
async fn recv_text(
    ws: &mut WebSocketStream<MaybeTlsStream<TcpStream>>,
) -> Result<String, &'static str> {
    match timeout(Duration::from_secs(5), ws.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => Ok(text),
        Ok(Some(Ok(_))) => Err("Unexpected message type"),
        Ok(Some(Err(_))) => Err("WebSocket error"),
        Ok(None) => Err("Connection closed"),
        Err(_) => Err("Timeout"),
    }
}

/// Send a JSON value as a text frame.
async fn send_json(
    ws: &mut WebSocketStream<MaybeTlsStream<TcpStream>>,
    value: serde_json::Value,
) {
    ws.send(Message::Text(value.to_string()))
        .await
        .expect("Should send message");
}

#[tokio::test]
async fn test_config_report_on_connect() {
    let (addr, handle) = start_test_server().await;

    let mut ws = connect_client(addr).await;

    // First message is the full configuration report
    let msg = recv_text(&mut ws).await.expect("Should receive config");
    let config: serde_json::Value = serde_json::from_str(&msg).expect("Valid JSON");

    assert_eq!(config["frequency"], 50);
    let servos = config["servos"].as_array().expect("servos array");
    assert_eq!(servos.len(), 16);
    assert_eq!(servos[0]["index"], 0);
    assert_eq!(servos[0]["name"], "Servo 1");
    assert_eq!(servos[0]["minPulse"], 150);
    assert_eq!(servos[0]["maxPulse"], 600);
    assert_eq!(servos[0]["centerOffset"], 0);
    assert_eq!(servos[0]["currentPos"], 90);

    ws.close(None).await.ok();
    handle.abort();
}

#[tokio::test]
async fn test_set_position_round_trip() {
    let (addr, handle) = start_test_server().await;

    let mut ws = connect_client(addr).await;
    let _ = recv_text(&mut ws).await.expect("config report");

    send_json(
        &mut ws,
        serde_json::json!({"command": "setPosition", "servoIndex": 3, "angle": 45}),
    )
    .await;

    let msg = recv_text(&mut ws).await.expect("Should receive ack");
    let ack: serde_json::Value = serde_json::from_str(&msg).expect("Valid JSON");
    assert_eq!(ack["status"], "ok");
    assert_eq!(ack["command"], "setPosition");
    assert_eq!(ack["servoIndex"], 3);
    assert_eq!(ack["angle"], 45);

    // The new position shows up in a fresh report
    send_json(&mut ws, serde_json::json!({"command": "getConfig"})).await;
    let msg = recv_text(&mut ws).await.expect("Should receive config");
    let config: serde_json::Value = serde_json::from_str(&msg).expect("Valid JSON");
    assert_eq!(config["servos"][3]["currentPos"], 45);

    ws.close(None).await.ok();
    handle.abort();
}

#[tokio::test]
async fn test_calibrate_updates_config() {
    let (addr, handle) = start_test_server().await;

    let mut ws = connect_client(addr).await;
    let _ = recv_text(&mut ws).await.expect("config report");

    send_json(
        &mut ws,
        serde_json::json!({
            "command": "calibrate",
            "servoIndex": 2,
            "minPulse": 120,
            "maxPulse": 620,
            "centerOffset": 10,
            "name": "Elbow"
        }),
    )
    .await;

    let msg = recv_text(&mut ws).await.expect("Should receive ack");
    let ack: serde_json::Value = serde_json::from_str(&msg).expect("Valid JSON");
    assert_eq!(ack["status"], "ok");
    assert_eq!(ack["command"], "calibrate");
    assert_eq!(ack["servoIndex"], 2);

    send_json(&mut ws, serde_json::json!({"command": "getConfig"})).await;
    let msg = recv_text(&mut ws).await.expect("Should receive config");
    let config: serde_json::Value = serde_json::from_str(&msg).expect("Valid JSON");
    let servo = &config["servos"][2];
    assert_eq!(servo["minPulse"], 120);
    assert_eq!(servo["maxPulse"], 620);
    assert_eq!(servo["centerOffset"], 10);
    assert_eq!(servo["name"], "Elbow");

    ws.close(None).await.ok();
    handle.abort();
}

#[tokio::test]
async fn test_malformed_json_is_dropped() {
    let (addr, handle) = start_test_server().await;

    let mut ws = connect_client(addr).await;
    let _ = recv_text(&mut ws).await.expect("config report");

    // Send malformed JSON - no reply expected
    ws.send(Message::Text("{ invalid json".to_string()))
        .await
        .expect("Should send message");

    match timeout(Duration::from_millis(200), ws.next()).await {
        Err(_) => {} // Timeout is expected - message dropped
        Ok(Some(Ok(Message::Text(_)))) => {
            panic!("Should not receive a reply to malformed JSON");
        }
        _ => {}
    }

    // Connection remains usable
    send_json(&mut ws, serde_json::json!({"command": "getConfig"})).await;
    let msg = recv_text(&mut ws).await.expect("Should receive config");
    let config: serde_json::Value = serde_json::from_str(&msg).expect("Valid JSON");
    assert_eq!(config["frequency"], 50);

    ws.close(None).await.ok();
    handle.abort();
}

#[tokio::test]
async fn test_unknown_command_is_ignored() {
    let (addr, handle) = start_test_server().await;

    let mut ws = connect_client(addr).await;
    let _ = recv_text(&mut ws).await.expect("config report");

    send_json(&mut ws, serde_json::json!({"command": "dance"})).await;

    match timeout(Duration::from_millis(200), ws.next()).await {
        Err(_) => {} // Timeout is expected - command ignored
        Ok(Some(Ok(Message::Text(_)))) => {
            panic!("Should not receive a reply to an unknown command");
        }
        _ => {}
    }

    ws.close(None).await.ok();
    handle.abort();
}

#[tokio::test]
async fn test_frequency_rejection_is_surfaced() {
    let (addr, handle) = start_test_server().await;

    let mut ws = connect_client(addr).await;
    let _ = recv_text(&mut ws).await.expect("config report");

    send_json(
        &mut ws,
        serde_json::json!({"command": "setFrequency", "frequency": 1001}),
    )
    .await;
    let msg = recv_text(&mut ws).await.expect("Should receive ack");
    let ack: serde_json::Value = serde_json::from_str(&msg).expect("Valid JSON");
    assert_eq!(ack["status"], "error");
    assert_eq!(ack["frequency"], 1001);

    // State unchanged
    send_json(&mut ws, serde_json::json!({"command": "getConfig"})).await;
    let msg = recv_text(&mut ws).await.expect("Should receive config");
    let config: serde_json::Value = serde_json::from_str(&msg).expect("Valid JSON");
    assert_eq!(config["frequency"], 50);

    // Boundary value is accepted
    send_json(
        &mut ws,
        serde_json::json!({"command": "setFrequency", "frequency": 1000}),
    )
    .await;
    let msg = recv_text(&mut ws).await.expect("Should receive ack");
    let ack: serde_json::Value = serde_json::from_str(&msg).expect("Valid JSON");
    assert_eq!(ack["status"], "ok");

    ws.close(None).await.ok();
    handle.abort();
}

#[tokio::test]
async fn test_invalid_channel_is_rejected() {
    let (addr, handle) = start_test_server().await;

    let mut ws = connect_client(addr).await;
    let _ = recv_text(&mut ws).await.expect("config report");

    send_json(
        &mut ws,
        serde_json::json!({"command": "setPosition", "servoIndex": 16, "angle": 45}),
    )
    .await;

    let msg = recv_text(&mut ws).await.expect("Should receive ack");
    let ack: serde_json::Value = serde_json::from_str(&msg).expect("Valid JSON");
    assert_eq!(ack["status"], "error");
    assert_eq!(ack["servoIndex"], 16);

    ws.close(None).await.ok();
    handle.abort();
}

#[tokio::test]
async fn test_group_positioning_commands() {
    let (addr, handle) = start_test_server().await;

    let mut ws = connect_client(addr).await;
    let _ = recv_text(&mut ws).await.expect("config report");

    send_json(&mut ws, serde_json::json!({"command": "minAll"})).await;
    let msg = recv_text(&mut ws).await.expect("Should receive ack");
    let ack: serde_json::Value = serde_json::from_str(&msg).expect("Valid JSON");
    assert_eq!(ack["status"], "ok");
    assert_eq!(ack["command"], "minAll");

    send_json(&mut ws, serde_json::json!({"command": "getConfig"})).await;
    let msg = recv_text(&mut ws).await.expect("Should receive config");
    let config: serde_json::Value = serde_json::from_str(&msg).expect("Valid JSON");
    for servo in config["servos"].as_array().unwrap() {
        assert_eq!(servo["currentPos"], 0);
    }

    ws.close(None).await.ok();
    handle.abort();
}

#[tokio::test]
async fn test_set_all_positions_in_order() {
    let (addr, handle) = start_test_server().await;

    let mut ws = connect_client(addr).await;
    let _ = recv_text(&mut ws).await.expect("config report");

    // 20 entries: the four beyond the channel count are ignored
    let positions: Vec<i32> = (0..20).map(|i| i * 9).collect();
    send_json(
        &mut ws,
        serde_json::json!({"command": "setAllPositions", "positions": positions}),
    )
    .await;
    let msg = recv_text(&mut ws).await.expect("Should receive ack");
    let ack: serde_json::Value = serde_json::from_str(&msg).expect("Valid JSON");
    assert_eq!(ack["status"], "ok");

    send_json(&mut ws, serde_json::json!({"command": "getConfig"})).await;
    let msg = recv_text(&mut ws).await.expect("Should receive config");
    let config: serde_json::Value = serde_json::from_str(&msg).expect("Valid JSON");
    assert_eq!(config["servos"][0]["currentPos"], 0);
    assert_eq!(config["servos"][15]["currentPos"], 135);

    ws.close(None).await.ok();
    handle.abort();
}

#[tokio::test]
async fn test_multiple_clients_each_get_config() {
    let (addr, handle) = start_test_server().await;

    let mut ws1 = connect_client(addr).await;
    let mut ws2 = connect_client(addr).await;

    let msg1 = recv_text(&mut ws1).await.expect("Client 1 config");
    let msg2 = recv_text(&mut ws2).await.expect("Client 2 config");

    let c1: serde_json::Value = serde_json::from_str(&msg1).unwrap();
    let c2: serde_json::Value = serde_json::from_str(&msg2).unwrap();
    assert_eq!(c1["servos"].as_array().unwrap().len(), 16);
    assert_eq!(c2["servos"].as_array().unwrap().len(), 16);

    // A command from client 1 is answered to client 1 only
    send_json(
        &mut ws1,
        serde_json::json!({"command": "setPosition", "servoIndex": 0, "angle": 10}),
    )
    .await;
    let msg = recv_text(&mut ws1).await.expect("Client 1 ack");
    let ack: serde_json::Value = serde_json::from_str(&msg).unwrap();
    assert_eq!(ack["status"], "ok");

    match timeout(Duration::from_millis(200), ws2.next()).await {
        Err(_) => {} // Timeout is expected - no broadcast to client 2
        Ok(Some(Ok(Message::Text(_)))) => {
            panic!("Client 2 should not receive client 1's reply");
        }
        _ => {}
    }

    ws1.close(None).await.ok();
    ws2.close(None).await.ok();
    handle.abort();
}

#[tokio::test]
async fn test_ping_pong() {
    let (addr, handle) = start_test_server().await;

    let mut ws = connect_client(addr).await;
    let _ = recv_text(&mut ws).await.expect("config report");

    ws.send(Message::Ping(vec![1, 2, 3, 4]))
        .await
        .expect("Should send ping");

    match timeout(Duration::from_secs(1), ws.next()).await {
        Ok(Some(Ok(Message::Pong(data)))) => {
            assert_eq!(data, vec![1, 2, 3, 4]);
        }
        _ => panic!("Should receive Pong"),
    }

    ws.close(None).await.ok();
    handle.abort();
}

#[tokio::test]
async fn test_save_settings_acknowledged() {
    let (addr, handle) = start_test_server().await;

    let mut ws = connect_client(addr).await;
    let _ = recv_text(&mut ws).await.expect("config report");

    send_json(&mut ws, serde_json::json!({"command": "saveSettings"})).await;
    let msg = recv_text(&mut ws).await.expect("Should receive ack");
    let ack: serde_json::Value = serde_json::from_str(&msg).expect("Valid JSON");
    assert_eq!(ack["status"], "ok");
    assert_eq!(ack["command"], "saveSettings");

    ws.close(None).await.ok();
    handle.abort();
}
