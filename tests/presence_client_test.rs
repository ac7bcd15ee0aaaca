use folio_status::config::toml_config::PresenceConfig;
use folio_status::core::presence::{
    presence_channel, PresenceApi, PresenceStore, ReconcileOutcome, Visibility,
};
use folio_status::domain::model::PresenceSnapshot;
use folio_status::FolioError;
use futures_util::{SinkExt, StreamExt};
use httpmock::prelude::*;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

const WAIT: Duration = Duration::from_secs(5);

fn config(socket_url: String, http_base: String) -> PresenceConfig {
    PresenceConfig {
        socket_url,
        http_base,
        max_attempts: 3,
        backoff_base_ms: 10,
        backoff_max_ms: 50,
        request_timeout_seconds: 5,
        ..Default::default()
    }
}

fn presence_event(event: &str, status: &str) -> Message {
    Message::text(
        json!({
            "op": 0,
            "t": event,
            "d": {
                "discord_user": {"id": "42", "username": "owner"},
                "discord_status": status,
                "activities": [{
                    "type": 0,
                    "name": "Code",
                    "application_id": "7",
                    "assets": {"large_image": "mp:external/abc/https/images.example.com/logo.png"}
                }]
            }
        })
        .to_string(),
    )
}

async fn accept(listener: &TcpListener) -> WebSocketStream<TcpStream> {
    let (stream, _) = listener.accept().await.unwrap();
    tokio_tungstenite::accept_async(stream).await.unwrap()
}

async fn subscribed(listener: &TcpListener) -> WebSocketStream<TcpStream> {
    let mut ws = accept(listener).await;
    assert_eq!(next_json(&mut ws).await["op"], 2);
    ws
}

async fn next_json(ws: &mut WebSocketStream<TcpStream>) -> Value {
    loop {
        let msg = timeout(WAIT, ws.next()).await.unwrap().unwrap().unwrap();
        if msg.is_text() {
            return serde_json::from_str(msg.to_text().unwrap()).unwrap();
        }
    }
}

async fn close_with(mut ws: WebSocketStream<TcpStream>, code: CloseCode) {
    ws.send(Message::Close(Some(CloseFrame {
        code,
        reason: "bye".into(),
    })))
    .await
    .unwrap();
    while let Some(Ok(_)) = ws.next().await {}
}

#[tokio::test]
async fn test_subscribe_heartbeat_and_reconnect_after_abnormal_close() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());

    let relay = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        assert_eq!(
            next_json(&mut ws).await,
            json!({"op": 2, "d": {"subscribe_to_id": "42"}})
        );
        ws.send(Message::text(r#"{"op":1,"d":{"heartbeat_interval":50}}"#))
            .await
            .unwrap();
        // immediate reply, then the periodic one
        assert_eq!(next_json(&mut ws).await, json!({"op": 3}));
        assert_eq!(next_json(&mut ws).await, json!({"op": 3}));
        ws.send(presence_event("INIT_STATE", "online")).await.unwrap();
        close_with(ws, CloseCode::Away).await;

        let mut ws = accept(&listener).await;
        assert_eq!(next_json(&mut ws).await["op"], 2);
        ws.send(presence_event("PRESENCE_UPDATE", "idle")).await.unwrap();
        close_with(ws, CloseCode::Normal).await;
    });

    let store = PresenceStore::new();
    let mut updates = store.subscribe();
    let cfg = config(url, "http://127.0.0.1:9".to_string());
    let api = PresenceApi::new(&cfg, "42").unwrap();
    let (client, _handle) = presence_channel(&cfg, api, store.clone());

    let result = timeout(WAIT, client.run()).await.unwrap();
    assert!(result.is_ok(), "normal close should stop the client cleanly");
    relay.await.unwrap();

    assert!(updates.has_changed().unwrap());
    let latest = updates.borrow_and_update().clone().unwrap();
    assert_eq!(latest.discord_status, "idle");
    assert_eq!(
        latest.activities[0].large_image(),
        Some("https://images.example.com/logo.png")
    );
    assert!(!store.is_live());
}

#[tokio::test]
async fn test_drifted_reconcile_reconnects_with_fresh_attempt_budget() {
    let server = MockServer::start();
    let snapshot_mock = server.mock(|when, then| {
        when.method(GET).path("/v1/users/42");
        then.status(200).json_body(json!({
            "success": true,
            "data": {"discord_user": {"id": "42"}, "discord_status": "dnd"}
        }));
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let (connected_tx, connected_rx) = oneshot::channel();

    let relay = tokio::spawn(async move {
        // spend two of the three attempts before the reconcile
        for _ in 0..2 {
            close_with(subscribed(&listener).await, CloseCode::Away).await;
        }

        let mut ws = subscribed(&listener).await;
        connected_tx.send(()).unwrap();
        // the client hangs up by itself once told to reconnect
        while let Some(Ok(msg)) = ws.next().await {
            if msg.is_close() {
                break;
            }
        }

        // a full budget of abnormal closes is still tolerated afterwards
        for _ in 0..3 {
            close_with(subscribed(&listener).await, CloseCode::Away).await;
        }

        let mut ws = subscribed(&listener).await;
        ws.send(presence_event("PRESENCE_UPDATE", "idle")).await.unwrap();
        close_with(ws, CloseCode::Normal).await;
    });

    let store = PresenceStore::new();
    let cfg = config(url, server.base_url());
    let api = PresenceApi::new(&cfg, "42").unwrap();
    let (client, handle) = presence_channel(&cfg, api, store.clone());
    let task = tokio::spawn(client.run());

    timeout(WAIT, connected_rx).await.unwrap().unwrap();
    assert_eq!(handle.reconcile().await.unwrap(), ReconcileOutcome::Resynced);
    assert_eq!(store.current().unwrap().discord_status, "dnd");

    let result = timeout(WAIT, task).await.unwrap().unwrap();
    assert!(result.is_ok(), "client gave up: {:?}", result);
    timeout(WAIT, relay).await.unwrap().unwrap();

    snapshot_mock.assert_hits(1);
    assert_eq!(store.current().unwrap().discord_status, "idle");
    assert!(!store.is_live());
}

#[tokio::test]
async fn test_gives_up_after_max_attempts() {
    // grab a free port, then close it so every connect is refused
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    drop(listener);

    let cfg = config(url, "http://127.0.0.1:9".to_string());
    let api = PresenceApi::new(&cfg, "42").unwrap();
    let (client, _handle) = presence_channel(&cfg, api, PresenceStore::new());

    let err = timeout(WAIT, client.run()).await.unwrap().unwrap_err();
    assert!(matches!(err, FolioError::PresenceUnavailable { attempts: 3 }));
}

#[tokio::test]
async fn test_shutdown_stops_running_client() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let relay = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        next_json(&mut ws).await;
        while let Some(Ok(_)) = ws.next().await {}
    });

    let cfg = config(url, "http://127.0.0.1:9".to_string());
    let api = PresenceApi::new(&cfg, "42").unwrap();
    let (client, handle) = presence_channel(&cfg, api, PresenceStore::new());
    let task = tokio::spawn(client.run());

    tokio::time::sleep(Duration::from_millis(100)).await;
    handle.shutdown().await;

    assert!(timeout(WAIT, task).await.unwrap().unwrap().is_ok());
    timeout(WAIT, relay).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_reconcile_and_visibility() {
    let server = MockServer::start();
    let mut snapshot_mock = server.mock(|when, then| {
        when.method(GET).path("/v1/users/42");
        then.status(200).json_body(json!({
            "success": true,
            "data": {"discord_user": {"id": "42"}, "discord_status": "dnd"}
        }));
    });

    let store = PresenceStore::new();
    store.update(PresenceSnapshot {
        discord_status: "online".to_string(),
        ..Default::default()
    });
    let cfg = config("ws://127.0.0.1:9".to_string(), server.base_url());
    let api = PresenceApi::new(&cfg, "42").unwrap();
    // no client is running here, so reconcile only refreshes the cache
    let (_client, handle) = presence_channel(&cfg, api, store.clone());

    assert_eq!(handle.reconcile().await.unwrap(), ReconcileOutcome::Resynced);
    assert_eq!(store.current().unwrap().discord_status, "dnd");
    assert_eq!(handle.reconcile().await.unwrap(), ReconcileOutcome::InSync);
    snapshot_mock.assert_hits(2);

    // only a hidden -> visible transition reconciles
    assert_eq!(handle.set_visibility(Visibility::Visible).await.unwrap(), None);
    assert_eq!(handle.set_visibility(Visibility::Hidden).await.unwrap(), None);
    snapshot_mock.assert_hits(2);

    snapshot_mock.delete();
    server.mock(|when, then| {
        when.method(GET).path("/v1/users/42");
        then.status(200).json_body(json!({
            "success": true,
            "data": {"discord_user": {"id": "42"}, "discord_status": "idle"}
        }));
    });
    assert_eq!(
        handle.set_visibility(Visibility::Visible).await.unwrap(),
        Some(ReconcileOutcome::Resynced)
    );
    assert_eq!(store.current().unwrap().discord_status, "idle");
}
