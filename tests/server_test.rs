//! Coordinator and server tests.
//!
//! The coordinator tests drive the hub directly through attached listener
//! channels; the end-to-end test runs the real axum server and talks to it
//! over WebSocket. Replication is disabled throughout (no broker), which is
//! exactly the degraded mode the server must keep working in.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use rga_collab::config::DOCUMENT_CHANNEL;
use rga_collab::coordinator::{Coordinator, SessionId};
use rga_collab::crdt::{Element, ElementId, Operation, Rga};
use rga_collab::server::{ServerEvent, create_router};

fn hub() -> Arc<Coordinator> {
    Arc::new(Coordinator::new(Rga::new("server"), None, DOCUMENT_CHANNEL))
}

fn attach(hub: &Coordinator) -> (SessionId, mpsc::UnboundedReceiver<ServerEvent>) {
    let session = SessionId::next();
    let (tx, rx) = mpsc::unbounded_channel();
    hub.attach_listener(session, tx);
    (session, rx)
}

fn drain(rx: &mut mpsc::UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_initial_state_on_connect() {
    let hub = hub();
    hub.handle_text_change(SessionId::next(), "existing").await;

    let (session, mut rx) = attach(&hub);
    hub.on_client_connect(session).await;

    let events = drain(&mut rx);
    assert_eq!(events.len(), 1);
    assert!(
        matches!(&events[0], ServerEvent::InitialState { value } if value == "existing"),
        "unexpected event: {:?}",
        events[0]
    );
}

#[tokio::test]
async fn test_text_change_broadcasts_to_others_only() {
    let hub = hub();
    let (author, mut author_rx) = attach(&hub);
    let (observer, mut observer_rx) = attach(&hub);
    assert_ne!(author, observer);

    hub.handle_text_change(author, "Hi").await;

    assert_eq!(hub.value().await, "Hi");
    assert!(drain(&mut author_rx).is_empty());

    let events = drain(&mut observer_rx);
    assert_eq!(events.len(), 2);
    for event in &events {
        assert!(
            matches!(
                event,
                ServerEvent::Operation {
                    op: Operation::Insert { .. }
                }
            ),
            "unexpected event: {event:?}"
        );
    }
}

#[tokio::test]
async fn test_identical_text_change_is_silent() {
    let hub = hub();
    let (author, _author_rx) = attach(&hub);
    hub.handle_text_change(author, "same").await;

    let (observer, mut observer_rx) = attach(&hub);
    hub.handle_text_change(observer, "same").await;

    assert!(drain(&mut observer_rx).is_empty());
}

#[tokio::test]
async fn test_inbound_op_is_applied_and_fanned_out() {
    let hub = hub();
    let (_session, mut rx) = attach(&hub);

    let op = Operation::Insert {
        element: Element::new(ElementId::new(1, "peer"), 'R', ElementId::head()),
    };
    hub.on_inbound_from_channel(op).await;

    assert_eq!(hub.value().await, "R");
    let events = drain(&mut rx);
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], ServerEvent::Operation { .. }));
}

#[tokio::test]
async fn test_own_echo_is_filtered() {
    let hub = hub();
    let (_session, mut rx) = attach(&hub);

    // An operation whose origin is this server's own site id, as it would
    // come back from the pub/sub channel.
    let op = Operation::Insert {
        element: Element::new(ElementId::new(7, "server"), 'E', ElementId::head()),
    };
    hub.on_inbound_from_channel(op).await;

    assert_eq!(hub.value().await, "");
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn test_snapshot_create_and_revert_flow() {
    let hub = hub();
    let (author, _author_rx) = attach(&hub);
    let (observer, mut observer_rx) = attach(&hub);

    hub.handle_text_change(author, "Hello").await;
    drain(&mut observer_rx);

    hub.create_snapshot(author).await;
    let events = drain(&mut observer_rx);
    assert_eq!(events.len(), 1);
    let ServerEvent::SnapshotsUpdated { snapshots } = &events[0] else {
        panic!("expected snapshots_updated, got {:?}", events[0]);
    };
    assert_eq!(snapshots.len(), 1);
    let snapshot_id = snapshots[0].clone();
    assert_eq!(hub.list_snapshots(), vec![snapshot_id.clone()]);

    hub.handle_text_change(author, "Help").await;
    assert_eq!(hub.value().await, "Help");
    drain(&mut observer_rx);

    hub.revert_to_snapshot(observer, &snapshot_id).await;
    assert_eq!(hub.value().await, "Hello");

    let events = drain(&mut observer_rx);
    assert_eq!(events.len(), 1);
    assert!(
        matches!(&events[0], ServerEvent::FullStateUpdate { value } if value == "Hello"),
        "unexpected event: {:?}",
        events[0]
    );

    // The document stays editable after the revert.
    hub.handle_text_change(author, "Hello!").await;
    assert_eq!(hub.value().await, "Hello!");
}

#[tokio::test]
async fn test_revert_to_unknown_snapshot_errors_requester_only() {
    let hub = hub();
    let (requester, mut requester_rx) = attach(&hub);
    let (other, mut other_rx) = attach(&hub);
    assert_ne!(requester, other);

    hub.revert_to_snapshot(requester, "2099-01-01_00-00-00").await;

    let events = drain(&mut requester_rx);
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], ServerEvent::Error { .. }));
    assert!(drain(&mut other_rx).is_empty());
}

#[tokio::test]
async fn test_detached_listener_is_skipped() {
    let hub = hub();
    let (author, _author_rx) = attach(&hub);
    let (leaver, mut leaver_rx) = attach(&hub);

    hub.detach_listener(leaver);
    hub.handle_text_change(author, "x").await;

    assert!(drain(&mut leaver_rx).is_empty());
    assert_eq!(hub.listener_count(), 1);
}

type WsClient = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

async fn next_json(ws: &mut WsClient) -> serde_json::Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for websocket message")
            .expect("websocket stream ended")
            .expect("websocket error");
        if let tokio_tungstenite::tungstenite::Message::Text(text) = msg {
            return serde_json::from_str(&text).expect("server sent invalid JSON");
        }
    }
}

#[tokio::test]
async fn test_websocket_end_to_end() {
    let hub = hub();
    let app = create_router().with_state(hub.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    let url = format!("ws://{addr}/ws");

    let (mut author, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();
    let init = next_json(&mut author).await;
    assert_eq!(init["type"], "initial_state");
    assert_eq!(init["value"], "");

    let (mut observer, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();
    let init = next_json(&mut observer).await;
    assert_eq!(init["value"], "");

    author
        .send(tokio_tungstenite::tungstenite::Message::Text(
            r#"{"type":"text_change","value":"Hi"}"#.to_string(),
        ))
        .await
        .unwrap();

    let first = next_json(&mut observer).await;
    assert_eq!(first["type"], "operation");
    assert_eq!(first["op"]["type"], "insert");
    assert_eq!(first["op"]["element"]["value"], "H");

    let second = next_json(&mut observer).await;
    assert_eq!(second["op"]["element"]["value"], "i");

    // A client connecting now sees the applied edit.
    let (mut late, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();
    let init = next_json(&mut late).await;
    assert_eq!(init["value"], "Hi");
}
