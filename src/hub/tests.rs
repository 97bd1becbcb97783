use super::engine::{Broadcast, Hub, HubHandle};
use super::message::{Envelope, MessageKind};
use crate::client::{Client, ClientState};
use crate::config::HubSettings;
use crate::utils::shutdown::Shutdown;
use std::time::Duration;
use tokio::sync::mpsc::Receiver;
use tungstenite::protocol::Message as WsMessage;

fn settings(echo_to_sender: bool) -> HubSettings {
    HubSettings {
        send_queue_capacity: 8,
        echo_to_sender,
    }
}

fn frame(text: &str) -> WsMessage {
    WsMessage::text(text.to_string())
}

fn broadcast_from(origin: Option<&str>, text: &str) -> Broadcast {
    Broadcast {
        origin: origin.map(str::to_string),
        frame: frame(text),
    }
}

fn drain(rx: &mut Receiver<WsMessage>) -> Vec<WsMessage> {
    let mut out = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        out.push(msg);
    }
    out
}

async fn wait_for_count(handle: &HubHandle, expected: usize) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while handle.connected_clients() != expected {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| {
        panic!(
            "expected {} clients, hub reports {}",
            expected,
            handle.connected_clients()
        )
    });
}

#[test]
fn test_hub_new() {
    let (hub, handle) = Hub::new(&settings(false));
    assert!(hub.clients.is_empty());
    assert_eq!(handle.connected_clients(), 0);
}

#[test]
fn test_hub_register_and_unregister_client() {
    let (mut hub, handle) = Hub::new(&settings(false));
    let (client, _rx) = Client::channel(4);
    let client_id = client.id.clone();
    let lifecycle = client.lifecycle.clone();

    hub.register(client);
    assert!(hub.clients.contains_key(&client_id));
    assert_eq!(handle.connected_clients(), 1);

    hub.unregister(&client_id);
    assert!(!hub.clients.contains_key(&client_id));
    assert_eq!(handle.connected_clients(), 0);
    assert_eq!(lifecycle.state(), ClientState::Closing);
}

#[test]
fn test_double_unregister_is_noop() {
    let (mut hub, handle) = Hub::new(&settings(false));
    let (a, _rx_a) = Client::channel(4);
    let (b, _rx_b) = Client::channel(4);
    let a_id = a.id.clone();
    hub.register(a);
    hub.register(b);

    hub.unregister(&a_id);
    hub.unregister(&a_id);

    assert_eq!(hub.clients.len(), 1);
    assert_eq!(handle.connected_clients(), 1);
}

#[test]
fn test_unregister_unknown_client_is_noop() {
    let (mut hub, _handle) = Hub::new(&settings(false));
    hub.unregister(&"never-registered".to_string());
    assert!(hub.clients.is_empty());
}

#[test]
fn test_broadcast_reaches_exactly_registered_clients() {
    let (mut hub, _handle) = Hub::new(&settings(false));

    let mut receivers = Vec::new();
    for _ in 0..5 {
        let (client, rx) = Client::channel(4);
        hub.register(client);
        receivers.push(rx);
    }
    let (_outsider, mut outsider_rx) = Client::channel(4);

    hub.broadcast(broadcast_from(None, "hello"));

    let (late, mut late_rx) = Client::channel(4);
    hub.register(late);

    for rx in receivers.iter_mut() {
        assert_eq!(drain(rx), vec![frame("hello")]);
    }
    assert!(drain(&mut outsider_rx).is_empty());
    assert!(drain(&mut late_rx).is_empty());
}

#[test]
fn test_broadcast_skips_origin_by_default() {
    let (mut hub, _handle) = Hub::new(&settings(false));
    let (alice, mut alice_rx) = Client::channel(4);
    let (bob, mut bob_rx) = Client::channel(4);
    let alice_id = alice.id.clone();
    hub.register(alice);
    hub.register(bob);

    hub.broadcast(broadcast_from(Some(&alice_id), "hi"));

    assert!(drain(&mut alice_rx).is_empty());
    assert_eq!(drain(&mut bob_rx), vec![frame("hi")]);
}

#[test]
fn test_broadcast_echoes_origin_when_enabled() {
    let (mut hub, _handle) = Hub::new(&settings(true));
    let (alice, mut alice_rx) = Client::channel(4);
    let (bob, mut bob_rx) = Client::channel(4);
    let alice_id = alice.id.clone();
    hub.register(alice);
    hub.register(bob);

    hub.broadcast(broadcast_from(Some(&alice_id), "hi"));

    assert_eq!(drain(&mut alice_rx), vec![frame("hi")]);
    assert_eq!(drain(&mut bob_rx), vec![frame("hi")]);
}

#[test]
fn test_envelope_delivered_byte_identical() {
    let (mut hub, _handle) = Hub::new(&settings(false));
    let (alice, mut alice_rx) = Client::channel(4);
    let (bob, mut bob_rx) = Client::channel(4);
    let (carol, mut carol_rx) = Client::channel(4);
    let alice_id = alice.id.clone();
    hub.register(alice);
    hub.register(bob);
    hub.register(carol);

    let envelope = Envelope::new("1", MessageKind::Message, "alice", "hi");
    let sent = envelope.to_frame().unwrap();
    hub.broadcast(Broadcast {
        origin: Some(alice_id),
        frame: sent.clone(),
    });

    let expected = r#"{"id":"1","type":"message","from":"alice","data":"hi"}"#;
    for rx in [&mut bob_rx, &mut carol_rx] {
        let received = drain(rx);
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].clone().into_data(), sent.clone().into_data());
        assert_eq!(received[0].to_text().unwrap(), expected);
    }
    assert!(drain(&mut alice_rx).is_empty());
}

#[test]
fn test_slow_client_is_evicted_and_others_keep_receiving() {
    let (mut hub, handle) = Hub::new(&settings(false));
    let (stalled, mut stalled_rx) = Client::channel(1);
    let (healthy, mut healthy_rx) = Client::channel(8);
    let stalled_id = stalled.id.clone();
    let stalled_lifecycle = stalled.lifecycle.clone();
    hub.register(stalled);
    hub.register(healthy);

    hub.broadcast(broadcast_from(None, "first"));
    // stalled queue is now full
    hub.broadcast(broadcast_from(None, "second"));

    assert!(!hub.clients.contains_key(&stalled_id));
    assert_eq!(handle.connected_clients(), 1);
    assert_eq!(stalled_lifecycle.state(), ClientState::Closing);

    hub.broadcast(broadcast_from(None, "third"));

    assert_eq!(
        drain(&mut healthy_rx),
        vec![frame("first"), frame("second"), frame("third")]
    );
    assert_eq!(drain(&mut stalled_rx), vec![frame("first")]);
}

#[test]
fn test_broadcast_to_closed_queue_evicts_client() {
    let (mut hub, _handle) = Hub::new(&settings(false));
    let (client, rx) = Client::channel(4);
    let client_id = client.id.clone();
    hub.register(client);
    drop(rx);

    hub.broadcast(broadcast_from(None, "anyone?"));
    assert!(!hub.clients.contains_key(&client_id));
}

#[tokio::test]
async fn test_run_loop_fans_out_in_order() {
    let (hub, handle) = Hub::new(&settings(false));
    let shutdown = Shutdown::new();
    let task = tokio::spawn(hub.run(shutdown.clone()));

    let (a, mut a_rx) = Client::channel(8);
    let (b, mut b_rx) = Client::channel(8);
    handle.register(a).unwrap();
    handle.register(b).unwrap();
    wait_for_count(&handle, 2).await;

    for text in ["one", "two", "three"] {
        handle.broadcast(None, frame(text)).unwrap();
    }

    for rx in [&mut a_rx, &mut b_rx] {
        for text in ["one", "two", "three"] {
            assert_eq!(rx.recv().await, Some(frame(text)));
        }
    }

    shutdown.trigger();
    task.await.unwrap();
}

#[tokio::test]
async fn test_no_delivery_after_unregister() {
    let (hub, handle) = Hub::new(&settings(false));
    let shutdown = Shutdown::new();
    let task = tokio::spawn(hub.run(shutdown.clone()));

    let (leaving, mut leaving_rx) = Client::channel(8);
    let (staying, mut staying_rx) = Client::channel(8);
    let leaving_id = leaving.id.clone();
    handle.register(leaving).unwrap();
    handle.register(staying).unwrap();
    wait_for_count(&handle, 2).await;

    // submitted back to back: the loop decides the order
    handle.unregister(&leaving_id).unwrap();
    handle.broadcast(None, frame("racing")).unwrap();
    wait_for_count(&handle, 1).await;

    handle.broadcast(None, frame("late")).unwrap();
    assert_eq!(staying_rx.recv().await, Some(frame("racing")));
    assert_eq!(staying_rx.recv().await, Some(frame("late")));

    // the queue closes once the hub drops the client
    let mut seen = Vec::new();
    while let Some(msg) = leaving_rx.recv().await {
        seen.push(msg);
    }
    assert!(!seen.contains(&frame("late")));
    assert!(seen.len() <= 1);

    shutdown.trigger();
    task.await.unwrap();
}

#[tokio::test]
async fn test_shutdown_closes_every_client() {
    let (hub, handle) = Hub::new(&settings(false));
    let shutdown = Shutdown::new();
    let task = tokio::spawn(hub.run(shutdown.clone()));

    let (client, mut rx) = Client::channel(8);
    let lifecycle = client.lifecycle.clone();
    handle.register(client).unwrap();
    wait_for_count(&handle, 1).await;

    shutdown.trigger();
    task.await.unwrap();

    assert_eq!(handle.connected_clients(), 0);
    assert!(lifecycle.is_closing());
    assert_eq!(rx.recv().await, None);
    assert!(handle.broadcast(None, frame("after")).is_err());
}

#[tokio::test]
async fn test_hub_stops_when_handles_dropped() {
    let (hub, handle) = Hub::new(&settings(false));
    let task = tokio::spawn(hub.run(Shutdown::new()));
    drop(handle);
    tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .expect("hub should stop")
        .unwrap();
}

#[test]
fn test_envelope_wire_format() {
    let envelope = Envelope::new("1", MessageKind::Message, "alice", "hi");
    assert_eq!(
        envelope.to_json().unwrap(),
        r#"{"id":"1","type":"message","from":"alice","data":"hi"}"#
    );
}

#[test]
fn test_envelope_keeps_unknown_kind() {
    let raw = br#"{"id":"7","type":"text","from":"x","data":"hello"}"#;
    let envelope = Envelope::parse(raw).unwrap();
    assert_eq!(envelope.kind(), &MessageKind::Other("text".to_string()));
    assert_eq!(envelope.to_json().unwrap().as_bytes(), &raw[..]);
}

#[test]
fn test_envelope_link_constructor() {
    let envelope = Envelope::link("bob", "/files/report.pdf");
    assert_eq!(envelope.kind(), &MessageKind::Link);
    assert_eq!(envelope.sender(), "bob");
    assert_eq!(envelope.data(), "/files/report.pdf");
    assert!(!envelope.id().is_empty());

    let parsed = Envelope::parse(envelope.to_json().unwrap().as_bytes()).unwrap();
    assert_eq!(parsed, envelope);
}

#[test]
fn test_envelope_message_constructor() {
    let first = Envelope::message("alice", "hi");
    let second = Envelope::message("alice", "hi");
    assert_eq!(first.kind(), &MessageKind::Message);
    assert_eq!(first.sender(), "alice");
    assert_eq!(first.data(), "hi");
    assert_ne!(first.id(), second.id());

    let json: serde_json::Value = serde_json::from_str(&first.to_json().unwrap()).unwrap();
    assert_eq!(json["type"], "message");
}

#[test]
fn test_envelope_parse_rejects_missing_fields() {
    assert!(Envelope::parse(br#"{"id":"1","type":"message"}"#).is_err());
}
