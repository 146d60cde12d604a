use std::collections::BTreeSet;
use std::time::Duration;

use eventgate_client::{Category, Client, ClientId};
use tokio::time::timeout;

use super::{Broker, BrokerError, BrokerHandle, Message, Registry, Route, Subscription};

const WAIT: Duration = Duration::from_secs(2);

async fn next_data(sub: &mut Subscription) -> Option<String> {
    timeout(WAIT, sub.recv())
        .await
        .expect("timed out waiting for a delivery")
        .map(|frame| frame.data.clone())
}

fn category(name: &str) -> Category {
    Category::from_query(Some(name))
}

async fn member_ids(broker: &BrokerHandle) -> BTreeSet<ClientId> {
    broker
        .snapshot()
        .await
        .unwrap()
        .into_iter()
        .map(|info| info.id)
        .collect()
}

#[test]
fn test_message_route_precedence() {
    let mut msg = Message {
        content: "x".into(),
        user: Some("u1".into()),
        category: Some("sports".into()),
    };
    assert_eq!(msg.route(), Route::Subject("u1"));

    msg.user = Some(String::new());
    assert_eq!(msg.route(), Route::Category("sports"));

    msg.category = None;
    assert_eq!(msg.route(), Route::All);
}

#[test]
fn test_message_decodes_capitalised_fields() {
    let msg: Message =
        serde_json::from_str(r#"{"Content":"hello","User":"u1","Type":"sports"}"#).unwrap();
    assert_eq!(msg.content, "hello");
    assert_eq!(msg.user.as_deref(), Some("u1"));
    assert_eq!(msg.category.as_deref(), Some("sports"));

    let msg: Message = serde_json::from_str(r#"{"Content":"hello"}"#).unwrap();
    assert_eq!(msg, Message::broadcast("hello"));
}

#[test]
fn test_message_without_content_is_rejected() {
    assert!(serde_json::from_str::<Message>(r#"{"User":"u1"}"#).is_err());
    assert!(serde_json::from_str::<Message>("not json").is_err());
}

#[test]
fn test_message_frame_uses_category_as_event_name() {
    let frame = Message::to_category("y", "sports").frame();
    assert_eq!(frame.event.as_deref(), Some("sports"));
    assert_eq!(frame.data, "y");

    assert_eq!(Message::broadcast("z").frame().event, None);
}

#[test]
fn test_registry_insert_and_remove() {
    let mut registry = Registry::new();
    let (client, _rx) = Client::new(ClientId::new(1), "u1", Category::all());

    assert!(registry.insert(client).is_none());
    assert!(registry.contains(ClientId::new(1)));
    assert_eq!(registry.len(), 1);

    assert!(registry.remove(ClientId::new(1)).is_some());
    assert!(registry.remove(ClientId::new(1)).is_none());
    assert!(registry.remove(ClientId::new(99)).is_none());
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_registry_remove_closes_queue() {
    let mut registry = Registry::new();
    let (client, mut rx) = Client::new(ClientId::new(1), "u1", Category::all());
    registry.insert(client);

    drop(registry.remove(ClientId::new(1)));
    assert!(timeout(WAIT, rx.recv()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_registry_duplicate_insert_returns_replaced_client() {
    let mut registry = Registry::new();
    let (first, mut first_rx) = Client::new(ClientId::new(1), "u1", Category::all());
    let (second, _second_rx) = Client::new(ClientId::new(1), "u2", Category::all());

    registry.insert(first);
    let replaced = registry.insert(second).expect("first client replaced");
    assert_eq!(replaced.subject, "u1");
    drop(replaced);

    assert!(timeout(WAIT, first_rx.recv()).await.unwrap().is_none());
    assert_eq!(registry.snapshot()[0].subject, "u2");
}

#[tokio::test]
async fn test_registry_fan_out_counts_matches() {
    let mut registry = Registry::new();
    let (a, _a_rx) = Client::new(ClientId::new(1), "u1", Category::all());
    let (b, _b_rx) = Client::new(ClientId::new(2), "u2", category("sports"));
    registry.insert(a);
    registry.insert(b);

    assert_eq!(registry.fan_out(&Message::to_subject("x", "u1")), 1);
    assert_eq!(registry.fan_out(&Message::to_category("y", "sports")), 1);
    assert_eq!(registry.fan_out(&Message::to_category("y", "news")), 0);
    assert_eq!(registry.fan_out(&Message::broadcast("z")), 2);
}

#[tokio::test]
async fn test_two_clients_routing_scenario() {
    let broker = Broker::start();
    let mut a = broker.subscribe("u1", Category::all()).unwrap();
    let mut b = broker.subscribe("u2", category("sports")).unwrap();

    broker.publish(Message::to_subject("x", "u1")).unwrap();
    broker.publish(Message::to_category("y", "sports")).unwrap();
    broker.publish(Message::broadcast("z")).unwrap();

    assert_eq!(next_data(&mut a).await.as_deref(), Some("x"));
    assert_eq!(next_data(&mut a).await.as_deref(), Some("z"));
    assert_eq!(next_data(&mut b).await.as_deref(), Some("y"));
    assert_eq!(next_data(&mut b).await.as_deref(), Some("z"));
}

#[tokio::test]
async fn test_subject_target_ignores_shared_category() {
    let broker = Broker::start();
    let mut alice_sports = broker.subscribe("alice", category("sports")).unwrap();
    let mut alice_all = broker.subscribe("alice", Category::all()).unwrap();
    let mut bob_sports = broker.subscribe("bob", category("sports")).unwrap();

    broker
        .publish(Message {
            content: "for alice".into(),
            user: Some("alice".into()),
            category: Some("sports".into()),
        })
        .unwrap();
    broker.publish(Message::broadcast("marker")).unwrap();

    assert_eq!(next_data(&mut alice_sports).await.as_deref(), Some("for alice"));
    assert_eq!(next_data(&mut alice_all).await.as_deref(), Some("for alice"));
    assert_eq!(next_data(&mut bob_sports).await.as_deref(), Some("marker"));
}

#[tokio::test]
async fn test_category_excludes_wildcard_and_other_categories() {
    let broker = Broker::start();
    let mut sports_one = broker.subscribe("u1", category("sports")).unwrap();
    let mut sports_two = broker.subscribe("u2", category("sports")).unwrap();
    let mut wildcard = broker.subscribe("u3", Category::all()).unwrap();
    let mut news = broker.subscribe("u4", category("news")).unwrap();

    broker.publish(Message::to_category("goal", "sports")).unwrap();
    broker.publish(Message::broadcast("marker")).unwrap();

    assert_eq!(next_data(&mut sports_one).await.as_deref(), Some("goal"));
    assert_eq!(next_data(&mut sports_two).await.as_deref(), Some("goal"));
    assert_eq!(next_data(&mut wildcard).await.as_deref(), Some("marker"));
    assert_eq!(next_data(&mut news).await.as_deref(), Some("marker"));
}

#[tokio::test]
async fn test_broadcast_reaches_every_client() {
    let broker = Broker::start();
    let mut subs: Vec<_> = ["all", "sports", "news", "weather"]
        .into_iter()
        .enumerate()
        .map(|(i, cat)| broker.subscribe(format!("u{i}"), category(cat)).unwrap())
        .collect();

    broker.publish(Message::broadcast("hello")).unwrap();

    for sub in subs.iter_mut() {
        assert_eq!(next_data(sub).await.as_deref(), Some("hello"));
    }
}

#[tokio::test]
async fn test_deregister_twice_and_unknown_is_noop() {
    let broker = Broker::start();
    let keep = broker.subscribe("u1", Category::all()).unwrap();
    let mut gone = broker.subscribe("u2", Category::all()).unwrap();
    let gone_id = gone.id();

    broker.deregister(gone_id).unwrap();
    broker.deregister(gone_id).unwrap();
    broker.deregister(ClientId::new(9_999)).unwrap();
    gone.close();
    gone.close();

    assert_eq!(member_ids(&broker).await, BTreeSet::from([keep.id()]));
    assert!(timeout(WAIT, gone.recv()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_stream_ends_after_deregistration() {
    let broker = Broker::start();
    let mut sub = broker.subscribe("u1", Category::all()).unwrap();

    sub.close();
    broker.publish(Message::broadcast("too late")).unwrap();

    assert_eq!(next_data(&mut sub).await, None);
    assert!(broker.snapshot().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_dropping_subscription_deregisters() {
    let broker = Broker::start();
    let sub = broker.subscribe("u1", Category::all()).unwrap();
    assert_eq!(broker.snapshot().await.unwrap().len(), 1);

    drop(sub);
    assert!(broker.snapshot().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_membership_tracks_register_and_deregister_sequence() {
    let broker = Broker::start();
    let mut expected = BTreeSet::new();
    let mut held = Vec::new();

    for i in 0..10 {
        let sub = broker.subscribe(format!("u{i}"), Category::all()).unwrap();
        broker.publish(Message::broadcast(format!("m{i}"))).unwrap();
        expected.insert(sub.id());
        held.push(sub);
    }
    for sub in held.iter_mut().step_by(3) {
        broker.publish(Message::to_category("noise", "sports")).unwrap();
        expected.remove(&sub.id());
        sub.close();
    }

    assert_eq!(member_ids(&broker).await, expected);
}

#[tokio::test]
async fn test_client_ids_are_unique() {
    let broker = Broker::start();
    let ids: BTreeSet<_> = (0..100).map(|_| broker.next_client_id()).collect();
    assert_eq!(ids.len(), 100);
}

#[tokio::test]
async fn test_per_client_order_matches_publish_order() {
    let broker = Broker::start();
    let mut slow = broker.subscribe("u1", Category::all()).unwrap();

    for i in 0..20 {
        broker.publish(Message::broadcast(i.to_string())).unwrap();
    }
    // Let the deliveries pile up behind the size-1 queue before reading.
    tokio::time::sleep(Duration::from_millis(50)).await;

    for i in 0..20 {
        assert_eq!(next_data(&mut slow).await, Some(i.to_string()));
    }
}

#[tokio::test]
async fn test_slow_client_does_not_block_others() {
    let broker = Broker::start();
    let _stalled = broker.subscribe("u1", Category::all()).unwrap();
    let mut fast = broker.subscribe("u2", Category::all()).unwrap();

    for i in 0..5 {
        broker.publish(Message::broadcast(i.to_string())).unwrap();
        assert_eq!(next_data(&mut fast).await, Some(i.to_string()));
    }
    assert_eq!(broker.snapshot().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_deregistration_cancels_pending_deliveries() {
    let broker = Broker::start();
    let mut sub = broker.subscribe("u1", Category::all()).unwrap();

    for i in 0..5 {
        broker.publish(Message::broadcast(i.to_string())).unwrap();
    }
    // Make sure the publishes have been fanned out before closing.
    broker.snapshot().await.unwrap();
    sub.close();

    let mut received = Vec::new();
    while let Some(data) = next_data(&mut sub).await {
        received.push(data);
    }
    // At most the frame already sitting in the size-1 queue gets through.
    assert!(received.len() <= 1, "received {received:?}");
}

#[tokio::test]
async fn test_shutdown_closes_all_streams() {
    let broker = Broker::start();
    let mut a = broker.subscribe("u1", Category::all()).unwrap();
    let mut b = broker.subscribe("u2", category("sports")).unwrap();

    broker.shutdown().unwrap();

    assert_eq!(next_data(&mut a).await, None);
    assert_eq!(next_data(&mut b).await, None);
    assert_eq!(
        broker.publish(Message::broadcast("late")),
        Err(BrokerError::Closed)
    );
    assert_eq!(broker.snapshot().await, Err(BrokerError::Closed));
    assert!(broker.is_closed());
    assert!(broker.subscribe("u3", Category::all()).is_err());
}

#[tokio::test]
async fn test_coordinator_stops_when_handles_dropped() {
    let (broker, handle) = Broker::new();
    let task = tokio::spawn(broker.run());

    handle.publish(Message::broadcast("nobody listening")).unwrap();
    drop(handle);

    timeout(WAIT, task).await.unwrap().unwrap();
}

async fn wait_for_pending(lane: &crate::delivery::Lane, expected: usize) {
    timeout(WAIT, async {
        while lane.pending() != expected {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("pending never reached {expected}, at {}", lane.pending()));
}

#[tokio::test]
async fn test_lane_counts_backlog_of_idle_reader() {
    use std::sync::Arc;

    use eventgate_client::Frame;

    use crate::delivery::Lane;

    let (client, mut rx) = Client::new(ClientId::new(1), "idle", Category::all());
    let mut lane = Lane::new(client.id, &client.sender);
    for i in 0..5 {
        lane.schedule(Arc::new(Frame::new(None, i.to_string())));
    }

    // One frame fits in the queue, the rest wait behind it.
    wait_for_pending(&lane, 4).await;
    assert_eq!(rx.recv().await.unwrap().data, "0");
    wait_for_pending(&lane, 3).await;

    drop(lane);
    drop(client);
    assert_eq!(rx.recv().await.unwrap().data, "1");
    assert!(rx.recv().await.is_none());
}
