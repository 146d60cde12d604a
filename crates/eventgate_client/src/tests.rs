use super::{Category, Client, ClientId, DELIVERY_QUEUE_CAPACITY, Frame};
use std::sync::Arc;

#[test]
fn test_client_new() {
    let (client, _rx) = Client::new(ClientId::new(7), "u1", Category::all());
    assert_eq!(client.id, ClientId::new(7));
    assert_eq!(client.subject, "u1");
    assert!(client.category.is_wildcard());
    assert_eq!(client.sender.max_capacity(), DELIVERY_QUEUE_CAPACITY);
}

#[test]
fn test_client_id_display() {
    assert_eq!(ClientId::new(42).to_string(), "client-42");
    assert_eq!(ClientId::new(42).get(), 42);
}

#[test]
fn test_category_from_query_defaults_to_wildcard() {
    assert_eq!(Category::from_query(None), Category::all());
    assert_eq!(Category::from_query(Some("")), Category::all());
    assert_eq!(Category::from_query(Some(" sports")).as_str(), " sports");
    assert_eq!(Category::from_query(Some("sports")).as_str(), "sports");
    assert!(!Category::from_query(Some("sports")).is_wildcard());
}

#[test]
fn test_frame_drops_empty_event_name() {
    assert_eq!(Frame::new(Some(String::new()), "x").event, None);
    assert_eq!(Frame::new(Some("sports".into()), "x").event.as_deref(), Some("sports"));
}

#[test]
fn test_client_info_mirrors_routing_attributes() {
    let (client, _rx) = Client::new(ClientId::new(1), "u2", Category::from_query(Some("sports")));
    let info = client.info();
    assert_eq!(info.id, client.id);
    assert_eq!(info.subject, "u2");
    assert_eq!(info.category.as_str(), "sports");
}

#[tokio::test]
async fn test_queue_closes_when_client_dropped() {
    let (client, mut rx) = Client::new(ClientId::new(1), "u1", Category::all());
    client.sender.send(Arc::new(Frame::new(None, "hello"))).await.unwrap();
    drop(client);

    assert_eq!(rx.recv().await.unwrap().data, "hello");
    assert!(rx.recv().await.is_none());
}
