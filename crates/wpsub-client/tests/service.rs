#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use bytes::Bytes;
use wpsub_client::{Message, ServiceClient};

async fn client(status: u16) -> (ServiceClient, common::Stub) {
    let (addr, stub) = common::start_stub(status).await;
    let c = ServiceClient::from_connection_string(&common::connection_string(addr), "chat").unwrap();
    (c, stub)
}

#[tokio::test]
async fn broadcast_labels_content_type() {
    let (c, stub) = client(202).await;

    c.send_to_all(Message::Json(r#"{"a":1}"#.into()), &["c9".to_string()])
        .await
        .unwrap();
    let last = stub.last();
    assert_eq!(last.method, "POST");
    assert_eq!(last.path, "/api/hubs/chat/:send");
    assert_eq!(last.query, "api-version=2020-10-01&excluded=c9");
    assert_eq!(last.content_type.as_deref(), Some("application/json"));
    assert_eq!(last.body, Bytes::from(r#"{"a":1}"#));

    c.send_to_user("bob", Message::Text("hi".into())).await.unwrap();
    assert_eq!(stub.last().content_type.as_deref(), Some("text/plain"));

    c.send_to_connection("c1", Message::Binary(Bytes::from_static(&[1, 2])))
        .await
        .unwrap();
    assert_eq!(stub.last().content_type.as_deref(), Some("application/octet-stream"));
    assert_eq!(stub.last().path, "/api/hubs/chat/connections/c1/:send");
}

#[tokio::test]
async fn send_requires_accepted() {
    let (c, _stub) = client(200).await;
    let err = c
        .send_to_group("g1", Message::Text("x".into()), &[])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "UNEXPECTED_STATUS");
}

#[tokio::test]
async fn existence_probes() {
    let (c, stub) = client(200).await;
    assert!(c.has_user("bob").await.unwrap());
    assert!(c.has_group("g1").await.unwrap());

    stub.respond_with(404);
    assert!(!c.has_connection("c1").await.unwrap());
    assert!(!c.has_user_in_group("g1", "bob").await.unwrap());
    assert_eq!(stub.last().path, "/api/hubs/chat/users/bob/groups/g1");
}

#[tokio::test]
async fn membership_paths_are_encoded() {
    let (c, stub) = client(202).await;
    c.add_user_to_group("my group", "bob").await.unwrap();
    assert_eq!(stub.last().method, "PUT");
    assert_eq!(stub.last().path, "/api/hubs/chat/users/bob/groups/my%20group");

    c.remove_connection_from_group("g1", "c1").await.unwrap();
    assert_eq!(stub.last().method, "DELETE");
    assert_eq!(stub.last().path, "/api/hubs/chat/groups/g1/connections/c1");

    c.remove_user_from_all_groups("bob").await.unwrap();
    assert_eq!(stub.last().path, "/api/hubs/chat/users/bob/groups");
}

#[tokio::test]
async fn close_connection_with_reason() {
    let (c, stub) = client(200).await;
    c.close_connection("c1", Some("bye")).await.unwrap();
    let last = stub.last();
    assert_eq!(last.method, "DELETE");
    assert_eq!(last.query, "api-version=2020-10-01&reason=bye");
}

#[tokio::test]
async fn health_probe() {
    let (c, stub) = client(200).await;
    assert!(c.is_service_healthy().await);
    assert_eq!(stub.last().path, "/api/health");

    stub.respond_with(503);
    assert!(!c.is_service_healthy().await);
}
