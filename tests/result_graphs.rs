//! Result Graph Serialization Tests
//!
//! `#[derive(ResultNode)]` objects through the serializer and the
//! dispatcher: exposed fields, enums, timestamps, the depth ceiling and
//! cycle detection.

use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use turul_json_rpc_server::prelude::*;
use turul_json_rpc_server::{ResultSerializer, SerializationError};

#[derive(Debug, Clone, Copy, RpcEnum)]
enum Role {
    Admin = 10,
    Member = 20,
}

#[derive(Debug, Clone, Copy, RpcEnum)]
enum Presence {
    Online,
    Away,
}

#[derive(Clone, ResultNode)]
struct User {
    pub id: i64,
    #[result(rename = "displayName")]
    pub name: String,
    pub role: Role,
    pub presence: Presence,
    pub joined: chrono::DateTime<Utc>,
    pub tags: Vec<String>,
    #[allow(dead_code)]
    password_hash: String,
    #[result(expose)]
    score: f64,
}

#[derive(ResultNode)]
#[result(no_clone)]
struct Link {
    pub label: String,
    pub next: Mutex<Option<Arc<Link>>>,
}

impl Link {
    fn new(label: &str) -> Arc<Self> {
        Arc::new(Self {
            label: label.to_string(),
            next: Mutex::new(None),
        })
    }
}

/// `length` links, each pointing at the next
fn chain(length: usize) -> Arc<Link> {
    let head = Link::new("0");
    let mut tail = head.clone();
    for i in 1..length {
        let next = Link::new(&i.to_string());
        *tail.next.lock() = Some(next.clone());
        tail = next;
    }
    head
}

fn user() -> User {
    User {
        id: 7,
        name: "Ada".to_string(),
        role: Role::Admin,
        presence: Presence::Away,
        joined: Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(),
        tags: vec!["ops".to_string()],
        password_hash: "secret".to_string(),
        score: 1.5,
    }
}

#[test]
fn test_result_node_exposes_public_surface() {
    let json = ResultSerializer::default()
        .serialize(&user().to_result_value())
        .unwrap();

    assert_eq!(
        json,
        json!({
            "id": 7,
            "displayName": "Ada",
            "role": 10,
            "presence": "Away",
            "joined": "2024-05-01T08:00:00+00:00",
            "tags": ["ops"],
            "score": 1.5
        })
    );
}

#[test]
fn test_depth_ceiling() {
    let serializer = ResultSerializer::default();
    assert_eq!(serializer.max_depth(), 32);

    // Exactly the ceiling is fine
    assert!(serializer.serialize(&chain(32).to_result_value()).is_ok());

    match serializer.serialize(&chain(33).to_result_value()) {
        Err(SerializationError::DepthExceeded { max_depth, .. }) => assert_eq!(max_depth, 32),
        other => panic!("expected DepthExceeded, got {:?}", other),
    }

    let shallow = ResultSerializer::new(2);
    assert!(shallow.serialize(&chain(2).to_result_value()).is_ok());
    assert!(shallow.serialize(&chain(3).to_result_value()).is_err());
}

#[test]
fn test_cycle_is_detected() {
    let a = Link::new("a");
    let b = Link::new("b");
    *a.next.lock() = Some(b.clone());
    *b.next.lock() = Some(a.clone());

    match ResultSerializer::default().serialize(&a.to_result_value()) {
        Err(SerializationError::CycleDetected { type_name, path }) => {
            assert_eq!(type_name, "Link");
            assert_eq!(path, "$.next.next");
        }
        other => panic!("expected CycleDetected, got {:?}", other),
    }

    // Break the cycle so the Arcs can drop
    *b.next.lock() = None;
}

#[test]
fn test_shared_node_is_not_a_cycle() {
    let shared = Link::new("shared");
    let value = ResultValue::Sequence(vec![shared.to_result_value(), shared.to_result_value()]);

    let json = ResultSerializer::default().serialize(&value).unwrap();
    assert_eq!(
        json,
        json!([{"label": "shared", "next": null}, {"label": "shared", "next": null}])
    );
}

#[tokio::test]
async fn test_unserializable_result_becomes_internal_error() {
    let dispatcher = JsonRpcDispatcher::builder()
        .function("loop", |_: NoParams, _ctx: CallContext| async move {
            let a = Link::new("a");
            *a.next.lock() = Some(a.clone());
            Ok::<_, BoxError>(a)
        })
        .function("deep", |_: NoParams, _ctx: CallContext| async move {
            Ok::<_, BoxError>(chain(6))
        })
        .config(ServerConfig::default().with_max_result_depth(5))
        .build();

    let body = dispatcher
        .handle_value(json!([
            {"jsonrpc": "2.0", "method": "loop", "id": 1},
            {"jsonrpc": "2.0", "method": "deep", "id": 2}
        ]))
        .await
        .unwrap();

    for message in body.messages() {
        let error = message.error_object().unwrap();
        assert_eq!(error.code, INTERNAL_ERROR);
        assert_eq!(error.message, "Internal error");
    }
}

#[tokio::test]
async fn test_array_results_render_as_plain_lists() {
    let dispatcher = JsonRpcDispatcher::builder()
        .function("users", |_: NoParams, _ctx: CallContext| async move {
            let users: ArrayResult = vec![user(), user()].into_iter().collect();
            Ok::<_, BoxError>(users)
        })
        .build();

    let body = dispatcher
        .handle_value(json!({"jsonrpc": "2.0", "method": "users", "id": 1}))
        .await
        .unwrap();

    let result = body.messages()[0].result().unwrap();
    assert_eq!(result.as_array().unwrap().len(), 2);
    assert_eq!(result[1]["displayName"], "Ada");
    assert!(result[0].get("password_hash").is_none());
}
