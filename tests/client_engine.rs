//! Integration tests for the client call lifecycle.
//!
//! A scripted transport stands in for the wire so the engine-side
//! behaviour (timeout enforcement, progress routing, result decoding) can
//! be observed in isolation, plus loopback tests against a real handler.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use conduit_mcp::client::{
    BoxFuture, CallOptions, LoopbackTransport, McpClient, PeerNotification, SseDecoder, Transport,
};
use conduit_mcp::error::Error;
use conduit_mcp::mcp::handler::{McpHandler, ServerInfo};
use conduit_mcp::provider::{CapabilityProvider, Tool};
use serde_json::{json, Value};
use tokio::sync::broadcast;

/// Transport that delays its reply, optionally emitting a progress event
/// for the request's token first.
struct ScriptedTransport {
    delay: Duration,
    result: Value,
    events: broadcast::Sender<PeerNotification>,
}

impl ScriptedTransport {
    fn new(delay: Duration, result: Value) -> Arc<Self> {
        let (events, _) = broadcast::channel(16);
        Arc::new(Self {
            delay,
            result,
            events,
        })
    }
}

impl Transport for ScriptedTransport {
    fn send_request(&self, envelope: Value) -> BoxFuture<'_, Result<Value, Error>> {
        Box::pin(async move {
            if let Some(token) = envelope["params"]["_meta"]["progressToken"].as_str() {
                let _ = self.events.send(PeerNotification {
                    method: "notifications/progress".to_string(),
                    params: json!({
                        "progressToken": token,
                        "progress": 0.5,
                        "total": 1.0,
                        "message": "halfway",
                    }),
                });
            }
            tokio::time::sleep(self.delay).await;
            Ok(json!({
                "jsonrpc": "2.0",
                "id": envelope["id"],
                "result": self.result,
            }))
        })
    }

    fn send_notification(&self, _envelope: Value) -> BoxFuture<'_, Result<(), Error>> {
        Box::pin(async { Ok(()) })
    }

    fn events(&self) -> broadcast::Receiver<PeerNotification> {
        self.events.subscribe()
    }
}

#[tokio::test]
async fn test_client_enforces_timeout_independently_of_transport() {
    let transport = ScriptedTransport::new(
        Duration::from_millis(150),
        json!({"content": []}),
    );
    let client = McpClient::new(transport as Arc<dyn Transport>);

    let err = client
        .call_tool_mcp(
            "slow",
            json!({}),
            CallOptions::default().with_timeout(Duration::from_millis(50)),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Transport(_)));
    assert!(err.to_string().contains("timed out"));
}

#[tokio::test]
async fn test_progress_handler_sentinel_and_events() {
    let transport = ScriptedTransport::new(
        Duration::from_millis(30),
        json!({"content": []}),
    );
    let client = McpClient::new(transport as Arc<dyn Transport>);

    let captured: Arc<Mutex<Vec<(f64, Option<f64>, Option<String>)>>> =
        Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&captured);

    client
        .call_tool_mcp(
            "slow",
            json!({}),
            CallOptions::default()
                .with_timeout(Duration::from_secs(5))
                .with_progress_handler(move |progress, total, message| {
                    sink.lock().unwrap().push((progress, total, message));
                }),
        )
        .await
        .unwrap();

    let captured = captured.lock().unwrap();
    assert!(!captured.is_empty());
    assert_eq!(captured[0].2.as_deref(), Some("request started"));
    assert!(captured
        .iter()
        .any(|(_, _, message)| message.as_deref() == Some("halfway")));
}

#[tokio::test]
async fn test_missing_content_field_is_validation_error() {
    // structuredContent alone is not enough: the content field is
    // mandatory even when empty.
    let transport = ScriptedTransport::new(
        Duration::ZERO,
        json!({"structuredContent": {"ok": true}}),
    );
    let client = McpClient::new(transport as Arc<dyn Transport>);

    let err = client
        .call_tool_mcp("t", json!({}), CallOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert!(err.to_string().contains("content"));
}

#[tokio::test]
async fn test_empty_content_array_is_valid() {
    let transport = ScriptedTransport::new(Duration::ZERO, json!({"content": []}));
    let client = McpClient::new(transport as Arc<dyn Transport>);

    let outcome = client
        .call_tool_mcp("t", json!({}), CallOptions::default())
        .await
        .unwrap();
    assert!(outcome.content.is_empty());
}

#[tokio::test]
async fn test_is_error_surfaces_as_thrown_error() {
    let transport = ScriptedTransport::new(
        Duration::ZERO,
        json!({
            "content": [{"type": "text", "text": "disk on fire"}],
            "isError": true,
        }),
    );
    let client = McpClient::new(transport as Arc<dyn Transport>);

    let err = client
        .call_tool_mcp("t", json!({}), CallOptions::default())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("disk on fire"));
}

// =============================================================================
// Loopback: client against a real handler
// =============================================================================

fn loopback() -> (McpClient, Arc<LoopbackTransport>) {
    let mut provider = CapabilityProvider::new("loop");
    provider
        .add_tool(
            Tool::new("answer", json!({"type": "object"}), |_| {
                Ok(json!({
                    "content": [{"type": "text", "text": "42"}],
                    "structuredContent": {"result": 42},
                }))
            })
            .with_output_schema(json!({
                "type": "object",
                "properties": {"result": {"type": "integer"}}
            })),
        )
        .unwrap();
    let handler = Arc::new(McpHandler::new(provider, ServerInfo::new("loop", "1.0.0")));
    let transport = LoopbackTransport::new(handler);
    (
        McpClient::new(Arc::clone(&transport) as Arc<dyn Transport>),
        transport,
    )
}

#[tokio::test]
async fn test_structured_content_round_trip() {
    let (client, _transport) = loopback();
    client.initialize().await.unwrap();
    client.list_tools().await.unwrap();

    let outcome = client
        .call_tool_mcp("answer", json!({}), CallOptions::default())
        .await
        .unwrap();

    let data: i64 = outcome
        .data::<serde_json::Map<String, Value>>()
        .unwrap()["result"]
        .as_i64()
        .unwrap();
    assert_eq!(data, 42);
    assert!(outcome.output_schema.is_some());
}

#[tokio::test]
async fn test_meta_reaches_server_and_returns() {
    let (client, _transport) = loopback();
    let outcome = client
        .call_tool_mcp(
            "answer",
            json!({}),
            CallOptions::default().with_meta(json!({"traceId": "t-7"})),
        )
        .await
        .unwrap();
    // The loopback handler echoes _meta; the outcome's structured data is
    // unaffected by the side-channel.
    assert_eq!(outcome.text(), "42");
}

#[tokio::test]
async fn test_request_inversion_round_trip() {
    let (client, _transport) = loopback();
    client.on_sampling(|params| {
        Ok(json!({
            "role": "assistant",
            "content": [{"type": "text", "text": format!(
                "saw {} messages",
                params["messages"].as_array().map_or(0, Vec::len)
            )}],
            "model": "mock",
            "stopReason": "endTurn",
        }))
    });

    // Whatever owns the transport relays the peer's request here and
    // writes the returned value straight back.
    let reply = client
        .handle_notification(
            "sampling/createMessage",
            json!({"messages": [{"role": "user", "content": "hi"}]}),
        )
        .unwrap();
    assert_eq!(reply["content"][0]["text"], "saw 1 messages");
}

// =============================================================================
// SSE reassembly at the transport boundary
// =============================================================================

#[test]
fn test_sse_split_data_lines_reassemble() {
    let mut decoder = SseDecoder::new();
    assert!(decoder.push_line("data: {\"n\":\n").is_none());
    assert!(decoder.push_line("data: 2}\n").is_none());
    let event = decoder.push_line("\n").unwrap();
    assert_eq!(event, json!({"n": 2}));
}

#[test]
fn test_sse_non_json_payload_becomes_text_block() {
    let mut decoder = SseDecoder::new();
    decoder.push_line("data: [unparseable");
    let event = decoder.push_line("").unwrap();
    assert_eq!(event["type"], "text");
    assert_eq!(event["text"], "[unparseable");
}
