//! Integration tests for MCP protocol handling.
//!
//! These tests verify the JSON-RPC 2.0 protocol implementation end to end:
//! parsing, method translation over a provider, error responses, and the
//! meta side-channel.

use conduit_mcp::mcp::handler::{McpHandler, ServerInfo};
use conduit_mcp::mcp::protocol::{
    parse_message, IncomingMessage, JsonRpcRequest, RequestId,
};
use conduit_mcp::provider::{
    CapabilityProvider, Prompt, PromptArgument, PromptMessage, Resource, ResourceContent, Tool,
};
use serde_json::{json, Value};

// =============================================================================
// Protocol Parsing Tests
// =============================================================================

#[test]
fn test_parse_initialize_request() {
    let json = r#"{
        "jsonrpc": "2.0",
        "id": 1,
        "method": "initialize",
        "params": {
            "protocolVersion": "2024-11-05",
            "capabilities": {},
            "clientInfo": {
                "name": "test-client",
                "version": "1.0.0"
            }
        }
    }"#;

    let result = parse_message(json);
    assert!(result.is_ok());

    if let IncomingMessage::Request(req) = result.unwrap() {
        assert_eq!(req.method, "initialize");
        assert_eq!(req.id, RequestId::Number(1));
    } else {
        panic!("Expected Request");
    }
}

#[test]
fn test_parse_tools_list_request() {
    let json = r#"{
        "jsonrpc": "2.0",
        "id": 2,
        "method": "tools/list",
        "params": {}
    }"#;

    let result = parse_message(json);
    assert!(result.is_ok());

    if let IncomingMessage::Request(req) = result.unwrap() {
        assert_eq!(req.method, "tools/list");
        assert_eq!(req.id, RequestId::Number(2));
    } else {
        panic!("Expected Request");
    }
}

#[test]
fn test_parse_notification() {
    let json = r#"{
        "jsonrpc": "2.0",
        "method": "notifications/initialized"
    }"#;

    let result = parse_message(json);
    assert!(result.is_ok());

    if let IncomingMessage::Notification(notif) = result.unwrap() {
        assert_eq!(notif.method, "notifications/initialized");
    } else {
        panic!("Expected Notification");
    }
}

#[test]
fn test_parse_invalid_json() {
    let json = "not valid json";

    let result = parse_message(json);
    assert!(result.is_err());
}

#[test]
fn test_parse_missing_jsonrpc_version() {
    let json = r#"{
        "id": 1,
        "method": "test"
    }"#;

    let result = parse_message(json);
    assert!(result.is_err());
}

// =============================================================================
// Method Translation Tests
// =============================================================================

fn sample_handler() -> McpHandler {
    let mut provider = CapabilityProvider::new("integration");

    provider
        .add_tool(
            Tool::new(
                "reverse",
                json!({
                    "type": "object",
                    "properties": {"text": {"type": "string"}},
                    "required": ["text"]
                }),
                |args| {
                    let text: String = args["text"]
                        .as_str()
                        .unwrap_or_default()
                        .chars()
                        .rev()
                        .collect();
                    Ok(json!({"content": [{"type": "text", "text": text}]}))
                },
            )
            .with_description("Reverse a string."),
        )
        .unwrap();

    provider
        .add_resource(Resource::new("docs://readme", "readme", |_| {
            Ok(ResourceContent::Text {
                text: "# conduit".to_string(),
                mime_type: Some("text/markdown".to_string()),
            })
        }))
        .unwrap();

    provider
        .add_prompt(
            Prompt::new("summarise", |args| {
                let subject = args["subject"].as_str().unwrap_or("it").to_string();
                Ok(vec![PromptMessage::user(format!("Summarise {subject}"))])
            })
            .with_arguments(vec![PromptArgument::required("subject")]),
        )
        .unwrap();

    McpHandler::new(provider, ServerInfo::new("integration", "1.0.0"))
        .with_instructions("Diagnostics only.")
}

fn send(handler: &McpHandler, id: i64, method: &str, params: Value) -> Value {
    handler.handle_value(&json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": params,
    }))
}

#[test]
fn test_full_session_flow() {
    let handler = sample_handler();

    let reply = send(&handler, 1, "initialize", json!({"protocolVersion": "2024-11-05"}));
    assert_eq!(reply["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(reply["result"]["instructions"], "Diagnostics only.");
    assert!(reply["result"]["capabilities"]["tools"].is_object());

    let reply = send(&handler, 2, "tools/list", json!({}));
    assert_eq!(reply["result"]["tools"][0]["name"], "reverse");

    let reply = send(
        &handler,
        3,
        "tools/call",
        json!({"name": "reverse", "arguments": {"text": "abc"}}),
    );
    assert_eq!(reply["result"]["content"][0]["text"], "cba");

    let reply = send(&handler, 4, "resources/read", json!({"uri": "docs://readme"}));
    assert_eq!(reply["result"]["contents"][0]["mimeType"], "text/markdown");

    let reply = send(
        &handler,
        5,
        "prompts/get",
        json!({"name": "summarise", "arguments": {"subject": "the report"}}),
    );
    assert_eq!(
        reply["result"]["messages"][0]["content"]["text"],
        "Summarise the report"
    );
}

#[test]
fn test_tools_call_without_name_is_invalid_params() {
    let handler = sample_handler();
    let reply = send(&handler, 7, "tools/call", json!({"arguments": {}}));
    assert_eq!(reply["error"]["code"], -32602);
    assert_eq!(reply["id"], 7);
}

#[test]
fn test_unknown_method_is_method_not_found() {
    let handler = sample_handler();
    let reply = send(&handler, 8, "conduit/unknown", json!({}));
    assert_eq!(reply["error"]["code"], -32601);
    assert_eq!(reply["id"], 8);
}

#[test]
fn test_missing_resource_and_prompt_codes() {
    let handler = sample_handler();

    let reply = send(&handler, 9, "resources/read", json!({"uri": "ghost://x"}));
    assert_eq!(reply["error"]["code"], -32002);

    let reply = send(&handler, 10, "prompts/get", json!({"name": "ghost"}));
    assert_eq!(reply["error"]["code"], -32001);
}

#[test]
fn test_meta_round_trips_byte_for_byte() {
    let handler = sample_handler();
    let meta = json!({
        "traceId": "trace-123",
        "user": {"id": 42, "roles": ["admin", "dev"]},
        "nested": {"deep": [1, 2, {"k": null}]}
    });

    let reply = send(
        &handler,
        11,
        "tools/call",
        json!({"name": "reverse", "arguments": {"text": "x"}, "_meta": meta}),
    );
    assert_eq!(reply["result"]["_meta"], meta);

    let reply = send(
        &handler,
        12,
        "completion/complete",
        json!({
            "ref": {"type": "ref/prompt", "name": "summarise"},
            "argument": {"name": "a", "value": ""},
            "_meta": meta
        }),
    );
    assert_eq!(reply["result"]["_meta"], meta);
    assert_eq!(reply["result"]["completion"]["values"], json!(["subject"]));
}

#[test]
fn test_request_via_typed_api_matches_value_api() {
    let handler = sample_handler();
    let req = JsonRpcRequest::new(RequestId::String("s-1".to_string()), "tools/list", None);
    let response = handler.handle_request(&req).unwrap();
    assert_eq!(response.id, RequestId::String("s-1".to_string()));
    assert_eq!(response.result["tools"][0]["name"], "reverse");
}
