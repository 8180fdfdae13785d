//! Client-side call engine.
//!
//! Transport-agnostic request lifecycle: timeout, cancellation, progress
//! routing, content-block decoding, and structured-result typing. The
//! engine also exposes the request/response inversion that lets a peer on
//! the far side of the transport issue sampling and elicitation requests
//! back through [`McpClient::handle_notification`] without a second
//! connection.

pub mod sampling;
pub mod sse;
pub mod transport;

pub use sampling::{sample, sample_step, SampleOutcome, SamplingOptions, SamplingPeer};
pub use sse::SseDecoder;
pub use transport::{BoxFuture, LoopbackTransport, PeerNotification, Transport, TransportFactory};

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::sync::broadcast;

use crate::error::{Error, Result};
use crate::mcp::protocol::{
    JsonRpcRequest, OutgoingNotification, RequestId, MCP_PROTOCOL_VERSION,
};
use crate::provider::Content;

/// Default per-call timeout when none is configured.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Callback invoked with `(progress, total, message)` updates.
pub type ProgressHandler = Arc<dyn Fn(f64, Option<f64>, Option<String>) + Send + Sync>;

/// Callback answering a peer-initiated sampling or elicitation request.
pub type PeerCallback = Arc<dyn Fn(Value) -> Result<Value> + Send + Sync>;

/// Per-call options.
#[derive(Clone, Default)]
pub struct CallOptions {
    /// Overall call budget; the engine enforces this independently of
    /// transport behaviour.
    pub timeout: Option<Duration>,
    /// Invoked for progress events carrying this call's token. The first
    /// invocation always uses the sentinel message `"request started"`.
    pub progress_handler: Option<ProgressHandler>,
    /// Opaque `_meta` to embed in the request.
    pub meta: Option<Value>,
}

impl CallOptions {
    /// Sets the call timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the progress handler.
    #[must_use]
    pub fn with_progress_handler(
        mut self,
        handler: impl Fn(f64, Option<f64>, Option<String>) + Send + Sync + 'static,
    ) -> Self {
        self.progress_handler = Some(Arc::new(handler));
        self
    }

    /// Sets the `_meta` side-channel.
    #[must_use]
    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }
}

/// Decoded result of a successful tool call.
#[derive(Debug, Clone)]
pub struct CallToolOutcome {
    /// Decoded content blocks (an empty array is valid).
    pub content: Vec<Content>,
    /// Raw structured result, when the tool produced one.
    pub structured_content: Option<Value>,
    /// The output schema cached from `tools/list`, when known.
    pub output_schema: Option<Value>,
}

impl CallToolOutcome {
    /// Decodes the structured result into a typed value.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the result carries no structured
    /// content or it does not decode as `T`.
    pub fn data<T: DeserializeOwned>(&self) -> Result<T> {
        let structured = self
            .structured_content
            .as_ref()
            .ok_or_else(|| Error::validation("tool result carries no structured content"))?;
        serde_json::from_value(structured.clone())
            .map_err(|e| Error::validation(format!("structured content does not decode: {e}")))
    }

    /// Concatenates all text blocks.
    #[must_use]
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(Content::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Transport-agnostic MCP client.
pub struct McpClient {
    factory: TransportFactory,
    transport: Arc<dyn Transport>,
    next_id: AtomicI64,
    default_timeout: Duration,
    output_schemas: RwLock<HashMap<String, Value>>,
    peer_capabilities: RwLock<Option<Value>>,
    sampling_callback: RwLock<Option<PeerCallback>>,
    elicitation_callback: RwLock<Option<PeerCallback>>,
}

impl McpClient {
    /// Creates a client over an existing transport.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        let shared = Arc::clone(&transport);
        Self::build(Arc::new(move || Arc::clone(&shared)), transport)
    }

    /// Creates a client from a transport factory.
    #[must_use]
    pub fn from_factory(factory: TransportFactory) -> Self {
        let transport = factory();
        Self::build(factory, transport)
    }

    fn build(factory: TransportFactory, transport: Arc<dyn Transport>) -> Self {
        Self {
            factory,
            transport,
            next_id: AtomicI64::new(1),
            default_timeout: DEFAULT_TIMEOUT,
            output_schemas: RwLock::new(HashMap::new()),
            peer_capabilities: RwLock::new(None),
            sampling_callback: RwLock::new(None),
            elicitation_callback: RwLock::new(None),
        }
    }

    /// Obtains a fresh client sharing the same transport factory.
    ///
    /// Callbacks and the default timeout carry over; the session state
    /// (negotiated capabilities, schema cache) starts clean.
    #[must_use]
    pub fn fresh(&self) -> Self {
        let transport = (self.factory)();
        Self {
            factory: Arc::clone(&self.factory),
            transport,
            next_id: AtomicI64::new(1),
            default_timeout: self.default_timeout,
            output_schemas: RwLock::new(HashMap::new()),
            peer_capabilities: RwLock::new(None),
            sampling_callback: RwLock::new(self.read_callback(&self.sampling_callback)),
            elicitation_callback: RwLock::new(self.read_callback(&self.elicitation_callback)),
        }
    }

    /// Sets the default per-call timeout.
    #[must_use]
    pub const fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Registers the callback answering peer sampling requests.
    pub fn on_sampling(&self, callback: impl Fn(Value) -> Result<Value> + Send + Sync + 'static) {
        *self
            .sampling_callback
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(Arc::new(callback));
    }

    /// Registers the callback answering peer elicitation requests.
    pub fn on_elicitation(&self, callback: impl Fn(Value) -> Result<Value> + Send + Sync + 'static) {
        *self
            .elicitation_callback
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(Arc::new(callback));
    }

    fn read_callback(&self, slot: &RwLock<Option<PeerCallback>>) -> Option<PeerCallback> {
        slot.read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Returns the peer's negotiated capabilities, once initialised.
    #[must_use]
    pub fn peer_capabilities(&self) -> Option<Value> {
        self.peer_capabilities
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn next_request_id(&self) -> RequestId {
        RequestId::Number(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Sends a request and unwraps the reply envelope.
    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let req = JsonRpcRequest::new(self.next_request_id(), method, Some(params));
        let envelope =
            serde_json::to_value(&req).map_err(|e| Error::message(e.to_string()))?;
        let reply = self.transport.send_request(envelope).await?;
        Self::unwrap_reply(&reply)
    }

    /// Sends a one-way notification.
    async fn notify(&self, method: &str, params: Option<Value>) -> Result<()> {
        let notif = OutgoingNotification::new(method, params);
        let envelope =
            serde_json::to_value(&notif).map_err(|e| Error::message(e.to_string()))?;
        self.transport.send_notification(envelope).await
    }

    /// Extracts the result from a reply envelope, mapping error envelopes
    /// onto the engine taxonomy.
    fn unwrap_reply(reply: &Value) -> Result<Value> {
        if let Some(error) = reply.get("error") {
            let code = error.get("code").and_then(Value::as_i64).unwrap_or(0);
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(match code {
                -32601 | -32001 | -32002 => Error::not_found(message.to_string()),
                _ => Error::message(format!("server error {code}: {message}")),
            });
        }
        reply
            .get("result")
            .cloned()
            .ok_or_else(|| Error::validation("reply carries neither result nor error"))
    }

    /// Performs the initialize handshake and sends
    /// `notifications/initialized`.
    ///
    /// # Errors
    ///
    /// Returns transport or protocol failures.
    pub async fn initialize(&self) -> Result<Value> {
        let params = json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": {
                "sampling": {"tools": {}},
                "elicitation": {},
                "roots": {"listChanged": true},
            },
            "clientInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            },
        });
        let result = self.request("initialize", params).await?;

        *self
            .peer_capabilities
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) =
            result.get("capabilities").cloned();

        self.notify("notifications/initialized", None).await?;
        Ok(result)
    }

    /// Pings the peer.
    ///
    /// # Errors
    ///
    /// Returns transport or protocol failures.
    pub async fn ping(&self) -> Result<()> {
        self.request("ping", json!({})).await.map(|_| ())
    }

    /// Lists the peer's tools, caching each declared output schema for
    /// later structured-result decoding.
    ///
    /// # Errors
    ///
    /// Returns transport or protocol failures, or a validation error when
    /// the reply is missing its `tools` field.
    pub async fn list_tools(&self) -> Result<Vec<Value>> {
        let result = self.request("tools/list", json!({})).await?;
        let tools = result
            .get("tools")
            .and_then(Value::as_array)
            .cloned()
            .ok_or_else(|| Error::validation("tools/list reply missing 'tools' field"))?;

        let mut schemas = self
            .output_schemas
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        for tool in &tools {
            if let (Some(name), Some(schema)) = (
                tool.get("name").and_then(Value::as_str),
                tool.get("outputSchema"),
            ) {
                schemas.insert(name.to_string(), schema.clone());
            }
        }

        Ok(tools)
    }

    /// Returns the output schema cached for a tool, if `list_tools` saw
    /// one.
    #[must_use]
    pub fn cached_output_schema(&self, name: &str) -> Option<Value> {
        self.output_schemas
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Calls a tool through the full MCP request lifecycle.
    ///
    /// The timeout is enforced by the engine regardless of transport
    /// behaviour: on expiry the call fails with a transport error even if
    /// the transport would eventually have returned. Progress events
    /// carrying this call's token invoke the progress handler while the
    /// call waits.
    ///
    /// # Errors
    ///
    /// - `Transport` on timeout or transport failure
    /// - `Validation` when the reply lacks a `content` field (an empty
    ///   array is valid, absence is not)
    /// - `Message` when the tool reports `isError: true`
    pub async fn call_tool_mcp(
        &self,
        name: &str,
        arguments: Value,
        options: CallOptions,
    ) -> Result<CallToolOutcome> {
        let progress_token = options
            .progress_handler
            .as_ref()
            .map(|_| uuid::Uuid::new_v4().to_string());

        let mut params = json!({"name": name, "arguments": arguments});
        let mut meta = options.meta.clone().unwrap_or_else(|| json!({}));
        if let Some(token) = &progress_token {
            if let Value::Object(map) = &mut meta {
                map.insert("progressToken".to_string(), json!(token));
            }
        }
        if !meta.as_object().is_some_and(serde_json::Map::is_empty) {
            params["_meta"] = meta;
        }

        if let Some(handler) = &options.progress_handler {
            handler(0.0, None, Some("request started".to_string()));
        }

        let req = JsonRpcRequest::new(self.next_request_id(), "tools/call", Some(params));
        let envelope =
            serde_json::to_value(&req).map_err(|e| Error::message(e.to_string()))?;

        let timeout = options.timeout.unwrap_or(self.default_timeout);
        let mut events = self.transport.events();
        let mut events_open = true;

        let request_fut = self.transport.send_request(envelope);
        tokio::pin!(request_fut);
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        let reply = loop {
            tokio::select! {
                reply = &mut request_fut => break reply?,

                () = &mut deadline => {
                    tracing::warn!(tool = name, ?timeout, "tool call timed out");
                    return Err(Error::transport(format!(
                        "call to tool '{name}' timed out after {timeout:?}"
                    )));
                }

                event = events.recv(), if events_open => {
                    match event {
                        Ok(event) => self.route_progress(
                            &event,
                            progress_token.as_deref(),
                            options.progress_handler.as_ref(),
                        ),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::debug!(skipped, "progress events lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => events_open = false,
                    }
                }
            }
        };

        let result = Self::unwrap_reply(&reply)?;
        self.decode_tool_result(name, &result)
    }

    /// Routes one transport event to the progress handler when it carries
    /// this call's token.
    fn route_progress(
        &self,
        event: &PeerNotification,
        token: Option<&str>,
        handler: Option<&ProgressHandler>,
    ) {
        let (Some(token), Some(handler)) = (token, handler) else {
            return;
        };
        if event.method != "notifications/progress" {
            return;
        }
        let event_token = event.params.get("progressToken").and_then(Value::as_str);
        if event_token != Some(token) {
            return;
        }
        let progress = event
            .params
            .get("progress")
            .and_then(Value::as_f64)
            .unwrap_or(0.0);
        let total = event.params.get("total").and_then(Value::as_f64);
        let message = event
            .params
            .get("message")
            .and_then(Value::as_str)
            .map(ToString::to_string);
        handler(progress, total, message);
    }

    /// Decodes a tools/call result into a typed outcome.
    fn decode_tool_result(&self, name: &str, result: &Value) -> Result<CallToolOutcome> {
        // Absence of the content field is a protocol violation; an empty
        // array is a perfectly valid result.
        let content_value = result
            .get("content")
            .ok_or_else(|| Error::validation("tool call reply missing 'content' field"))?;
        let content: Vec<Content> = serde_json::from_value(content_value.clone())
            .map_err(|e| Error::validation(format!("tool call content does not decode: {e}")))?;

        if result
            .get("isError")
            .and_then(Value::as_bool)
            .unwrap_or(false)
        {
            let text = content
                .iter()
                .filter_map(Content::as_text)
                .collect::<Vec<_>>()
                .join("\n");
            let message = if text.is_empty() {
                format!("tool '{name}' reported an error")
            } else {
                text
            };
            return Err(Error::message(message));
        }

        Ok(CallToolOutcome {
            content,
            structured_content: result.get("structuredContent").cloned(),
            output_schema: self.cached_output_schema(name),
        })
    }

    /// Reads a resource.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown URIs and transport failures
    /// otherwise.
    pub async fn read_resource(&self, uri: &str) -> Result<Value> {
        self.request("resources/read", json!({"uri": uri})).await
    }

    /// Lists the peer's resources.
    ///
    /// # Errors
    ///
    /// Returns transport or protocol failures.
    pub async fn list_resources(&self) -> Result<Value> {
        self.request("resources/list", json!({})).await
    }

    /// Lists the peer's prompts.
    ///
    /// # Errors
    ///
    /// Returns transport or protocol failures.
    pub async fn list_prompts(&self) -> Result<Value> {
        self.request("prompts/list", json!({})).await
    }

    /// Renders a prompt with arguments.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown prompts and transport failures
    /// otherwise.
    pub async fn get_prompt(&self, name: &str, arguments: Value) -> Result<Value> {
        self.request("prompts/get", json!({"name": name, "arguments": arguments}))
            .await
    }

    /// Sends a fire-and-forget cancellation notification.
    ///
    /// Cancellation is cooperative: this never interrupts an in-flight
    /// handler, and delivery failures are swallowed.
    pub async fn cancel(&self, request_id: &RequestId, reason: Option<&str>) {
        let notif = OutgoingNotification::cancelled(request_id, reason);
        if let Ok(envelope) = serde_json::to_value(&notif) {
            if let Err(error) = self.transport.send_notification(envelope).await {
                tracing::debug!(%error, "cancellation notification not delivered");
            }
        }
    }

    /// Sends a progress notification for a token this side is servicing.
    ///
    /// # Errors
    ///
    /// Returns transport failures.
    pub async fn progress(
        &self,
        token: &str,
        value: f64,
        total: Option<f64>,
        message: Option<&str>,
    ) -> Result<()> {
        let notif = OutgoingNotification::progress(token, value, total, message);
        let envelope =
            serde_json::to_value(&notif).map_err(|e| Error::message(e.to_string()))?;
        self.transport.send_notification(envelope).await
    }

    /// Announces that the roots list changed.
    ///
    /// # Errors
    ///
    /// Returns transport failures.
    pub async fn notify_roots_changed(&self) -> Result<()> {
        self.notify("notifications/roots/list_changed", None).await
    }

    /// Answers a peer-initiated request arriving over the transport.
    ///
    /// Whatever owns the transport calls this when the remote peer issues
    /// a sampling or elicitation request; the registered callback's JSON
    /// reply is returned directly. This is how a client-initiated
    /// transport carries server-initiated semantics without a second
    /// connection.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unrecognised methods and a generic error
    /// when no callback is registered.
    pub fn handle_notification(&self, method: &str, params: Value) -> Result<Value> {
        match method {
            "sampling/createMessage" | "sampling/request" => {
                let callback = self
                    .read_callback(&self.sampling_callback)
                    .ok_or_else(|| Error::message("no sampling callback registered"))?;
                callback(params)
            }
            "elicitation/create" | "elicitation/request" => {
                let callback = self
                    .read_callback(&self.elicitation_callback)
                    .ok_or_else(|| Error::message("no elicitation callback registered"))?;
                callback(params)
            }
            other => Err(Error::not_found(format!("peer request method '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::handler::{McpHandler, ServerInfo};
    use crate::provider::{CapabilityProvider, Tool};

    fn loopback_client() -> (McpClient, Arc<LoopbackTransport>) {
        let mut provider = CapabilityProvider::new("test");
        provider
            .add_tool(
                Tool::new("add", json!({"type": "object"}), |args| {
                    let a = args["a"].as_i64().unwrap_or(0);
                    let b = args["b"].as_i64().unwrap_or(0);
                    Ok(json!({
                        "content": [{"type": "text", "text": format!("{}", a + b)}],
                        "structuredContent": {"result": a + b},
                    }))
                })
                .with_output_schema(json!({
                    "type": "object",
                    "properties": {"result": {"type": "integer"}}
                })),
            )
            .unwrap();
        let handler = Arc::new(McpHandler::new(provider, ServerInfo::new("test", "0.1.0")));
        let transport = LoopbackTransport::new(handler);
        (McpClient::new(Arc::clone(&transport) as Arc<dyn Transport>), transport)
    }

    #[tokio::test]
    async fn initialize_stores_capabilities_and_notifies() {
        let (client, transport) = loopback_client();
        let result = client.initialize().await.unwrap();
        assert_eq!(result["serverInfo"]["name"], "test");
        assert!(client.peer_capabilities().unwrap().get("tools").is_some());

        let sent = transport.sent_notifications();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0]["method"], "notifications/initialized");
    }

    #[tokio::test]
    async fn structured_result_decodes_through_generic_accessor() {
        let (client, _transport) = loopback_client();
        client.initialize().await.unwrap();
        client.list_tools().await.unwrap();

        let outcome = client
            .call_tool_mcp("add", json!({"a": 40, "b": 2}), CallOptions::default())
            .await
            .unwrap();

        assert_eq!(outcome.text(), "42");
        assert!(outcome.output_schema.is_some());

        #[derive(serde::Deserialize)]
        struct AddResult {
            result: i64,
        }
        let data: AddResult = outcome.data().unwrap();
        assert_eq!(data.result, 42);
    }

    #[tokio::test]
    async fn unknown_method_maps_to_not_found() {
        let (client, _transport) = loopback_client();
        let err = client.request("tools/destroy", json!({})).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn cancel_is_fire_and_forget() {
        let (client, transport) = loopback_client();
        client.cancel(&RequestId::Number(9), Some("user aborted")).await;

        let sent = transport.sent_notifications();
        assert_eq!(sent[0]["method"], "notifications/cancelled");
        assert_eq!(sent[0]["params"]["requestId"], 9);
    }

    #[tokio::test]
    async fn fresh_client_shares_factory_and_callbacks() {
        let (client, _transport) = loopback_client();
        client.on_sampling(|_| Ok(json!({"role": "assistant"})));

        let fresh = client.fresh();
        assert!(fresh.peer_capabilities().is_none());
        let reply = fresh
            .handle_notification("sampling/createMessage", json!({}))
            .unwrap();
        assert_eq!(reply["role"], "assistant");
    }

    #[test]
    fn handle_notification_dispatches_to_callbacks() {
        let (client, _transport) = loopback_client();
        client.on_sampling(|params| Ok(json!({"echo": params["x"]})));
        client.on_elicitation(|_| Ok(json!({"action": "decline"})));

        let reply = client
            .handle_notification("sampling/createMessage", json!({"x": 1}))
            .unwrap();
        assert_eq!(reply["echo"], 1);

        let reply = client
            .handle_notification("elicitation/create", json!({}))
            .unwrap();
        assert_eq!(reply["action"], "decline");

        assert!(client
            .handle_notification("logging/setLevel", json!({}))
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn handle_notification_without_callback_errors() {
        let (client, _transport) = loopback_client();
        let err = client
            .handle_notification("sampling/createMessage", json!({}))
            .unwrap_err();
        assert!(err.to_string().contains("no sampling callback"));
    }
}
