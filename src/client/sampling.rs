//! Multi-turn tool-use sampling loop.
//!
//! Built on the client call engine: send one `sampling/createMessage`
//! request, detect tool-use stop reasons, execute the matching local
//! tools, feed their results back as a synthetic user message, and repeat
//! up to a bounded iteration count.

use indexmap::IndexMap;
use serde_json::{json, Value};

use crate::client::transport::BoxFuture;
use crate::client::McpClient;
use crate::error::{Error, Result};
use crate::provider::content::normalise_content;
use crate::provider::Tool;

/// A session able to service `sampling/createMessage` requests.
pub trait SamplingPeer: Send + Sync {
    /// Whether the negotiated session advertises sampling support.
    fn supports_sampling(&self) -> bool;

    /// Whether the negotiated session advertises sampling with tools.
    fn supports_sampling_tools(&self) -> bool;

    /// Sends one `sampling/createMessage` request.
    fn create_message(&self, params: Value) -> BoxFuture<'_, Result<Value>>;
}

impl SamplingPeer for McpClient {
    fn supports_sampling(&self) -> bool {
        self.peer_capabilities()
            .is_some_and(|caps| caps.get("sampling").is_some())
    }

    fn supports_sampling_tools(&self) -> bool {
        self.peer_capabilities().is_some_and(|caps| {
            caps.get("sampling")
                .and_then(|s| s.get("tools"))
                .is_some()
        })
    }

    fn create_message(&self, params: Value) -> BoxFuture<'_, Result<Value>> {
        Box::pin(async move { self.request("sampling/createMessage", params).await })
    }
}

/// Options for the sampling loop.
#[derive(Clone)]
pub struct SamplingOptions {
    /// Upper bound on loop iterations; exceeding it is fatal.
    pub max_iterations: usize,
    /// Steering for the first request only. `None` means the default
    /// ("auto", omitted from the wire form). Whatever the caller
    /// requested, iterations after the first always revert to the
    /// default, matching single-shot steering semantics.
    pub tool_choice: Option<Value>,
    /// Local tools available to the loop, keyed by name.
    pub tools: IndexMap<String, Tool>,
    /// Masks tool failure text behind a generic message before it is fed
    /// back to the model.
    pub mask_error_details: bool,
    /// Token budget per request.
    pub max_tokens: u64,
    /// System prompt for the conversation.
    pub system_prompt: Option<String>,
}

impl Default for SamplingOptions {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            tool_choice: None,
            tools: IndexMap::new(),
            mask_error_details: false,
            max_tokens: 1024,
            system_prompt: None,
        }
    }
}

impl SamplingOptions {
    /// Adds a tool to the loop.
    #[must_use]
    pub fn with_tool(mut self, tool: Tool) -> Self {
        self.tools.insert(tool.name.clone(), tool);
        self
    }

    /// Sets first-request steering.
    #[must_use]
    pub fn with_tool_choice(mut self, choice: Value) -> Self {
        self.tool_choice = Some(choice);
        self
    }
}

/// Result of one loop step.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// Raw `sampling/createMessage` result.
    pub response: Value,
    /// Stop reason reported by the model, if any.
    pub stop_reason: Option<String>,
    /// Conversation history including this step's messages.
    pub messages: Vec<Value>,
    /// Whether the step ended in tool use (the loop should continue).
    pub tool_use: bool,
}

/// Final result of a converged sampling loop.
#[derive(Debug, Clone)]
pub struct SampleOutcome {
    /// Concatenated text of the final response.
    pub text: String,
    /// Raw final `sampling/createMessage` result.
    pub response: Value,
    /// Full conversation history.
    pub history: Vec<Value>,
}

/// Runs one sampling step: one request, plus local tool execution when
/// the model stopped for tool use.
///
/// # Errors
///
/// Returns a validation error when the session does not advertise the
/// required capabilities, and propagates request failures.
pub async fn sample_step(
    peer: &dyn SamplingPeer,
    messages: &[Value],
    options: &SamplingOptions,
) -> Result<StepOutcome> {
    if !peer.supports_sampling() {
        return Err(Error::validation(
            "session does not advertise sampling support",
        ));
    }
    if !options.tools.is_empty() && !peer.supports_sampling_tools() {
        return Err(Error::validation(
            "session does not advertise sampling support with tools",
        ));
    }

    let mut params = json!({
        "messages": messages,
        "maxTokens": options.max_tokens,
    });
    if let Some(system_prompt) = &options.system_prompt {
        params["systemPrompt"] = json!(system_prompt);
    }
    if !options.tools.is_empty() {
        let tools: Vec<Value> = options
            .tools
            .values()
            .map(|tool| {
                let mut out = json!({
                    "name": tool.name,
                    "inputSchema": tool.input_schema,
                });
                if let Some(description) = &tool.description {
                    out["description"] = json!(description);
                }
                out
            })
            .collect();
        params["tools"] = json!(tools);
        if let Some(choice) = &options.tool_choice {
            params["toolChoice"] = choice.clone();
        }
    }

    let response = peer.create_message(params).await?;
    let stop_reason = response
        .get("stopReason")
        .and_then(Value::as_str)
        .map(ToString::to_string);

    let mut history = messages.to_vec();
    history.push(json!({
        "role": response.get("role").and_then(Value::as_str).unwrap_or("assistant"),
        "content": response.get("content").cloned().unwrap_or(Value::Null),
    }));

    if stop_reason.as_deref() != Some("toolUse") {
        return Ok(StepOutcome {
            response,
            stop_reason,
            messages: history,
            tool_use: false,
        });
    }

    let results = execute_tool_uses(&response, options);
    history.push(json!({"role": "user", "content": results}));

    Ok(StepOutcome {
        response,
        stop_reason,
        messages: history,
        tool_use: true,
    })
}

/// Executes every `tool_use` block in a response against the tool map.
fn execute_tool_uses(response: &Value, options: &SamplingOptions) -> Vec<Value> {
    let blocks = response
        .get("content")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut results = Vec::new();
    for block in blocks {
        if block.get("type").and_then(Value::as_str) != Some("tool_use") {
            continue;
        }
        let id = block.get("id").cloned().unwrap_or(Value::Null);
        let name = block.get("name").and_then(Value::as_str).unwrap_or_default();
        let input = block.get("input").cloned().unwrap_or_else(|| json!({}));

        let outcome = options
            .tools
            .get(name)
            .map(|tool| tool.invoke(input))
            .unwrap_or_else(|| Err(Error::not_found(format!("tool '{name}'"))));

        let result = match outcome {
            Ok(value) => json!({
                "type": "tool_result",
                "tool_use_id": id,
                "content": normalise_content(&value),
            }),
            Err(error) => {
                tracing::debug!(tool = name, %error, "sampling tool execution failed");
                let text = if options.mask_error_details {
                    "tool execution failed".to_string()
                } else {
                    error.to_string()
                };
                json!({
                    "type": "tool_result",
                    "tool_use_id": id,
                    "content": [{"type": "text", "text": text}],
                    "is_error": true,
                })
            }
        };
        results.push(result);
    }
    results
}

/// Runs the bounded sampling loop to completion.
///
/// Returns the first non-tool-use step's text, response, and history.
///
/// # Errors
///
/// Propagates step failures, and fails outright when `max_iterations` is
/// exceeded — a partial result is never returned.
pub async fn sample(
    peer: &dyn SamplingPeer,
    messages: Vec<Value>,
    options: SamplingOptions,
) -> Result<SampleOutcome> {
    let mut options = options;
    let mut history = messages;

    for iteration in 0..options.max_iterations {
        let step = sample_step(peer, &history, &options).await?;
        history = step.messages;

        if !step.tool_use {
            let text = step.response.get("content").map(collect_text).unwrap_or_default();
            return Ok(SampleOutcome {
                text,
                response: step.response,
                history,
            });
        }

        tracing::debug!(iteration, "sampling step ended in tool use, continuing");
        // Caller steering applies to the first request only.
        options.tool_choice = None;
    }

    Err(Error::message(format!(
        "sampling did not converge within {} iterations",
        options.max_iterations
    )))
}

/// Concatenates the text blocks of a content value.
fn collect_text(content: &Value) -> String {
    match content {
        Value::String(text) => text.clone(),
        Value::Array(blocks) => blocks
            .iter()
            .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|b| b.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Object(_) => content
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    }
}
