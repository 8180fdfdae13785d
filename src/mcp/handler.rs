//! MCP method translation over a composed provider and dispatcher.
//!
//! [`McpHandler`] is a pure translation layer: each inbound JSON-RPC
//! request dispatches on `method` and resolves against the transform
//! chain (listing/reading) or the dispatcher's route table (calling).
//! Failures map onto the MCP error taxonomy; every error response
//! preserves the original request id.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::dispatch::Dispatcher;
use crate::error::Error;
use crate::mcp::protocol::{
    IncomingMessage, JsonRpcError, JsonRpcRequest, JsonRpcResponse, MCP_PROTOCOL_VERSION,
};
use crate::mcp::schema;
use crate::provider::{ResourceContent, Tool};
use crate::transform::ComposedProvider;

/// Server identity for capability negotiation. Each optional field is
/// omitted from the wire form when unset.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
    /// Project or documentation URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website_url: Option<String>,
    /// Icon metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icons: Option<Value>,
}

impl ServerInfo {
    /// Creates server info with just a name and version.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            website_url: None,
            icons: None,
        }
    }
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
    }
}

/// Parameters for tools/call request.
#[derive(Debug, Clone, Deserialize)]
struct ToolCallParams {
    /// Name of the tool to call.
    name: String,
    /// Arguments for the tool.
    #[serde(default)]
    arguments: Value,
}

/// Translates MCP JSON-RPC methods onto a provider and dispatcher.
pub struct McpHandler {
    provider: Arc<ComposedProvider>,
    dispatcher: Dispatcher,
    info: ServerInfo,
    instructions: Option<String>,
    dereference_schemas: bool,
}

impl McpHandler {
    /// Creates a handler over a provider, seeding one dispatcher route per
    /// published tool.
    #[must_use]
    pub fn new(provider: impl Into<ComposedProvider>, info: ServerInfo) -> Self {
        Self::with_dispatcher(provider, info, Dispatcher::new())
    }

    /// Creates a handler with a caller-supplied dispatcher (hooks and
    /// extra routes pre-registered).
    ///
    /// Tool routes are seeded for every currently published tool that the
    /// dispatcher does not already route; lookups stay dynamic, so
    /// transforms applied to the chain keep working per call.
    #[must_use]
    pub fn with_dispatcher(
        provider: impl Into<ComposedProvider>,
        info: ServerInfo,
        mut dispatcher: Dispatcher,
    ) -> Self {
        let provider = Arc::new(provider.into());

        for tool in provider.list_tools() {
            if dispatcher.has_route(&tool.name) {
                continue;
            }
            let chain = Arc::clone(&provider);
            let name = tool.name.clone();
            dispatcher.route(tool.name.clone(), move |payload| {
                chain.get_tool(&name)?.invoke(payload.clone())
            });
        }

        Self {
            provider,
            dispatcher,
            info,
            instructions: None,
            dereference_schemas: true,
        }
    }

    /// Sets the instructions string returned from `initialize`.
    #[must_use]
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Disables `$ref`/`$defs` dereferencing of published schemas.
    #[must_use]
    pub const fn with_raw_schemas(mut self) -> Self {
        self.dereference_schemas = false;
        self
    }

    /// Returns the composed provider.
    #[must_use]
    pub fn provider(&self) -> &ComposedProvider {
        &self.provider
    }

    /// Handles one parsed request.
    ///
    /// # Errors
    ///
    /// Returns the JSON-RPC error envelope for the failure, carrying the
    /// original request id.
    pub fn handle_request(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        let mut response = match req.method.as_str() {
            "initialize" => self.handle_initialize(req),
            "ping" => Ok(JsonRpcResponse::success(req.id.clone(), json!({}))),
            "tools/list" => self.handle_tools_list(req),
            "tools/call" => self.handle_tools_call(req),
            "resources/list" => self.handle_resources_list(req),
            "resources/templates/list" => self.handle_templates_list(req),
            "resources/read" => self.handle_resources_read(req),
            "prompts/list" => self.handle_prompts_list(req),
            "prompts/get" => self.handle_prompts_get(req),
            "completion/complete" => self.handle_complete(req),
            _ => Err(JsonRpcError::method_not_found(req.id.clone(), &req.method)),
        }?;

        // The _meta side-channel round-trips untouched into every result.
        if let Some(meta) = req.meta() {
            if let Some(result) = response.result.as_object_mut() {
                result.insert("_meta".to_string(), meta.clone());
            }
        }

        Ok(response)
    }

    /// Handles an envelope already decoded to a JSON value, producing the
    /// reply envelope as a value.
    ///
    /// This is the entry point used by in-process transports.
    #[must_use]
    pub fn handle_value(&self, envelope: &Value) -> Value {
        let raw = envelope.to_string();
        let message = match crate::mcp::protocol::parse_message(&raw) {
            Ok(message) => message,
            Err(error) => return serde_json::to_value(&error).unwrap_or(Value::Null),
        };
        match message {
            IncomingMessage::Request(req) => match self.handle_request(&req) {
                Ok(response) => serde_json::to_value(&response).unwrap_or(Value::Null),
                Err(error) => serde_json::to_value(&error).unwrap_or(Value::Null),
            },
            IncomingMessage::Notification(_) => Value::Null,
        }
    }

    fn handle_initialize(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        let mut capabilities = Map::new();
        capabilities.insert("tools".to_string(), json!({}));

        if !self.provider.list_resources().is_empty()
            || !self.provider.list_resource_templates().is_empty()
        {
            capabilities.insert("resources".to_string(), json!({}));
        }
        if !self.provider.list_prompts().is_empty() {
            capabilities.insert("prompts".to_string(), json!({}));
        }

        let has_ui = self.provider.list_tools().iter().any(Tool::has_ui_metadata)
            || self
                .provider
                .list_resources()
                .iter()
                .any(crate::provider::Resource::has_ui_metadata);
        if has_ui {
            capabilities.insert("experimental".to_string(), json!({"ui": {}}));
        }

        let mut result = json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": Value::Object(capabilities),
            "serverInfo": self.info,
        });
        if let Some(instructions) = &self.instructions {
            result["instructions"] = json!(instructions);
        }

        Ok(JsonRpcResponse::success(req.id.clone(), result))
    }

    fn handle_tools_list(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        let tools: Vec<Value> = self
            .provider
            .list_tools()
            .iter()
            .map(|tool| self.published_tool(tool))
            .collect();

        Ok(JsonRpcResponse::success(req.id.clone(), json!({"tools": tools})))
    }

    /// Builds the wire form of one tool definition.
    fn published_tool(&self, tool: &Tool) -> Value {
        let mut input_schema = schema::strip_excluded_args(&tool.input_schema, &tool.excluded_args);
        if self.dereference_schemas {
            input_schema = schema::dereference(&input_schema);
        }

        let mut out = Map::new();
        out.insert("name".to_string(), json!(tool.name));
        if let Some(description) = &tool.description {
            out.insert("description".to_string(), json!(description));
        }
        out.insert("inputSchema".to_string(), input_schema);
        if let Some(output_schema) = &tool.output_schema {
            let output_schema = if self.dereference_schemas {
                schema::dereference(output_schema)
            } else {
                output_schema.clone()
            };
            out.insert("outputSchema".to_string(), output_schema);
        }
        if let Some(title) = &tool.title {
            out.insert("title".to_string(), json!(title));
        }
        if let Some(icons) = &tool.icons {
            out.insert("icons".to_string(), icons.clone());
        }
        Value::Object(out)
    }

    fn handle_tools_call(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        let params: ToolCallParams = req
            .params
            .as_ref()
            .map(|p| serde_json::from_value(p.clone()))
            .transpose()
            .map_err(|e| {
                JsonRpcError::invalid_params(req.id.clone(), format!("Invalid tool call params: {e}"))
            })?
            .ok_or_else(|| {
                JsonRpcError::invalid_params(req.id.clone(), "Missing tool call params")
            })?;

        let result = match self.dispatcher.handle(&params.name, &params.arguments) {
            Ok(value) => {
                let content = crate::provider::content::normalise_content(&value);
                let mut result = json!({"content": content});
                if let Some(structured) = value.get("structuredContent") {
                    result["structuredContent"] = structured.clone();
                }
                if let Some(is_error) = value.get("isError") {
                    result["isError"] = is_error.clone();
                }
                result
            }
            // Unknown tools surface as an in-band error result rather than
            // a protocol error, so the caller's loop can keep going.
            Err(Error::NotFound(_)) => json!({
                "content": [{"type": "text", "text": format!("Unknown tool: {}", params.name)}],
                "isError": true,
            }),
            Err(error) => {
                tracing::debug!(tool = %params.name, error = %error, "tool call failed");
                return Err(JsonRpcError::internal_error(req.id.clone(), error.to_string()));
            }
        };

        Ok(JsonRpcResponse::success(req.id.clone(), result))
    }

    fn handle_resources_list(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        let resources: Vec<Value> = self
            .provider
            .list_resources()
            .iter()
            .map(|resource| {
                let mut out = Map::new();
                out.insert("uri".to_string(), json!(resource.uri));
                out.insert("name".to_string(), json!(resource.name));
                if let Some(description) = &resource.description {
                    out.insert("description".to_string(), json!(description));
                }
                if let Some(mime_type) = &resource.mime_type {
                    out.insert("mimeType".to_string(), json!(mime_type));
                }
                Value::Object(out)
            })
            .collect();

        Ok(JsonRpcResponse::success(
            req.id.clone(),
            json!({"resources": resources}),
        ))
    }

    fn handle_templates_list(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        let templates: Vec<Value> = self
            .provider
            .list_resource_templates()
            .iter()
            .map(|template| {
                let mut out = Map::new();
                out.insert("uriTemplate".to_string(), json!(template.uri_template));
                out.insert("name".to_string(), json!(template.name));
                if let Some(description) = &template.description {
                    out.insert("description".to_string(), json!(description));
                }
                if let Some(mime_type) = &template.mime_type {
                    out.insert("mimeType".to_string(), json!(mime_type));
                }
                Value::Object(out)
            })
            .collect();

        Ok(JsonRpcResponse::success(
            req.id.clone(),
            json!({"resourceTemplates": templates}),
        ))
    }

    fn handle_resources_read(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        let uri = req
            .params
            .as_ref()
            .and_then(|p| p.get("uri"))
            .and_then(Value::as_str)
            .ok_or_else(|| JsonRpcError::invalid_params(req.id.clone(), "Missing resource uri"))?;

        // Interop tolerance: some clients append a trailing slash.
        let lookup = uri.trim_end_matches('/');

        let content = if let Ok(resource) = self.provider.get_resource(lookup) {
            resource
                .read(Value::Null)
                .map_err(|e| JsonRpcError::internal_error(req.id.clone(), e.to_string()))?
        } else if let Ok(template) = self.provider.get_resource_template(lookup) {
            let params = template
                .matches(lookup)
                .map_or(Value::Null, Value::Object);
            template
                .read(params)
                .map_err(|e| JsonRpcError::internal_error(req.id.clone(), e.to_string()))?
        } else {
            return Err(JsonRpcError::resource_not_found(
                req.id.clone(),
                format!("Resource not found: {uri}"),
            ));
        };

        let mut entry = Map::new();
        entry.insert("uri".to_string(), json!(uri));
        match content {
            ResourceContent::Text { text, mime_type } => {
                if let Some(mime_type) = mime_type {
                    entry.insert("mimeType".to_string(), json!(mime_type));
                }
                entry.insert("text".to_string(), json!(text));
            }
            ResourceContent::Blob { data, mime_type } => {
                if let Some(mime_type) = mime_type {
                    entry.insert("mimeType".to_string(), json!(mime_type));
                }
                entry.insert("blob".to_string(), json!(BASE64_STANDARD.encode(data)));
            }
        }

        Ok(JsonRpcResponse::success(
            req.id.clone(),
            json!({"contents": [Value::Object(entry)]}),
        ))
    }

    fn handle_prompts_list(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        let prompts: Vec<Value> = self
            .provider
            .list_prompts()
            .iter()
            .map(|prompt| {
                let mut out = Map::new();
                out.insert("name".to_string(), json!(prompt.name));
                if let Some(description) = &prompt.description {
                    out.insert("description".to_string(), json!(description));
                }
                if !prompt.arguments.is_empty() {
                    out.insert("arguments".to_string(), json!(prompt.arguments));
                }
                Value::Object(out)
            })
            .collect();

        Ok(JsonRpcResponse::success(
            req.id.clone(),
            json!({"prompts": prompts}),
        ))
    }

    fn handle_prompts_get(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        let params = req.params.as_ref();
        let name = params
            .and_then(|p| p.get("name"))
            .and_then(Value::as_str)
            .ok_or_else(|| JsonRpcError::invalid_params(req.id.clone(), "Missing prompt name"))?;
        let arguments = params
            .and_then(|p| p.get("arguments"))
            .cloned()
            .unwrap_or_else(|| json!({}));

        let prompt = self.provider.get_prompt(name).map_err(|_| {
            JsonRpcError::prompt_not_found(req.id.clone(), format!("Prompt not found: {name}"))
        })?;

        for argument in &prompt.arguments {
            if argument.required && arguments.get(&argument.name).is_none() {
                return Err(JsonRpcError::invalid_params(
                    req.id.clone(),
                    format!("Missing required prompt argument: {}", argument.name),
                ));
            }
        }

        let messages = prompt
            .render(arguments)
            .map_err(|e| JsonRpcError::internal_error(req.id.clone(), e.to_string()))?;

        let mut result = json!({"messages": messages});
        if let Some(description) = &prompt.description {
            result["description"] = json!(description);
        }

        Ok(JsonRpcResponse::success(req.id.clone(), result))
    }

    fn handle_complete(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        let params = req.params.as_ref();
        let argument_value = params
            .and_then(|p| p.get("argument"))
            .and_then(|a| a.get("value"))
            .and_then(Value::as_str)
            .unwrap_or_default();

        // Completion candidates come from the declared surface: prompt
        // argument names or template parameter names matching the typed
        // prefix. Providers with no matching declaration complete to
        // nothing.
        let mut values: Vec<String> = Vec::new();
        if let Some(reference) = params.and_then(|p| p.get("ref")) {
            match reference.get("type").and_then(Value::as_str) {
                Some("ref/prompt") => {
                    if let Some(name) = reference.get("name").and_then(Value::as_str) {
                        if let Ok(prompt) = self.provider.get_prompt(name) {
                            values = prompt
                                .arguments
                                .iter()
                                .map(|a| a.name.clone())
                                .filter(|n| n.starts_with(argument_value))
                                .collect();
                        }
                    }
                }
                Some("ref/resource") => {
                    if let Some(uri) = reference.get("uri").and_then(Value::as_str) {
                        values = self
                            .provider
                            .list_resource_templates()
                            .iter()
                            .filter(|t| t.uri_template == uri)
                            .flat_map(|t| t.param_names().to_vec())
                            .filter(|n| n.starts_with(argument_value))
                            .collect();
                    }
                }
                _ => {}
            }
        }

        let total = values.len();
        Ok(JsonRpcResponse::success(
            req.id.clone(),
            json!({"completion": {"values": values, "total": total, "hasMore": false}}),
        ))
    }
}
