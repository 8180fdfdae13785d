//! Content blocks carried by tool results, prompt messages, and resources.
//!
//! MCP responses are sequences of typed content blocks. The variant set is
//! closed: text, image, and embedded resource. The discriminator serialises
//! as the `"type"` field per the MCP wire format.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One unit of a tool or prompt response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Content {
    /// Plain text.
    #[serde(rename = "text")]
    Text {
        /// The text content.
        text: String,
    },

    /// Base64-encoded image data.
    #[serde(rename = "image")]
    Image {
        /// Base64-encoded image bytes.
        data: String,
        /// MIME type of the image (e.g. `image/png`).
        #[serde(rename = "mimeType")]
        mime_type: String,
    },

    /// A resource embedded inline in the response.
    #[serde(rename = "resource")]
    EmbeddedResource {
        /// The embedded resource contents.
        resource: EmbeddedResource,
    },
}

impl Content {
    /// Creates a text content block.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Returns the text if this is a text block.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// Contents of an embedded resource block.
///
/// Exactly one of `text` or `blob` is populated, mirroring
/// [`ResourceContent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedResource {
    /// URI identifying the resource.
    pub uri: String,

    /// MIME type, if known.
    #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// Textual contents.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Base64-encoded binary contents.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blob: Option<String>,
}

/// Raw contents produced by a resource provider function.
///
/// Binary payloads are base64-encoded into a `blob` field at the protocol
/// boundary; textual ones pass through as `text`.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceContent {
    /// Textual resource contents.
    Text {
        /// The text.
        text: String,
        /// MIME type, if known.
        mime_type: Option<String>,
    },
    /// Binary resource contents.
    Blob {
        /// The raw bytes (encoded to base64 at the wire boundary).
        data: Vec<u8>,
        /// MIME type, if known.
        mime_type: Option<String>,
    },
}

impl ResourceContent {
    /// Creates textual contents with no MIME type.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            mime_type: None,
        }
    }

    /// Creates binary contents with the given MIME type.
    #[must_use]
    pub fn blob(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self::Blob {
            data,
            mime_type: Some(mime_type.into()),
        }
    }

    /// Returns the MIME type, if set.
    #[must_use]
    pub fn mime_type(&self) -> Option<&str> {
        match self {
            Self::Text { mime_type, .. } | Self::Blob { mime_type, .. } => mime_type.as_deref(),
        }
    }
}

/// Role of a prompt message participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A user-authored message.
    User,
    /// An assistant-authored message.
    Assistant,
}

/// One message in a rendered prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMessage {
    /// Who the message is attributed to.
    pub role: Role,
    /// The message content block.
    pub content: Content,
}

impl PromptMessage {
    /// Creates a user message with text content.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Content::text(text),
        }
    }

    /// Creates an assistant message with text content.
    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: Content::text(text),
        }
    }
}

/// Normalises an arbitrary tool return value into a content array.
///
/// - An object containing a `content` field contributes that field.
/// - An array is used directly.
/// - A string becomes one text block.
/// - Anything else is serialised to JSON text and wrapped as one text block.
#[must_use]
pub fn normalise_content(value: &Value) -> Vec<Value> {
    if let Some(content) = value.get("content") {
        if let Some(items) = content.as_array() {
            return items.clone();
        }
    }
    if let Some(items) = value.as_array() {
        return items.clone();
    }
    if let Some(text) = value.as_str() {
        return vec![serde_json::json!({"type": "text", "text": text})];
    }
    vec![serde_json::json!({"type": "text", "text": value.to_string()})]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_block_serialises_with_type_tag() {
        let block = Content::text("hello");
        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(value, json!({"type": "text", "text": "hello"}));
    }

    #[test]
    fn image_block_round_trips() {
        let block = Content::Image {
            data: "aGVsbG8=".to_string(),
            mime_type: "image/png".to_string(),
        };
        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(value["type"], "image");
        assert_eq!(value["mimeType"], "image/png");

        let back: Content = serde_json::from_value(value).unwrap();
        assert_eq!(back, block);
    }

    #[test]
    fn embedded_resource_omits_empty_fields() {
        let block = Content::EmbeddedResource {
            resource: EmbeddedResource {
                uri: "memo://notes".to_string(),
                mime_type: None,
                text: Some("note".to_string()),
                blob: None,
            },
        };
        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(value["type"], "resource");
        assert!(value["resource"].get("blob").is_none());
        assert!(value["resource"].get("mimeType").is_none());
    }

    #[test]
    fn prompt_message_roles() {
        let msg = PromptMessage::user("hi");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["role"], "user");

        let msg = PromptMessage::assistant("hello");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["role"], "assistant");
    }

    #[test]
    fn normalise_object_with_content_field() {
        let value = json!({"content": [{"type": "text", "text": "x"}], "extra": 1});
        let content = normalise_content(&value);
        assert_eq!(content.len(), 1);
        assert_eq!(content[0]["text"], "x");
    }

    #[test]
    fn normalise_bare_array() {
        let value = json!([{"type": "text", "text": "a"}, {"type": "text", "text": "b"}]);
        assert_eq!(normalise_content(&value).len(), 2);
    }

    #[test]
    fn normalise_string() {
        let content = normalise_content(&json!("plain"));
        assert_eq!(content, vec![json!({"type": "text", "text": "plain"})]);
    }

    #[test]
    fn normalise_other_value_serialises() {
        let content = normalise_content(&json!({"answer": 42}));
        assert_eq!(content.len(), 1);
        assert_eq!(content[0]["type"], "text");
        assert!(content[0]["text"].as_str().unwrap().contains("42"));
    }
}
