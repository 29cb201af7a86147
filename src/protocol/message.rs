//! A2A message types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::error::A2AError;

fn generate_message_id() -> String {
    Uuid::now_v7().to_string()
}

/// A message in the A2A protocol
///
/// Messages are the atomic unit of communication between agents. A message is
/// created once and never mutated after it has been appended to a task history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique message identifier, minted when the sender omits it
    #[serde(default = "generate_message_id")]
    pub message_id: String,

    /// Role of the message sender
    pub role: Role,

    /// Message content parts, in order
    pub parts: Vec<MessagePart>,

    /// Task this message belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,

    /// Context grouping related tasks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,

    /// Free-form metadata bag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,

    /// When the message was produced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Message {
    /// Create a new message with text content
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            message_id: generate_message_id(),
            role,
            parts: vec![MessagePart::text(text)],
            task_id: None,
            context_id: None,
            metadata: None,
            timestamp: Some(Utc::now()),
        }
    }

    /// Create a user message with text content
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    /// Create an agent message with text content
    pub fn agent(text: impl Into<String>) -> Self {
        Self::new(Role::Agent, text)
    }

    /// Create a new message builder
    pub fn builder() -> MessageBuilder {
        MessageBuilder::new()
    }

    /// Add a metadata field to the message
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata
            .get_or_insert_with(Map::new)
            .insert(key.into(), value);
        self
    }

    /// Add a message part
    pub fn with_part(mut self, part: MessagePart) -> Self {
        self.parts.push(part);
        self
    }

    /// Set the task and context correlation ids
    pub fn with_correlation(mut self, task_id: impl Into<String>, context_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self.context_id = Some(context_id.into());
        self
    }

    /// Concatenate every text part, separated by newlines
    pub fn text_content(&self) -> String {
        self.parts
            .iter()
            .filter_map(MessagePart::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Look up a string metadata value
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get(key))
            .and_then(Value::as_str)
    }

    /// Identifier of the agent that authored this message
    ///
    /// Falls back to the role name when no `agentId` metadata is present.
    pub fn sender(&self) -> String {
        self.metadata_str("agentId")
            .map(str::to_string)
            .unwrap_or_else(|| self.role.as_str().to_string())
    }
}

/// Builder for constructing Message instances
#[derive(Debug, Default)]
pub struct MessageBuilder {
    role: Option<Role>,
    parts: Vec<MessagePart>,
    message_id: Option<String>,
    task_id: Option<String>,
    context_id: Option<String>,
    metadata: Option<Map<String, Value>>,
}

impl MessageBuilder {
    /// Create a new message builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the role of the message
    pub fn role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    /// Set the message parts
    pub fn parts(mut self, parts: Vec<MessagePart>) -> Self {
        self.parts = parts;
        self
    }

    /// Add a single part to the message
    pub fn part(mut self, part: MessagePart) -> Self {
        self.parts.push(part);
        self
    }

    /// Set the message ID
    pub fn message_id(mut self, id: impl Into<String>) -> Self {
        self.message_id = Some(id.into());
        self
    }

    /// Set the task ID
    pub fn task_id(mut self, id: impl Into<String>) -> Self {
        self.task_id = Some(id.into());
        self
    }

    /// Set the context ID
    pub fn context_id(mut self, id: impl Into<String>) -> Self {
        self.context_id = Some(id.into());
        self
    }

    /// Add a metadata field
    pub fn metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata
            .get_or_insert_with(Map::new)
            .insert(key.into(), value);
        self
    }

    /// Build the message
    ///
    /// # Errors
    ///
    /// `Validation` when the role is unset or there are no parts
    pub fn build(self) -> Result<Message, A2AError> {
        let role = self
            .role
            .ok_or_else(|| A2AError::Validation("message role is required".into()))?;
        if self.parts.is_empty() {
            return Err(A2AError::Validation(
                "message must have at least one part".into(),
            ));
        }

        Ok(Message {
            message_id: self.message_id.unwrap_or_else(generate_message_id),
            role,
            parts: self.parts,
            task_id: self.task_id,
            context_id: self.context_id,
            metadata: self.metadata,
            timestamp: Some(Utc::now()),
        })
    }
}

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// End user or calling client
    User,

    /// Assistant-style model output
    Assistant,

    /// System instructions
    System,

    /// A peer agent
    Agent,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
            Role::Agent => "agent",
        }
    }
}

/// File content for file parts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileContent {
    /// Name of the file
    pub name: String,

    /// MIME type of the file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// URI reference to the file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,

    /// Base64-encoded file content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes: Option<String>,
}

/// A typed content fragment of a message, tagged by `kind`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessagePart {
    /// Plain text
    Text { text: String },

    /// Image by reference or inline base64 data
    #[serde(rename_all = "camelCase")]
    Image {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bytes: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
    },

    /// File reference or inline file
    File { file: FileContent },

    /// A tool invocation requested by the sender
    ToolCall {
        id: String,
        name: String,
        #[serde(default)]
        arguments: Value,
    },

    /// Result of a prior tool invocation
    #[serde(rename_all = "camelCase")]
    ToolResult {
        tool_call_id: String,
        #[serde(default)]
        content: Value,
        #[serde(default)]
        is_error: bool,
    },
}

impl MessagePart {
    /// Create a text part
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Create an image part referencing a URL
    pub fn image_url(url: impl Into<String>) -> Self {
        Self::Image {
            url: Some(url.into()),
            bytes: None,
            mime_type: None,
        }
    }

    /// Create a file part with URI reference
    pub fn file(name: impl Into<String>, uri: impl Into<String>) -> Self {
        Self::File {
            file: FileContent {
                name: name.into(),
                mime_type: None,
                uri: Some(uri.into()),
                bytes: None,
            },
        }
    }

    /// Create a tool call part
    pub fn tool_call(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self::ToolCall {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// Create a tool result part
    pub fn tool_result(tool_call_id: impl Into<String>, content: Value, is_error: bool) -> Self {
        Self::ToolResult {
            tool_call_id: tool_call_id.into(),
            content,
            is_error,
        }
    }

    /// Borrow the text of a text part
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessagePart::Text { text } => Some(text),
            _ => None,
        }
    }

    /// The wire tag of this part
    pub fn kind(&self) -> &'static str {
        match self {
            MessagePart::Text { .. } => "text",
            MessagePart::Image { .. } => "image",
            MessagePart::File { .. } => "file",
            MessagePart::ToolCall { .. } => "tool_call",
            MessagePart::ToolResult { .. } => "tool_result",
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_message_creation() {
        let msg = Message::user("Hello, agent!");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.parts.len(), 1);
        assert!(!msg.message_id.is_empty());
        assert_eq!(msg.text_content(), "Hello, agent!");
    }

    #[test]
    fn test_text_content_skips_other_parts() {
        let msg = Message::user("first")
            .with_part(MessagePart::image_url("https://example.com/a.png"))
            .with_part(MessagePart::text("second"));

        assert_eq!(msg.text_content(), "first\nsecond");
    }

    #[test]
    fn test_missing_message_id_is_generated() {
        let msg: Message = serde_json::from_value(json!({
            "role": "user",
            "parts": [{"kind": "text", "text": "Hello"}]
        }))
        .unwrap();

        assert!(!msg.message_id.is_empty());
        assert!(msg.task_id.is_none());
        assert!(msg.timestamp.is_none());
    }

    #[test]
    fn test_part_tags() {
        let call = MessagePart::tool_call("c1", "search", json!({"q": "rust"}));
        let json = serde_json::to_value(&call).unwrap();
        assert_eq!(json["kind"], "tool_call");
        assert_eq!(json["name"], "search");

        let result = MessagePart::tool_result("c1", json!("ok"), false);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["kind"], "tool_result");
        assert_eq!(json["toolCallId"], "c1");
        assert_eq!(json["isError"], false);
    }

    #[test]
    fn test_unknown_part_kind_rejected() {
        let parsed = serde_json::from_value::<MessagePart>(json!({"kind": "video", "url": "x"}));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_sender_falls_back_to_role() {
        let msg = Message::agent("hi");
        assert_eq!(msg.sender(), "agent");

        let msg = msg.with_metadata("agentId", json!("agent-a"));
        assert_eq!(msg.sender(), "agent-a");
    }

    #[test]
    fn test_message_builder() {
        let msg = Message::builder()
            .role(Role::Agent)
            .parts(vec![MessagePart::text("Hello")])
            .message_id("msg-123")
            .task_id("task-456")
            .context_id("ctx-789")
            .build()
            .unwrap();

        assert_eq!(msg.role, Role::Agent);
        assert_eq!(msg.message_id, "msg-123");
        assert_eq!(msg.task_id, Some("task-456".to_string()));
        assert_eq!(msg.context_id, Some("ctx-789".to_string()));
    }

    #[test]
    fn test_message_builder_rejects_incomplete() {
        let err = Message::builder().role(Role::User).build().unwrap_err();
        assert!(matches!(err, A2AError::Validation(_)));

        let err = Message::builder().part(MessagePart::text("hi")).build().unwrap_err();
        assert!(err.to_string().contains("role"));
    }
}
