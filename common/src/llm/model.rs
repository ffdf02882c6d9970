use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    Human,
    Assistant,
    Tool,
}

impl MessageRole {
    /// label used when a conversation is flattened into a prompt
    pub fn label(&self) -> &'static str {
        match self {
            MessageRole::Human => "HUMAN",
            MessageRole::Assistant => "AI",
            MessageRole::Tool => "TOOL",
        }
    }
}

/// a tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// set on tool-result turns, pairs the result with its request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn human(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Human, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    pub fn assistant_with_tool_calls(
        content: impl Into<String>,
        tool_calls: Vec<ToolCall>,
    ) -> Self {
        Self {
            tool_calls,
            ..Self::new(MessageRole::Assistant, content)
        }
    }

    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::new(MessageRole::Tool, content)
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// render turns as `ROLE: content` lines, including requested tool calls
pub fn format_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|msg| {
            let mut line = format!("{}: {}", msg.role.label(), msg.content);
            for call in &msg.tool_calls {
                line.push_str(&format!(" [tool call {}({})]", call.name, call.arguments));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// a callable capability advertised to the model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// json schema for the arguments object
    pub parameters: Value,
}

/// a hosted chat model: prompt in, text or tool calls out
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// name reported in spans
    fn name(&self) -> &str;

    /// complete the conversation; with a non-empty `tools` the reply may request tool calls
    async fn generate(&self, messages: Vec<Message>, tools: &[ToolSpec]) -> Result<Message>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_creation() {
        let msg = Message::human("test");
        assert_eq!(msg.role, MessageRole::Human);
        assert_eq!(msg.content, "test");
        assert!(!msg.has_tool_calls());

        let tool = Message::tool("call_1", "42");
        assert_eq!(tool.role, MessageRole::Tool);
        assert_eq!(tool.tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn test_format_transcript_includes_tool_calls() {
        let messages = vec![
            Message::human("how many orders?"),
            Message::assistant_with_tool_calls(
                "",
                vec![ToolCall {
                    id: "call_1".to_string(),
                    name: "execute_query".to_string(),
                    arguments: json!({"query": "SELECT 1"}),
                }],
            ),
            Message::tool("call_1", "1"),
        ];

        let transcript = format_transcript(&messages);
        let lines: Vec<&str> = transcript.lines().collect();

        assert_eq!(lines[0], "HUMAN: how many orders?");
        assert!(lines[1].starts_with("AI: "));
        assert!(lines[1].contains("execute_query"));
        assert_eq!(lines[2], "TOOL: 1");
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let value = serde_json::to_value(MessageRole::Assistant).unwrap();
        assert_eq!(value, json!("assistant"));
    }
}
