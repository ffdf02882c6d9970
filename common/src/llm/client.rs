use crate::config::LlmConfig;
use crate::error::{Result, SamvadaError};
use crate::llm::model::{ChatModel, Message, MessageRole, ToolCall, ToolSpec};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// chat model served over an openai-compatible `/chat/completions` endpoint
pub struct HostedModel {
    client: reqwest::Client,
    config: LlmConfig,
}

impl HostedModel {
    pub fn new(config: LlmConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(SamvadaError::Config(
                "language model api key is not set".to_string(),
            ));
        }

        let client = reqwest::Client::builder().build()?;

        tracing::info!(
            model = %config.model,
            base_url = %config.base_url,
            "hosted model client initialized"
        );

        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ChatModel for HostedModel {
    fn name(&self) -> &str {
        &self.config.model
    }

    #[tracing::instrument(skip(self, messages, tools), fields(llm.model = %self.config.model, message_count = messages.len(), tool_count = tools.len()))]
    async fn generate(&self, messages: Vec<Message>, tools: &[ToolSpec]) -> Result<Message> {
        let body = build_request(&self.config, &messages, tools);

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(SamvadaError::Model(format!(
                "completion request failed with {}: {}",
                status, detail
            )));
        }

        let completion: WireCompletion = response.json().await?;
        let message = parse_completion(completion)?;

        tracing::debug!(
            content_len = message.content.len(),
            tool_calls = message.tool_calls.len(),
            "completion received"
        );

        Ok(message)
    }
}

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: WireFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    /// json-encoded arguments object
    arguments: String,
}

#[derive(Debug, Serialize)]
struct WireTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunction<'a>,
}

#[derive(Debug, Serialize)]
struct WireFunction<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a Value,
}

#[derive(Debug, Deserialize)]
struct WireCompletion {
    choices: Vec<WireChoice>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireMessage,
}

fn function_kind() -> String {
    "function".to_string()
}

fn wire_role(role: MessageRole) -> &'static str {
    match role {
        MessageRole::Human => "user",
        MessageRole::Assistant => "assistant",
        MessageRole::Tool => "tool",
    }
}

fn to_wire(message: &Message) -> WireMessage {
    let tool_calls = if message.tool_calls.is_empty() {
        None
    } else {
        Some(
            message
                .tool_calls
                .iter()
                .map(|call| WireToolCall {
                    id: call.id.clone(),
                    kind: function_kind(),
                    function: WireFunctionCall {
                        name: call.name.clone(),
                        arguments: call.arguments.to_string(),
                    },
                })
                .collect(),
        )
    };

    WireMessage {
        role: wire_role(message.role).to_string(),
        content: Some(message.content.clone()),
        tool_calls,
        tool_call_id: message.tool_call_id.clone(),
    }
}

fn build_request<'a>(
    config: &'a LlmConfig,
    messages: &[Message],
    tools: &'a [ToolSpec],
) -> WireRequest<'a> {
    WireRequest {
        model: &config.model,
        messages: messages.iter().map(to_wire).collect(),
        tools: tools
            .iter()
            .map(|tool| WireTool {
                kind: "function",
                function: WireFunction {
                    name: &tool.name,
                    description: &tool.description,
                    parameters: &tool.parameters,
                },
            })
            .collect(),
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    }
}

fn parse_completion(completion: WireCompletion) -> Result<Message> {
    let choice = completion
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| SamvadaError::Model("completion contained no choices".to_string()))?;

    let content = choice.message.content.unwrap_or_default();
    let mut tool_calls = Vec::new();

    for call in choice.message.tool_calls.unwrap_or_default() {
        // some providers send an empty string for argument-less calls
        let arguments = if call.function.arguments.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(&call.function.arguments).map_err(|e| {
                SamvadaError::Model(format!(
                    "tool call {} had malformed arguments: {}",
                    call.function.name, e
                ))
            })?
        };

        tool_calls.push(ToolCall {
            id: call.id,
            name: call.function.name,
            arguments,
        });
    }

    Ok(Message::assistant_with_tool_calls(content, tool_calls))
}
