pub mod client;
pub mod model;

pub use client::HostedModel;
pub use model::{format_transcript, ChatModel, Message, MessageRole, ToolCall, ToolSpec};
