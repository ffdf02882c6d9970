use crate::llm::Message;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub user_input: String,
    #[serde(default)]
    pub messages: Vec<HistoryTurn>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryRole {
    Human,
    Assistant,
}

/// one prior turn: a bare string placed by position, or an explicit role
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum HistoryTurn {
    Text(String),
    Tagged { role: HistoryRole, content: String },
}

impl AskRequest {
    /// history turns with roles fixed; bare strings alternate assistant, human by index
    pub fn history(&self) -> Vec<Message> {
        self.messages
            .iter()
            .enumerate()
            .map(|(index, turn)| match turn {
                HistoryTurn::Tagged { role, content } => match role {
                    HistoryRole::Human => Message::human(content.clone()),
                    HistoryRole::Assistant => Message::assistant(content.clone()),
                },
                HistoryTurn::Text(content) if index % 2 == 0 => {
                    Message::assistant(content.clone())
                }
                HistoryTurn::Text(content) => Message::human(content.clone()),
            })
            .collect()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AskResponse {
    pub response: String,
    pub messages: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub detail: String,
    /// stage that failed, null when the request never reached the graph
    pub stage: Option<String>,
}
