use crate::error::{Result, SamvadaError};
use crate::llm::Message;
use chrono::{DateTime, SecondsFormat, Utc};

/// record threaded through every stage of one request
#[derive(Debug, Clone)]
pub struct AgentState {
    user_input: String,
    clarified_query: String,
    schema_context: String,
    current_time: Option<DateTime<Utc>>,
    messages: Vec<Message>,
    /// where this request's own turns begin; set once by setup
    message_index: Option<usize>,
    conversational_context: String,
    completed: bool,
    tool_rounds: usize,
}

impl AgentState {
    /// initial state from the question and caller-supplied history
    pub fn new(user_input: impl Into<String>, history: Vec<Message>) -> Self {
        Self {
            user_input: user_input.into(),
            clarified_query: String::new(),
            schema_context: String::new(),
            current_time: None,
            messages: history,
            message_index: None,
            conversational_context: String::new(),
            completed: false,
            tool_rounds: 0,
        }
    }

    pub fn user_input(&self) -> &str {
        &self.user_input
    }

    pub fn clarified_query(&self) -> &str {
        &self.clarified_query
    }

    pub fn schema_context(&self) -> &str {
        &self.schema_context
    }

    /// iso-8601 timestamp used in prompts, empty before setup
    pub fn current_time_iso(&self) -> String {
        self.current_time
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn message_index(&self) -> Option<usize> {
        self.message_index
    }

    pub fn conversational_context(&self) -> &str {
        &self.conversational_context
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn tool_rounds(&self) -> usize {
        self.tool_rounds
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// turns produced during this request, excluding caller history and the new question
    pub fn new_turns(&self) -> &[Message] {
        let start = self.message_index.unwrap_or(self.messages.len());
        &self.messages[start.min(self.messages.len())..]
    }

    /// stamp time and schema, append the question and fix the message index
    pub fn begin_request(&mut self, now: DateTime<Utc>, schema_context: String) -> Result<()> {
        if self.message_index.is_some() {
            return Err(SamvadaError::Graph(
                "request state was already initialised".to_string(),
            ));
        }

        self.current_time = Some(now);
        self.schema_context = schema_context;
        self.clarified_query.clear();
        self.conversational_context.clear();
        self.completed = false;
        self.messages.push(Message::human(self.user_input.clone()));
        self.message_index = Some(self.messages.len());
        Ok(())
    }

    pub fn set_conversational_context(&mut self, context: String) {
        self.conversational_context = context;
    }

    pub fn set_clarified_query(&mut self, query: String) -> Result<()> {
        if !self.clarified_query.is_empty() {
            return Err(SamvadaError::Graph(
                "clarified query can only be written once per request".to_string(),
            ));
        }
        self.clarified_query = query;
        Ok(())
    }

    /// the conversation now ends with this turn
    pub fn push_turn(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// no further sql work is needed
    pub fn mark_completed(&mut self) {
        self.completed = true;
    }

    /// count a tool round and return the new total
    pub fn record_tool_round(&mut self) -> usize {
        self.tool_rounds += 1;
        self.tool_rounds
    }
}
