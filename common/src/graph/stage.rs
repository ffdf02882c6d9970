use crate::agent::state::AgentState;
use crate::config::AgentConfig;
use crate::db::Database;
use crate::error::Result;
use crate::llm::ChatModel;
use crate::tools::SqlToolSet;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

/// names of the workflow stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StageId {
    Setup,
    ConversationalQa,
    Clarify,
    SqlGeneration,
    ToolExecution,
    Response,
}

impl StageId {
    pub const ALL: [StageId; 6] = [
        StageId::Setup,
        StageId::ConversationalQa,
        StageId::Clarify,
        StageId::SqlGeneration,
        StageId::ToolExecution,
        StageId::Response,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageId::Setup => "setup",
            StageId::ConversationalQa => "conversational_qa",
            StageId::Clarify => "clarify",
            StageId::SqlGeneration => "sql_generation",
            StageId::ToolExecution => "tool_execution",
            StageId::Response => "response",
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// shared collaborators handed to every stage
#[derive(Clone)]
pub struct StageContext {
    pub model: Arc<dyn ChatModel>,
    pub db: Arc<dyn Database>,
    pub tools: Arc<SqlToolSet>,
    pub config: AgentConfig,
    pub clock: Clock,
}

impl StageContext {
    pub fn new(model: Arc<dyn ChatModel>, db: Arc<dyn Database>, config: AgentConfig) -> Self {
        let tools = Arc::new(SqlToolSet::new(Arc::clone(&db)));
        Self {
            model,
            db,
            tools,
            config,
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }
}

/// one unit of work in the workflow; takes the state and hands back the next one
#[async_trait]
pub trait Stage: Send + Sync {
    fn id(&self) -> StageId;

    async fn run(&self, state: AgentState, ctx: &StageContext) -> Result<AgentState>;
}
