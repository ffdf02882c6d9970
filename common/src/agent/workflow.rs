use crate::agent::routing::{route_after_qa, route_after_sql, QaRoute, SqlRoute};
use crate::agent::stages::{
    ClarifyStage, ConversationalQaStage, ResponseStage, SetupStage, SqlGenerationStage,
    ToolExecutionStage,
};
use crate::agent::state::AgentState;
use crate::error::{Result, SamvadaError};
use crate::graph::{GraphExecutor, StageContext, StageGraph, StageId, Target};
use crate::llm::{Message, MessageRole};
use std::sync::Arc;

/// wire the six stages into the question-answering workflow
pub fn build_agent_graph() -> StageGraph {
    let mut graph = StageGraph::new();

    graph.add_stage(Arc::new(SetupStage));
    graph.add_stage(Arc::new(ConversationalQaStage));
    graph.add_stage(Arc::new(ClarifyStage));
    graph.add_stage(Arc::new(SqlGenerationStage));
    graph.add_stage(Arc::new(ToolExecutionStage));
    graph.add_stage(Arc::new(ResponseStage));

    graph.set_entry(StageId::Setup);
    graph.add_edge(StageId::Setup, Target::Stage(StageId::ConversationalQa));
    graph.add_branch(StageId::ConversationalQa, route_after_qa, QaRoute::targets());
    graph.add_edge(StageId::Clarify, Target::Stage(StageId::SqlGeneration));
    graph.add_branch(StageId::SqlGeneration, route_after_sql, SqlRoute::targets());
    graph.add_edge(StageId::ToolExecution, Target::Stage(StageId::SqlGeneration));
    graph.add_edge(StageId::Response, Target::End);

    graph
}

/// result of one answered question
#[derive(Debug, Clone)]
pub struct AskOutcome {
    pub response: String,
    pub messages: Vec<Message>,
    pub trace: Vec<StageId>,
    pub state: AgentState,
}

impl AskOutcome {
    pub fn visits(&self, stage: StageId) -> usize {
        self.trace.iter().filter(|s| **s == stage).count()
    }
}

/// the assembled agent: graph plus the collaborators every run shares
pub struct Agent {
    executor: GraphExecutor,
    ctx: StageContext,
}

impl Agent {
    pub fn new(ctx: StageContext) -> Result<Self> {
        let executor = GraphExecutor::new(build_agent_graph(), ctx.config.max_graph_steps)?;
        Ok(Self { executor, ctx })
    }

    pub fn graph(&self) -> &StageGraph {
        self.executor.graph()
    }

    /// answer one question against the caller's history
    #[tracing::instrument(skip(self, user_input, history), fields(history_len = history.len()))]
    pub async fn ask(&self, user_input: &str, history: Vec<Message>) -> Result<AskOutcome> {
        if user_input.trim().is_empty() {
            return Err(SamvadaError::InvalidRequest(
                "user_input must not be empty".to_string(),
            ));
        }

        let outcome = self
            .executor
            .run(AgentState::new(user_input, history), &self.ctx)
            .await?;

        let response = outcome
            .state
            .last_message()
            .filter(|m| m.role == MessageRole::Assistant)
            .map(|m| m.content.clone())
            .ok_or_else(|| SamvadaError::Graph("run finished without an answer".to_string()))?;

        tracing::info!(
            steps = outcome.trace.len(),
            completed = outcome.state.is_completed(),
            "question answered"
        );

        Ok(AskOutcome {
            response,
            messages: outcome.state.messages().to_vec(),
            trace: outcome.trace,
            state: outcome.state,
        })
    }
}
