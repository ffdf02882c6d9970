use crate::agent::parser::{clean_rewrite, parse_classification, Classification};
use crate::agent::prompt::{
    build_clarification_prompt, build_classification_prompt, build_context_extraction_prompt,
    build_response_prompt, build_sql_prompt,
};
use crate::agent::state::AgentState;
use crate::error::{Result, SamvadaError};
use crate::graph::{Stage, StageContext, StageId};
use crate::llm::{format_transcript, Message};
use crate::schema::get_schema_context;
use async_trait::async_trait;

/// single-prompt plain completion, returns the reply text
async fn complete(ctx: &StageContext, prompt: String) -> Result<String> {
    tracing::debug!(prompt_len = prompt.len(), llm.model = ctx.model.name(), "invoking model");
    let reply = ctx.model.generate(vec![Message::human(prompt)], &[]).await?;
    Ok(reply.content)
}

/// stamps time, loads schema context and opens this request's turns
pub struct SetupStage;

#[async_trait]
impl Stage for SetupStage {
    fn id(&self) -> StageId {
        StageId::Setup
    }

    #[tracing::instrument(skip(self, state, ctx), fields(stage.id = %self.id()))]
    async fn run(&self, mut state: AgentState, ctx: &StageContext) -> Result<AgentState> {
        let schema_context = get_schema_context(
            ctx.db.as_ref(),
            &ctx.config.schema_tables,
            ctx.config.sample_rows,
        )
        .await?;

        let history_len = state.messages().len();
        state.begin_request(ctx.now(), schema_context)?;

        tracing::info!(
            history_len,
            message_index = state.message_index(),
            current_time = %state.current_time_iso(),
            "request initialised"
        );
        Ok(state)
    }
}

/// answers small talk and history-only questions without touching the database
pub struct ConversationalQaStage;

#[async_trait]
impl Stage for ConversationalQaStage {
    fn id(&self) -> StageId {
        StageId::ConversationalQa
    }

    #[tracing::instrument(skip(self, state, ctx), fields(stage.id = %self.id()))]
    async fn run(&self, mut state: AgentState, ctx: &StageContext) -> Result<AgentState> {
        let history = format_transcript(state.messages());
        let output = complete(ctx, build_classification_prompt(&history)).await?;

        match parse_classification(&output) {
            Classification::NeedsDatabase => {
                tracing::info!("question needs a database lookup");
            }
            classification => {
                tracing::info!(classification = ?classification, "answering without the database");
                let answer = classification.answer().unwrap_or_default().to_string();
                state.push_turn(Message::assistant(answer));
                state.mark_completed();
            }
        }

        Ok(state)
    }
}

/// extracts relevant context and rewrites the question as a standalone query
pub struct ClarifyStage;

#[async_trait]
impl Stage for ClarifyStage {
    fn id(&self) -> StageId {
        StageId::Clarify
    }

    #[tracing::instrument(skip(self, state, ctx), fields(stage.id = %self.id()))]
    async fn run(&self, mut state: AgentState, ctx: &StageContext) -> Result<AgentState> {
        if state.is_completed() {
            return Err(SamvadaError::Graph(
                "clarification reached after the request was completed".to_string(),
            ));
        }

        let history = format_transcript(state.messages());

        tracing::info!("updating conversational context");
        let context = complete(ctx, build_context_extraction_prompt(&history)).await?;
        state.set_conversational_context(context.trim().to_string());

        tracing::info!("updating clarified query");
        let rewrite = complete(
            ctx,
            build_clarification_prompt(&history, &state.current_time_iso(), state.user_input()),
        )
        .await?;

        let mut clarified = clean_rewrite(&rewrite);
        if clarified.is_empty() {
            tracing::warn!("model returned an empty rewrite, keeping the original question");
            clarified = state.user_input().trim().to_string();
        }

        tracing::info!(clarified_query = %clarified, "question clarified");
        state.set_clarified_query(clarified)?;
        Ok(state)
    }
}

/// asks the tool-bound model for the next sql step
pub struct SqlGenerationStage;

#[async_trait]
impl Stage for SqlGenerationStage {
    fn id(&self) -> StageId {
        StageId::SqlGeneration
    }

    #[tracing::instrument(skip(self, state, ctx), fields(stage.id = %self.id(), tool_rounds = state.tool_rounds()))]
    async fn run(&self, mut state: AgentState, ctx: &StageContext) -> Result<AgentState> {
        if state.is_completed() {
            return Err(SamvadaError::Graph(
                "sql generation reached after the request was completed".to_string(),
            ));
        }

        let prompt = build_sql_prompt(
            state.clarified_query(),
            state.conversational_context(),
            state.schema_context(),
        );

        // only this request's turns, caller history stays out of the tool loop
        let mut messages = Vec::with_capacity(state.new_turns().len() + 1);
        messages.push(Message::human(prompt));
        messages.extend(state.new_turns().iter().cloned());

        let tools = ctx.tools.specs();
        let response = ctx.model.generate(messages, &tools).await?;

        tracing::info!(
            tool_calls = response.tool_calls.len(),
            content_len = response.content.len(),
            "sql generation turn"
        );
        state.push_turn(response);
        Ok(state)
    }
}

/// runs the tool calls the last turn asked for and appends their results
pub struct ToolExecutionStage;

#[async_trait]
impl Stage for ToolExecutionStage {
    fn id(&self) -> StageId {
        StageId::ToolExecution
    }

    #[tracing::instrument(skip(self, state, ctx), fields(stage.id = %self.id()))]
    async fn run(&self, mut state: AgentState, ctx: &StageContext) -> Result<AgentState> {
        let calls = match state.last_message() {
            Some(message) if message.has_tool_calls() => message.tool_calls.clone(),
            _ => {
                return Err(SamvadaError::Tool(
                    "tool execution reached without a pending tool call".to_string(),
                ))
            }
        };

        let round = state.record_tool_round();
        let limit = ctx.config.max_tool_iterations;
        if round > limit {
            tracing::error!(round, limit, "tool loop exhausted");
            return Err(SamvadaError::ToolLoopExhausted { limit });
        }

        // calls run one after another, in the order requested
        for call in &calls {
            let result = ctx.tools.invoke(call).await;
            state.push_turn(result);
        }

        tracing::info!(round, calls = calls.len(), "tool round complete");
        Ok(state)
    }
}

/// composes the final conversational answer
pub struct ResponseStage;

#[async_trait]
impl Stage for ResponseStage {
    fn id(&self) -> StageId {
        StageId::Response
    }

    #[tracing::instrument(skip(self, state, ctx), fields(stage.id = %self.id()))]
    async fn run(&self, mut state: AgentState, ctx: &StageContext) -> Result<AgentState> {
        if state.is_completed() {
            // short-circuit answers are already final
            tracing::info!("passing through direct answer");
            return Ok(state);
        }

        let working = format_transcript(state.new_turns());
        let answer = complete(ctx, build_response_prompt(state.user_input(), &working)).await?;

        tracing::info!(answer_len = answer.len(), "final answer composed");
        state.push_turn(Message::assistant(answer));
        Ok(state)
    }
}
