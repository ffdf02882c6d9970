use crate::agent::state::AgentState;
use crate::graph::{StageId, Target};

/// decision after the conversational short-circuit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QaRoute {
    Exit,
    Clarify,
}

impl QaRoute {
    pub fn decide(state: &AgentState) -> Self {
        if state.is_completed() {
            QaRoute::Exit
        } else {
            QaRoute::Clarify
        }
    }

    pub fn target(self) -> Target {
        match self {
            QaRoute::Exit => Target::Stage(StageId::Response),
            QaRoute::Clarify => Target::Stage(StageId::Clarify),
        }
    }

    pub fn targets() -> Vec<Target> {
        vec![QaRoute::Exit.target(), QaRoute::Clarify.target()]
    }
}

/// decision after each sql generation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlRoute {
    Exit,
    ToolsUse,
}

impl SqlRoute {
    pub fn decide(state: &AgentState) -> Self {
        match state.last_message() {
            Some(message) if message.has_tool_calls() => SqlRoute::ToolsUse,
            _ => SqlRoute::Exit,
        }
    }

    pub fn target(self) -> Target {
        match self {
            SqlRoute::Exit => Target::Stage(StageId::Response),
            SqlRoute::ToolsUse => Target::Stage(StageId::ToolExecution),
        }
    }

    pub fn targets() -> Vec<Target> {
        vec![SqlRoute::Exit.target(), SqlRoute::ToolsUse.target()]
    }
}

pub fn route_after_qa(state: &AgentState) -> Target {
    let route = QaRoute::decide(state);
    tracing::info!(route = ?route, "conversational short-circuit routing");
    route.target()
}

pub fn route_after_sql(state: &AgentState) -> Target {
    let route = SqlRoute::decide(state);
    tracing::info!(route = ?route, "sql generation routing");
    route.target()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{Message, ToolCall};
    use serde_json::json;

    #[test]
    fn test_qa_route() {
        let mut state = AgentState::new("hi", vec![]);
        assert_eq!(route_after_qa(&state), Target::Stage(StageId::Clarify));

        state.mark_completed();
        assert_eq!(route_after_qa(&state), Target::Stage(StageId::Response));
    }

    #[test]
    fn test_sql_route_follows_pending_tool_calls() {
        let mut state = AgentState::new("q", vec![]);
        state.push_turn(Message::assistant_with_tool_calls(
            "",
            vec![ToolCall {
                id: "call_1".to_string(),
                name: "execute_query".to_string(),
                arguments: json!({"query": "SELECT 1"}),
            }],
        ));
        assert_eq!(route_after_sql(&state), Target::Stage(StageId::ToolExecution));

        state.push_turn(Message::assistant("done"));
        assert_eq!(route_after_sql(&state), Target::Stage(StageId::Response));
    }

    #[test]
    fn test_sql_route_with_no_messages_exits() {
        let state = AgentState::new("q", vec![]);
        assert_eq!(SqlRoute::decide(&state), SqlRoute::Exit);
    }

    #[test]
    fn test_declared_targets_cover_every_variant() {
        assert_eq!(QaRoute::targets().len(), 2);
        assert!(SqlRoute::targets().contains(&SqlRoute::ToolsUse.target()));
    }
}
