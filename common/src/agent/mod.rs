pub mod parser;
pub mod prompt;
pub mod routing;
pub mod stages;
pub mod state;
pub mod workflow;

pub use parser::{clean_rewrite, parse_classification, Classification};
pub use routing::{route_after_qa, route_after_sql, QaRoute, SqlRoute};
pub use state::AgentState;
pub use workflow::{build_agent_graph, Agent, AskOutcome};
