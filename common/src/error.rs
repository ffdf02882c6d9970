use crate::graph::StageId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SamvadaError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("model error: {0}")]
    Model(String),

    #[error("tool error: {0}")]
    Tool(String),

    #[error("graph error: {0}")]
    Graph(String),

    #[error("graph exceeded {limit} stage executions without reaching the end")]
    StepLimit { limit: usize },

    #[error("model requested more than {limit} tool rounds")]
    ToolLoopExhausted { limit: usize },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("tracing initialization failed: {0}")]
    Tracing(String),

    #[error("stage {stage} failed: {source}")]
    Stage {
        stage: StageId,
        #[source]
        source: Box<SamvadaError>,
    },
}

impl SamvadaError {
    /// wrap an error with the stage that raised it, leaving already tagged errors alone
    pub fn in_stage(self, stage: StageId) -> Self {
        match self {
            tagged @ SamvadaError::Stage { .. } => tagged,
            other => SamvadaError::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// the stage a failure was raised in, if known
    pub fn stage(&self) -> Option<StageId> {
        match self {
            SamvadaError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// innermost error, skipping stage tags
    pub fn root(&self) -> &SamvadaError {
        match self {
            SamvadaError::Stage { source, .. } => source.root(),
            other => other,
        }
    }

    /// true when the failure came from an upstream dependency (model or database)
    pub fn is_upstream(&self) -> bool {
        matches!(
            self.root(),
            SamvadaError::Http(_) | SamvadaError::Database(_) | SamvadaError::Model(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SamvadaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_stage_does_not_double_wrap() {
        let err = SamvadaError::Model("rate limited".to_string())
            .in_stage(StageId::Clarify)
            .in_stage(StageId::SqlGeneration);

        assert_eq!(err.stage(), Some(StageId::Clarify));
        assert!(matches!(err.root(), SamvadaError::Model(_)));
        assert!(err.is_upstream());
    }

    #[test]
    fn test_stage_error_message_names_stage() {
        let err = SamvadaError::Tool("boom".to_string()).in_stage(StageId::ToolExecution);
        assert_eq!(err.to_string(), "stage tool_execution failed: tool error: boom");
        assert!(!err.is_upstream());
    }
}
