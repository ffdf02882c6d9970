use crate::agent::state::AgentState;
use crate::error::{Result, SamvadaError};
use crate::graph::stage::{StageContext, StageId};
use crate::graph::stage_graph::{StageGraph, Target};
use tracing::Instrument;

/// final state of a run plus the stages visited, in order
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub state: AgentState,
    pub trace: Vec<StageId>,
}

impl RunOutcome {
    /// how many times a stage ran
    pub fn visits(&self, stage: StageId) -> usize {
        self.trace.iter().filter(|s| **s == stage).count()
    }
}

/// runs a stage graph one stage at a time until it reaches the end
pub struct GraphExecutor {
    graph: StageGraph,
    max_steps: usize,
}

impl GraphExecutor {
    /// create a new executor for the given graph
    pub fn new(graph: StageGraph, max_steps: usize) -> Result<Self> {
        graph.validate()?;
        if max_steps == 0 {
            return Err(SamvadaError::Config(
                "max graph steps must be at least 1".to_string(),
            ));
        }
        Ok(Self { graph, max_steps })
    }

    pub fn graph(&self) -> &StageGraph {
        &self.graph
    }

    /// execute from the entry stage; stops at the end, on the first failure, or at the step limit
    pub async fn run(&self, state: AgentState, ctx: &StageContext) -> Result<RunOutcome> {
        let span = tracing::info_span!("graph_executor::run", graph.max_steps = self.max_steps);

        async move {
            let mut state = state;
            let mut current = self.graph.entry()?;
            let mut trace = Vec::new();

            loop {
                if trace.len() >= self.max_steps {
                    tracing::error!(steps = trace.len(), "step limit reached");
                    return Err(SamvadaError::StepLimit {
                        limit: self.max_steps,
                    });
                }

                let stage = self.graph.stage(current)?;
                let step = trace.len();

                // each stage gets its own span for observability
                let stage_span = tracing::info_span!(
                    "stage",
                    stage.id = %current,
                    stage.step = step,
                    otel.kind = "internal"
                );

                let start = std::time::Instant::now();
                state = stage
                    .run(state, ctx)
                    .instrument(stage_span)
                    .await
                    .map_err(|e| {
                        tracing::error!(stage = %current, "stage failed: {}", e);
                        e.in_stage(current)
                    })?;

                trace.push(current);
                tracing::debug!(
                    stage = %current,
                    stage.duration_ms = start.elapsed().as_millis() as u64,
                    "stage completed"
                );

                match self.graph.next(current, &state)? {
                    Target::Stage(next) => {
                        tracing::debug!(from = %current, to = %next, "routing");
                        current = next;
                    }
                    Target::End => break,
                }
            }

            tracing::info!(steps = trace.len(), "graph run complete");
            Ok(RunOutcome { state, trace })
        }
        .instrument(span)
        .await
    }
}
