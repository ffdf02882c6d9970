use crate::agent::state::AgentState;
use crate::error::{Result, SamvadaError};
use crate::graph::stage::{Stage, StageId};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Arc;

/// where control goes after a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Stage(StageId),
    End,
}

/// routing function attached to a conditional edge
pub type RouteFn = fn(&AgentState) -> Target;

#[derive(Clone)]
pub enum Edge {
    Direct(Target),
    /// `targets` lists every destination `route` may pick
    Branch { route: RouteFn, targets: Vec<Target> },
}

impl Edge {
    fn targets(&self) -> Vec<Target> {
        match self {
            Edge::Direct(target) => vec![*target],
            Edge::Branch { targets, .. } => targets.clone(),
        }
    }
}

/// directed graph of stages; cycles are allowed as long as every stage can reach the end
#[derive(Clone, Default)]
pub struct StageGraph {
    entry: Option<StageId>,
    stages: BTreeMap<StageId, Arc<dyn Stage>>,
    edges: BTreeMap<StageId, Edge>,
}

impl StageGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_stage(&mut self, stage: Arc<dyn Stage>) {
        self.stages.insert(stage.id(), stage);
    }

    pub fn set_entry(&mut self, stage: StageId) {
        self.entry = Some(stage);
    }

    pub fn add_edge(&mut self, from: StageId, to: Target) {
        self.edges.insert(from, Edge::Direct(to));
    }

    pub fn add_branch(&mut self, from: StageId, route: RouteFn, targets: Vec<Target>) {
        self.edges.insert(from, Edge::Branch { route, targets });
    }

    pub fn entry(&self) -> Result<StageId> {
        self.entry
            .ok_or_else(|| SamvadaError::Graph("graph has no entry stage".to_string()))
    }

    pub fn stage(&self, id: StageId) -> Result<&Arc<dyn Stage>> {
        self.stages
            .get(&id)
            .ok_or_else(|| SamvadaError::Graph(format!("stage not registered: {}", id)))
    }

    /// check entry, edges and that the end is reachable from every stage
    pub fn validate(&self) -> Result<()> {
        let entry = self.entry()?;
        if !self.stages.contains_key(&entry) {
            return Err(SamvadaError::Graph(format!(
                "entry stage '{}' is not registered",
                entry
            )));
        }

        for id in self.stages.keys() {
            if !self.edges.contains_key(id) {
                return Err(SamvadaError::Graph(format!(
                    "stage '{}' has no outgoing edge",
                    id
                )));
            }
        }

        for (from, edge) in &self.edges {
            if !self.stages.contains_key(from) {
                return Err(SamvadaError::Graph(format!(
                    "edge leaves unregistered stage '{}'",
                    from
                )));
            }

            let targets = edge.targets();
            if targets.is_empty() {
                return Err(SamvadaError::Graph(format!(
                    "branch from '{}' declares no targets",
                    from
                )));
            }

            for target in targets {
                if let Target::Stage(to) = target {
                    if !self.stages.contains_key(&to) {
                        return Err(SamvadaError::Graph(format!(
                            "stage '{}' routes to unregistered stage '{}'",
                            from, to
                        )));
                    }
                }
            }
        }

        let reaching_end = self.stages_reaching_end();
        for id in self.stages.keys() {
            if !reaching_end.contains(id) {
                return Err(SamvadaError::Graph(format!(
                    "stage '{}' can never reach the end",
                    id
                )));
            }
        }

        Ok(())
    }

    /// walk edges backwards from the end
    fn stages_reaching_end(&self) -> HashSet<StageId> {
        let mut reached = HashSet::new();
        let mut queue = VecDeque::from([Target::End]);

        while let Some(current) = queue.pop_front() {
            for (from, edge) in &self.edges {
                if !reached.contains(from) && edge.targets().contains(&current) {
                    reached.insert(*from);
                    queue.push_back(Target::Stage(*from));
                }
            }
        }

        reached
    }

    /// pick the successor of `from` for the given state
    pub fn next(&self, from: StageId, state: &AgentState) -> Result<Target> {
        let edge = self
            .edges
            .get(&from)
            .ok_or_else(|| SamvadaError::Graph(format!("stage '{}' has no outgoing edge", from)))?;

        match edge {
            Edge::Direct(target) => Ok(*target),
            Edge::Branch { route, targets } => {
                let target = route(state);
                if targets.contains(&target) {
                    Ok(target)
                } else {
                    Err(SamvadaError::Graph(format!(
                        "routing from '{}' picked undeclared target {:?}",
                        from, target
                    )))
                }
            }
        }
    }

    /// mermaid flowchart; dotted arrows are conditional
    pub fn to_mermaid(&self) -> String {
        let mut lines = vec!["graph TD;".to_string()];

        if let Some(entry) = self.entry {
            lines.push(format!("    __start__ --> {};", entry));
        }

        for (from, edge) in &self.edges {
            let arrow = match edge {
                Edge::Direct(_) => "-->",
                Edge::Branch { .. } => "-.->",
            };
            for target in edge.targets() {
                let to = match target {
                    Target::Stage(id) => id.as_str(),
                    Target::End => "__end__",
                };
                lines.push(format!("    {} {} {};", from, arrow, to));
            }
        }

        lines.join("\n")
    }
}
