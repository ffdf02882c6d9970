pub mod executor;
pub mod stage;
pub mod stage_graph;

pub use executor::{GraphExecutor, RunOutcome};
pub use stage::{Clock, Stage, StageContext, StageId};
pub use stage_graph::{Edge, RouteFn, StageGraph, Target};
