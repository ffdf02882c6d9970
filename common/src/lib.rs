pub mod agent;
pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod graph;
pub mod llm;
pub mod schema;
pub mod tools;
pub mod tracing;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Result, SamvadaError};
