pub mod routes;
pub mod types;

pub use routes::{create_router, ApiError, ApiState};
pub use types::{AskRequest, AskResponse, ErrorResponse, HistoryRole, HistoryTurn};
