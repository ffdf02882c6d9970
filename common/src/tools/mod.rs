pub mod sql;

pub use sql::{SqlTool, SqlToolSet, EXECUTE_QUERY, SAVE_RESULT};
