pub mod context;

pub use context::{format_table_info, get_schema_context};
