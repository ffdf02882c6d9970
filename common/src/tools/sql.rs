use crate::db::Database;
use crate::error::{Result, SamvadaError};
use crate::llm::{Message, ToolCall, ToolSpec};
use serde_json::{json, Value};
use std::sync::Arc;

pub const EXECUTE_QUERY: &str = "execute_query";
pub const SAVE_RESULT: &str = "save_result";

/// tools the sql generation model may call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlTool {
    ExecuteQuery,
    /// identity pass-through, marks the answer as final
    SaveResult,
}

impl SqlTool {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            EXECUTE_QUERY => Some(SqlTool::ExecuteQuery),
            SAVE_RESULT => Some(SqlTool::SaveResult),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SqlTool::ExecuteQuery => EXECUTE_QUERY,
            SqlTool::SaveResult => SAVE_RESULT,
        }
    }

    pub fn spec(&self) -> ToolSpec {
        match self {
            SqlTool::ExecuteQuery => ToolSpec {
                name: EXECUTE_QUERY.to_string(),
                description: "Execute a SQL query on the database and return the result."
                    .to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "The SQL query to execute"
                        }
                    },
                    "required": ["query"]
                }),
            },
            SqlTool::SaveResult => ToolSpec {
                name: SAVE_RESULT.to_string(),
                description: "Save the query result and mark the answer as final.".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "result": {
                            "type": "string",
                            "description": "The final SQL query result to save"
                        }
                    },
                    "required": ["result"]
                }),
            },
        }
    }
}

pub struct SqlToolSet {
    db: Arc<dyn Database>,
}

impl SqlToolSet {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        [SqlTool::SaveResult, SqlTool::ExecuteQuery]
            .iter()
            .map(SqlTool::spec)
            .collect()
    }

    pub async fn execute_query(&self, sql: &str) -> Result<String> {
        tracing::info!(sql = %sql, "executing generated query");
        let output = self.db.run(sql).await?;
        tracing::info!(row_count = output.rows.len(), "query returned");
        Ok(output.render())
    }

    pub fn save_result(&self, result: &str) -> String {
        tracing::info!(result_len = result.len(), "saving result");
        result.to_string()
    }

    /// run one requested call; failures become an `Error:` tool turn the model can react to
    #[tracing::instrument(skip(self, call), fields(tool.name = %call.name, tool.call_id = %call.id))]
    pub async fn invoke(&self, call: &ToolCall) -> Message {
        let content = match self.dispatch(call).await {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("tool call failed: {}", e);
                format!("Error: {}\n Please fix your mistakes.", e)
            }
        };

        Message::tool(call.id.clone(), content)
    }

    async fn dispatch(&self, call: &ToolCall) -> Result<String> {
        let tool = SqlTool::from_name(&call.name).ok_or_else(|| {
            SamvadaError::Tool(format!(
                "{} is not a valid tool, try one of [{}, {}]",
                call.name, SAVE_RESULT, EXECUTE_QUERY
            ))
        })?;

        match tool {
            SqlTool::ExecuteQuery => {
                let sql = string_argument(&call.arguments, "query")?;
                self.execute_query(&sql).await
            }
            SqlTool::SaveResult => {
                let result = string_argument(&call.arguments, "result")?;
                Ok(self.save_result(&result))
            }
        }
    }
}

fn string_argument(arguments: &Value, key: &str) -> Result<String> {
    match arguments.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Null) | None => Err(SamvadaError::Tool(format!(
            "missing required argument '{}'",
            key
        ))),
        // models sometimes pass numbers or structured results
        Some(other) => Ok(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MessageRole;
    use crate::testing::{scalar, FakeDatabase};

    fn call(name: &str, arguments: Value) -> ToolCall {
        ToolCall {
            id: "call_1".to_string(),
            name: name.to_string(),
            arguments,
        }
    }

    #[tokio::test]
    async fn test_execute_query_runs_sql() {
        let db = Arc::new(FakeDatabase::erp().with_result(scalar("COUNT(*)", "7")));
        let tools = SqlToolSet::new(db.clone());

        let msg = tools
            .invoke(&call(EXECUTE_QUERY, json!({"query": "SELECT COUNT(*) FROM sales_order"})))
            .await;

        assert_eq!(msg.role, MessageRole::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(msg.content, "COUNT(*)\n7");
        assert_eq!(db.executed(), vec!["SELECT COUNT(*) FROM sales_order"]);
    }

    #[tokio::test]
    async fn test_save_result_is_identity() {
        let db = Arc::new(FakeDatabase::erp());
        let tools = SqlToolSet::new(db.clone());

        let msg = tools
            .invoke(&call(SAVE_RESULT, json!({"result": "12 orders"})))
            .await;

        assert_eq!(msg.content, "12 orders");
        assert!(db.executed().is_empty());
    }

    #[tokio::test]
    async fn test_save_result_accepts_non_string_result() {
        let tools = SqlToolSet::new(Arc::new(FakeDatabase::erp()));
        let msg = tools.invoke(&call(SAVE_RESULT, json!({"result": 12}))).await;
        assert_eq!(msg.content, "12");
    }

    #[tokio::test]
    async fn test_database_failure_is_reported_to_model() {
        let db = Arc::new(FakeDatabase::erp().with_failure("Unknown column 'FOO'"));
        let tools = SqlToolSet::new(db);

        let msg = tools
            .invoke(&call(EXECUTE_QUERY, json!({"query": "SELECT FOO FROM sales_order"})))
            .await;

        assert!(msg.content.starts_with("Error: "));
        assert!(msg.content.contains("Unknown column 'FOO'"));
    }

    #[tokio::test]
    async fn test_unknown_tool_and_missing_argument() {
        let tools = SqlToolSet::new(Arc::new(FakeDatabase::erp()));

        let unknown = tools.invoke(&call("drop_tables", json!({}))).await;
        assert!(unknown.content.contains("drop_tables is not a valid tool"));

        let missing = tools.invoke(&call(EXECUTE_QUERY, json!({}))).await;
        assert!(missing.content.contains("missing required argument 'query'"));
    }

    #[test]
    fn test_specs_cover_both_tools() {
        let tools = SqlToolSet::new(Arc::new(FakeDatabase::erp()));
        let names: Vec<String> = tools.specs().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec![SAVE_RESULT, EXECUTE_QUERY]);
        assert_eq!(SqlTool::from_name("execute_query"), Some(SqlTool::ExecuteQuery));
        assert_eq!(SqlTool::SaveResult.name(), "save_result");
    }
}
