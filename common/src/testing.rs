//! test doubles for the model and the database

use crate::db::{Database, QueryOutput, TableInfo};
use crate::error::{Result, SamvadaError};
use crate::llm::{ChatModel, Message, ToolCall, ToolSpec};
use async_trait::async_trait;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// one request seen by the scripted model
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub messages: Vec<Message>,
    pub tool_names: Vec<String>,
}

impl RecordedCall {
    /// text of the first turn, where every stage puts its prompt
    pub fn prompt(&self) -> &str {
        self.messages.first().map(|m| m.content.as_str()).unwrap_or_default()
    }
}

/// replays queued replies in order and records every request
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<Message>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, content: &str) -> Self {
        self.push(Ok(Message::assistant(content)))
    }

    pub fn call_tool(self, name: &str, arguments: serde_json::Value) -> Self {
        let id = format!("call_{}", self.replies.lock().unwrap().len());
        self.push(Ok(Message::assistant_with_tool_calls(
            "",
            vec![ToolCall {
                id,
                name: name.to_string(),
                arguments,
            }],
        )))
    }

    pub fn execute_query(self, sql: &str) -> Self {
        self.call_tool("execute_query", json!({ "query": sql }))
    }

    pub fn save_result(self, result: &str) -> Self {
        self.call_tool("save_result", json!({ "result": result }))
    }

    pub fn fail(self, message: &str) -> Self {
        self.push(Err(SamvadaError::Model(message.to_string())))
    }

    fn push(self, reply: Result<Message>) -> Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, messages: Vec<Message>, tools: &[ToolSpec]) -> Result<Message> {
        self.calls.lock().unwrap().push(RecordedCall {
            messages,
            tool_names: tools.iter().map(|t| t.name.clone()).collect(),
        });

        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(SamvadaError::Model("script exhausted".to_string())))
    }
}

/// in-memory database with canned tables and query results
#[derive(Default)]
pub struct FakeDatabase {
    tables: HashMap<String, TableInfo>,
    results: Mutex<VecDeque<Result<QueryOutput>>>,
    executed: Mutex<Vec<String>>,
}

impl FakeDatabase {
    /// the two erp tables the agent describes
    pub fn erp() -> Self {
        let mut tables = HashMap::new();
        tables.insert(
            "sales_order".to_string(),
            TableInfo {
                name: "sales_order".to_string(),
                ddl: "CREATE TABLE `sales_order` (\n  `SO_ID` int NOT NULL,\n  `CUSTOMER_ID` int,\n  `STAGE_STATUS_ID` int,\n  `SO_TYPE_ID` int,\n  `DELIVERY_DATE` datetime\n)".to_string(),
                sample: QueryOutput::new(
                    vec![
                        "SO_ID".to_string(),
                        "CUSTOMER_ID".to_string(),
                        "STAGE_STATUS_ID".to_string(),
                        "SO_TYPE_ID".to_string(),
                        "DELIVERY_DATE".to_string(),
                    ],
                    vec![
                        vec![
                            Some("1".to_string()),
                            Some("10".to_string()),
                            Some("3".to_string()),
                            Some("1".to_string()),
                            Some("2026-10-17 09:00:00".to_string()),
                        ],
                        vec![
                            Some("2".to_string()),
                            Some("11".to_string()),
                            Some("1".to_string()),
                            Some("2".to_string()),
                            None,
                        ],
                    ],
                ),
            },
        );
        tables.insert(
            "customer".to_string(),
            TableInfo {
                name: "customer".to_string(),
                ddl: "CREATE TABLE `customer` (\n  `CUSTOMER_ID` int NOT NULL,\n  `NAME` varchar(120)\n)".to_string(),
                sample: QueryOutput::new(
                    vec!["CUSTOMER_ID".to_string(), "NAME".to_string()],
                    vec![vec![Some("10".to_string()), Some("Acme Corp".to_string())]],
                ),
            },
        );

        Self {
            tables,
            ..Self::default()
        }
    }

    pub fn with_table(mut self, info: TableInfo) -> Self {
        self.tables.insert(info.name.clone(), info);
        self
    }

    pub fn with_result(self, output: QueryOutput) -> Self {
        self.results.lock().unwrap().push_back(Ok(output));
        self
    }

    pub fn with_failure(self, message: &str) -> Self {
        self.results
            .lock()
            .unwrap()
            .push_back(Err(SamvadaError::Tool(message.to_string())));
        self
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Database for FakeDatabase {
    fn dialect(&self) -> &str {
        "mysql"
    }

    async fn run(&self, sql: &str) -> Result<QueryOutput> {
        self.executed.lock().unwrap().push(sql.to_string());
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(QueryOutput::default()))
    }

    async fn table_info(&self, table: &str, sample_rows: usize) -> Result<TableInfo> {
        let mut info = self
            .tables
            .get(table)
            .cloned()
            .ok_or_else(|| SamvadaError::Tool(format!("table {} does not exist", table)))?;
        info.sample.rows.truncate(sample_rows);
        Ok(info)
    }
}

/// single-cell result
pub fn scalar(column: &str, value: &str) -> QueryOutput {
    QueryOutput::new(vec![column.to_string()], vec![vec![Some(value.to_string())]])
}
