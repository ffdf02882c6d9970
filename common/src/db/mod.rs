pub mod mysql;

pub use mysql::MySqlDatabase;

use crate::error::{Result, SamvadaError};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

/// sample-row values longer than this are cut in schema context
pub const SAMPLE_VALUE_MAX_CHARS: usize = 100;

static IDENTIFIER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// tabular result of a query with every value rendered as text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOutput {
    pub columns: Vec<String>,
    /// `None` marks sql null
    pub rows: Vec<Vec<Option<String>>>,
}

impl QueryOutput {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        Self { columns, rows }
    }

    /// pipe-separated table handed back to the model as a tool result
    pub fn render(&self) -> String {
        if self.rows.is_empty() {
            return if self.columns.is_empty() {
                "(no rows)".to_string()
            } else {
                format!("{}\n(no rows)", self.columns.join(" | "))
            };
        }

        let mut lines = Vec::with_capacity(self.rows.len() + 1);
        lines.push(self.columns.join(" | "));
        for row in &self.rows {
            lines.push(
                row.iter()
                    .map(|v| v.as_deref().unwrap_or("NULL"))
                    .collect::<Vec<_>>()
                    .join(" | "),
            );
        }
        lines.join("\n")
    }

    /// tab-separated rows with long values truncated, used for schema samples
    pub fn render_sample(&self) -> String {
        let mut lines = Vec::with_capacity(self.rows.len() + 1);
        lines.push(self.columns.join("\t"));
        for row in &self.rows {
            lines.push(
                row.iter()
                    .map(|v| {
                        truncate_chars(v.as_deref().unwrap_or("None"), SAMPLE_VALUE_MAX_CHARS)
                    })
                    .collect::<Vec<_>>()
                    .join("\t"),
            );
        }
        lines.join("\n")
    }
}

fn truncate_chars(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((idx, _)) => value[..idx].to_string(),
        None => value.to_string(),
    }
}

/// reject anything that is not a bare sql identifier
pub fn validate_identifier(name: &str) -> Result<&str> {
    if IDENTIFIER_REGEX.is_match(name) {
        Ok(name)
    } else {
        Err(SamvadaError::InvalidRequest(format!(
            "'{}' is not a valid table name",
            name
        )))
    }
}

/// ddl plus a handful of rows for one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    pub name: String,
    pub ddl: String,
    pub sample: QueryOutput,
}

/// the relational store the agent reads from
#[async_trait]
pub trait Database: Send + Sync {
    fn dialect(&self) -> &str;

    /// run arbitrary sql and return its rows
    async fn run(&self, sql: &str) -> Result<QueryOutput>;

    /// create statement and the first `sample_rows` rows of `table`
    async fn table_info(&self, table: &str, sample_rows: usize) -> Result<TableInfo>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> QueryOutput {
        QueryOutput::new(
            vec!["SO_ID".to_string(), "REMARKS".to_string()],
            vec![
                vec![Some("1".to_string()), None],
                vec![Some("2".to_string()), Some("x".repeat(150))],
            ],
        )
    }

    #[test]
    fn test_render_table() {
        let rendered = sample().render();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "SO_ID | REMARKS");
        assert_eq!(lines[1], "1 | NULL");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(QueryOutput::default().render(), "(no rows)");
        let headers_only = QueryOutput::new(vec!["n".to_string()], vec![]);
        assert_eq!(headers_only.render(), "n\n(no rows)");
    }

    #[test]
    fn test_render_sample_truncates_values() {
        let rendered = sample().render_sample();
        let last = rendered.lines().last().unwrap();
        let value = last.split('\t').nth(1).unwrap();
        assert_eq!(value.len(), SAMPLE_VALUE_MAX_CHARS);
        assert!(rendered.lines().nth(1).unwrap().ends_with("None"));
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("sales_order").is_ok());
        assert!(validate_identifier("customer; DROP TABLE x").is_err());
        assert!(validate_identifier("").is_err());
    }
}
