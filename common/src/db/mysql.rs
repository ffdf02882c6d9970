use crate::config::DatabaseConfig;
use crate::db::{validate_identifier, Database, QueryOutput, TableInfo};
use crate::error::Result;
use async_trait::async_trait;
use sqlx::mysql::{MySqlColumn, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{Column, Executor, Row, Statement, TypeInfo, ValueRef};

/// mysql-backed store; the pool tolerates concurrent requests
pub struct MySqlDatabase {
    pool: MySqlPool,
}

impl MySqlDatabase {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        tracing::info!(uri = %config.redacted(), "connecting to database");

        let pool = MySqlPoolOptions::new()
            .max_connections(8)
            .connect(&config.connection_string())
            .await?;

        tracing::info!("database connection established");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// column names from the prepared statement, for results with no row to read them from
    async fn describe_columns(&self, sql: &str) -> Vec<String> {
        match (&self.pool).prepare(sql).await {
            Ok(statement) => column_names(statement.columns()),
            Err(e) => {
                tracing::debug!("could not describe statement: {}", e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl Database for MySqlDatabase {
    fn dialect(&self) -> &str {
        "mysql"
    }

    #[tracing::instrument(skip(self), fields(db.dialect = "mysql"))]
    async fn run(&self, sql: &str) -> Result<QueryOutput> {
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;
        let columns = match rows.first() {
            Some(row) => column_names(row.columns()),
            None => self.describe_columns(sql).await,
        };
        let output = rows_to_output(columns, &rows);
        tracing::debug!(row_count = output.rows.len(), "query executed");
        Ok(output)
    }

    #[tracing::instrument(skip(self))]
    async fn table_info(&self, table: &str, sample_rows: usize) -> Result<TableInfo> {
        let table = validate_identifier(table)?;

        let create = sqlx::query(&format!("SHOW CREATE TABLE `{}`", table))
            .fetch_one(&self.pool)
            .await?;
        // second column holds the statement
        let ddl: String = create.try_get(1)?;

        let sample = if sample_rows == 0 {
            QueryOutput::default()
        } else {
            self.run(&format!("SELECT * FROM `{}` LIMIT {}", table, sample_rows))
                .await?
        };

        Ok(TableInfo {
            name: table.to_string(),
            ddl: ddl.trim().to_string(),
            sample,
        })
    }
}

fn column_names(columns: &[MySqlColumn]) -> Vec<String> {
    columns.iter().map(|c| c.name().to_string()).collect()
}

fn rows_to_output(columns: Vec<String>, rows: &[MySqlRow]) -> QueryOutput {
    let rows = rows
        .iter()
        .map(|row| (0..row.len()).map(|idx| cell_to_string(row, idx)).collect())
        .collect();

    QueryOutput { columns, rows }
}

fn cell_to_string(row: &MySqlRow, idx: usize) -> Option<String> {
    match row.try_get_raw(idx) {
        Ok(raw) if raw.is_null() => return None,
        Ok(_) => {}
        Err(e) => return Some(format!("<{}>", e)),
    }

    let type_name = row.columns()[idx].type_info().name().to_uppercase();

    let rendered = match type_name.as_str() {
        "BOOLEAN" => row.try_get::<bool, _>(idx).map(|v| v.to_string()),
        name if name.ends_with("UNSIGNED") => row.try_get::<u64, _>(idx).map(|v| v.to_string()),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            row.try_get::<i64, _>(idx).map(|v| v.to_string())
        }
        "FLOAT" | "DOUBLE" => row.try_get::<f64, _>(idx).map(|v| v.to_string()),
        "DECIMAL" => row
            .try_get::<sqlx::types::BigDecimal, _>(idx)
            .map(|v| v.to_string()),
        "DATE" => row
            .try_get::<chrono::NaiveDate, _>(idx)
            .map(|v| v.to_string()),
        "TIME" => row
            .try_get::<chrono::NaiveTime, _>(idx)
            .map(|v| v.to_string()),
        "DATETIME" => row
            .try_get::<chrono::NaiveDateTime, _>(idx)
            .map(|v| v.to_string()),
        "TIMESTAMP" => row
            .try_get::<chrono::DateTime<chrono::Utc>, _>(idx)
            .map(|v| v.naive_utc().to_string()),
        "JSON" => row
            .try_get::<serde_json::Value, _>(idx)
            .map(|v| v.to_string()),
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BIT" => row
            .try_get::<Vec<u8>, _>(idx)
            .map(|v| String::from_utf8_lossy(&v).into_owned()),
        _ => row.try_get::<String, _>(idx),
    };

    Some(rendered.unwrap_or_else(|e| {
        tracing::warn!(column = idx, column_type = %type_name, "could not decode value: {}", e);
        format!("<{}>", type_name.to_lowercase())
    }))
}

impl From<MySqlPool> for MySqlDatabase {
    fn from(pool: MySqlPool) -> Self {
        Self::from_pool(pool)
    }
}
