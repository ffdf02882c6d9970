use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

pub const DEFAULT_MODEL: &str = "gemma2-9b-it";
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_BIND: &str = "0.0.0.0:8000";

/// tables whose schema and sample rows are injected into sql generation
pub const DEFAULT_SCHEMA_TABLES: [&str; 2] = ["sales_order", "customer"];

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// full connection string, takes precedence over the individual fields
    pub url: Option<String>,
    pub username: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub database: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            username: "root".to_string(),
            password: "test".to_string(),
            host: "localhost".to_string(),
            port: 3306,
            database: "erp".to_string(),
        }
    }
}

impl DatabaseConfig {
    pub fn connection_string(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }

        format!(
            "mysql://{}:{}@{}:{}/{}",
            utf8_percent_encode(&self.username, NON_ALPHANUMERIC),
            utf8_percent_encode(&self.password, NON_ALPHANUMERIC),
            self.host,
            self.port,
            self.database
        )
    }

    /// connection string safe to log
    pub fn redacted(&self) -> String {
        if let Some(url) = &self.url {
            return redact_url(url);
        }

        format!(
            "mysql://{}:***@{}:{}/{}",
            utf8_percent_encode(&self.username, NON_ALPHANUMERIC),
            self.host,
            self.port,
            self.database
        )
    }
}

fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };

    match rest.rsplit_once('@') {
        Some((credentials, host)) => {
            let user = credentials.split(':').next().unwrap_or_default();
            format!("{}://{}:***@{}", scheme, user, host)
        }
        None => url.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_LLM_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.0,
            max_tokens: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub schema_tables: Vec<String>,
    pub sample_rows: usize,
    /// tool rounds allowed per request before the run is aborted
    pub max_tool_iterations: usize,
    /// stage executions allowed per request before the run is aborted
    pub max_graph_steps: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            schema_tables: DEFAULT_SCHEMA_TABLES.iter().map(|t| t.to_string()).collect(),
            sample_rows: 3,
            max_tool_iterations: 8,
            max_graph_steps: 64,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
}
