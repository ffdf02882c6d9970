use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use common::agent::{build_agent_graph, Agent};
use common::api::{create_router, AskRequest, HistoryTurn};
use common::config::{
    AgentConfig, DatabaseConfig, LlmConfig, ServerConfig, DEFAULT_BIND, DEFAULT_SCHEMA_TABLES,
};
use common::db::MySqlDatabase;
use common::graph::StageContext;
use common::llm::HostedModel;
use common::schema::get_schema_context;
use common::tracing::init_tracing;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "samvada")]
#[command(about = "conversational question answering over an erp database", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API
    Serve {
        /// Address to listen on
        #[arg(long, env = "SAMVADA_BIND", default_value = DEFAULT_BIND)]
        bind: String,

        #[command(flatten)]
        db: DatabaseArgs,

        #[command(flatten)]
        llm: LlmArgs,

        #[command(flatten)]
        agent: AgentArgs,
    },
    /// Answer a single question and print the reply
    Ask {
        /// The question to answer
        question: String,

        /// Prior turns, oldest first, alternating assistant and human
        #[arg(long = "history")]
        history: Vec<String>,

        /// Print the full exchange as JSON
        #[arg(long, default_value = "false")]
        json: bool,

        #[command(flatten)]
        db: DatabaseArgs,

        #[command(flatten)]
        llm: LlmArgs,

        #[command(flatten)]
        agent: AgentArgs,
    },
    /// Print the schema context injected into sql generation
    Schema {
        #[command(flatten)]
        db: DatabaseArgs,

        #[command(flatten)]
        agent: AgentArgs,
    },
    /// Print the workflow graph as a mermaid flowchart
    Graph,
}

#[derive(Args)]
struct DatabaseArgs {
    /// Full connection string, overrides the individual fields
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[arg(long, env = "MYSQL_USERNAME", default_value = "root")]
    mysql_username: String,

    #[arg(long, env = "MYSQL_PASSWORD", default_value = "test", hide_env_values = true)]
    mysql_password: String,

    #[arg(long, env = "MYSQL_HOST", default_value = "localhost")]
    mysql_host: String,

    #[arg(long, env = "MYSQL_PORT", default_value = "3306")]
    mysql_port: u16,

    #[arg(long, env = "MYSQL_DB", default_value = "erp")]
    mysql_db: String,
}

impl From<DatabaseArgs> for DatabaseConfig {
    fn from(args: DatabaseArgs) -> Self {
        Self {
            url: args.database_url,
            username: args.mysql_username,
            password: args.mysql_password,
            host: args.mysql_host,
            port: args.mysql_port,
            database: args.mysql_db,
        }
    }
}

#[derive(Args)]
struct LlmArgs {
    /// API key for the hosted model
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    api_key: String,

    /// OpenAI-compatible endpoint base
    #[arg(long, env = "SAMVADA_LLM_BASE_URL")]
    llm_base_url: Option<String>,

    #[arg(long, env = "SAMVADA_MODEL")]
    model: Option<String>,

    #[arg(long, env = "SAMVADA_TEMPERATURE", default_value = "0")]
    temperature: f32,
}

impl From<LlmArgs> for LlmConfig {
    fn from(args: LlmArgs) -> Self {
        let defaults = LlmConfig::default();
        Self {
            api_key: args.api_key,
            base_url: args.llm_base_url.unwrap_or(defaults.base_url),
            model: args.model.unwrap_or(defaults.model),
            temperature: args.temperature,
            max_tokens: defaults.max_tokens,
        }
    }
}

#[derive(Args)]
struct AgentArgs {
    /// Tables described to the model
    #[arg(long = "table", value_delimiter = ',', default_values_t = DEFAULT_SCHEMA_TABLES.map(String::from))]
    tables: Vec<String>,

    /// Sample rows shown per table
    #[arg(long, env = "SAMVADA_SAMPLE_ROWS", default_value = "3")]
    sample_rows: usize,

    /// Tool rounds allowed before a request is aborted
    #[arg(long, env = "SAMVADA_MAX_TOOL_ITERATIONS", default_value = "8")]
    max_tool_iterations: usize,

    /// Stage executions allowed before a request is aborted
    #[arg(long, env = "SAMVADA_MAX_GRAPH_STEPS", default_value = "64")]
    max_graph_steps: usize,
}

impl From<AgentArgs> for AgentConfig {
    fn from(args: AgentArgs) -> Self {
        Self {
            schema_tables: args.tables,
            sample_rows: args.sample_rows,
            max_tool_iterations: args.max_tool_iterations,
            max_graph_steps: args.max_graph_steps,
        }
    }
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Serve {
                bind,
                db,
                llm,
                agent,
            } => serve(ServerConfig { bind }, db.into(), llm.into(), agent.into()).await,
            Commands::Ask {
                question,
                history,
                json,
                db,
                llm,
                agent,
            } => ask(question, history, json, db.into(), llm.into(), agent.into()).await,
            Commands::Schema { db, agent } => print_schema(db.into(), agent.into()).await,
            Commands::Graph => {
                println!("{}", build_agent_graph().to_mermaid());
                Ok(())
            }
        }
    }
}

async fn build_agent(db: DatabaseConfig, llm: LlmConfig, agent: AgentConfig) -> Result<Agent> {
    let database = MySqlDatabase::connect(&db)
        .await
        .context("failed to connect to database")?;
    let model = HostedModel::new(llm).context("failed to configure model client")?;

    let ctx = StageContext::new(Arc::new(model), Arc::new(database), agent);
    Ok(Agent::new(ctx)?)
}

async fn serve(
    server: ServerConfig,
    db: DatabaseConfig,
    llm: LlmConfig,
    agent: AgentConfig,
) -> Result<()> {
    let _guard = init_tracing("samvada")?;

    tracing::info!(model = %llm.model, database = %db.redacted(), "starting samvada");
    let agent = Arc::new(build_agent(db, llm, agent).await?);
    let app = create_router(agent);

    let listener = tokio::net::TcpListener::bind(&server.bind)
        .await
        .with_context(|| format!("failed to bind to {}", server.bind))?;

    tracing::info!("samvada listening on http://{}", server.bind);
    tracing::info!("  POST /ask     - answer a question");
    tracing::info!("  GET  /health  - liveness");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("shutting down");
        })
        .await
        .context("server error")
}

async fn ask(
    question: String,
    history: Vec<String>,
    json: bool,
    db: DatabaseConfig,
    llm: LlmConfig,
    agent: AgentConfig,
) -> Result<()> {
    let _guard = init_tracing("samvada")?;

    let request = AskRequest {
        user_input: question,
        messages: history.into_iter().map(HistoryTurn::Text).collect(),
    };

    let agent = build_agent(db, llm, agent).await?;
    let outcome = agent.ask(&request.user_input, request.history()).await?;

    tracing::info!(
        stages = ?outcome.trace.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
        "run finished"
    );

    if json {
        let body = serde_json::json!({
            "response": outcome.response,
            "messages": outcome.messages.iter().map(|m| m.content.as_str()).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        println!("{}", outcome.response);
    }

    Ok(())
}

async fn print_schema(db: DatabaseConfig, agent: AgentConfig) -> Result<()> {
    let _guard = init_tracing("samvada")?;

    let database = MySqlDatabase::connect(&db)
        .await
        .context("failed to connect to database")?;
    let context = get_schema_context(&database, &agent.schema_tables, agent.sample_rows).await?;

    println!("{}", context);
    Ok(())
}
