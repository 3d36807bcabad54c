mod api;
mod app_config;
mod cli;
mod queries;
mod router;
mod sql_policy;
mod startup;
mod state;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use analytics_athena::RowTable;

use crate::app_config::{load_config, Config};
use crate::cli::{Cli, Command};

async fn serve(config: &Config) -> anyhow::Result<()> {
    let state = startup::build_app_state(config).await;
    let app = router::build_router(state, &config.server.cors_origin);

    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);
    info!("API docs at http://{}/docs", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn run_query(
    config: &Config,
    name: Option<&str>,
    sql: Option<&str>,
    database: Option<&str>,
) -> anyhow::Result<()> {
    let sql = match (name, sql) {
        (_, Some(sql)) => sql,
        (Some(name), None) => {
            queries::find(name)
                .with_context(|| format!("Unknown query '{name}'; run `list` to see names"))?
                .sql
        }
        (None, None) => anyhow::bail!("Provide a query name or --sql"),
    };

    let executor = startup::build_executor(&config.athena).await;
    let database = database.unwrap_or(executor.database());
    let result = executor.run_in(sql, database).await;

    if let Some(handle) = &result.handle {
        info!(query_id = %handle, elapsed_ms = result.elapsed_ms(), "Query finished");
    }
    let rows = result.outcome?;
    println!("{}", RowTable(&rows));
    Ok(())
}

fn list_queries() {
    for q in queries::ALL.iter() {
        println!("{:<24} {}", q.name, q.description);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let command = Cli::parse().into_command();
    let config = load_config();
    config.log_summary();

    match command {
        Command::Serve => serve(&config).await?,
        Command::Query {
            name,
            sql,
            database,
        } => run_query(&config, name.as_deref(), sql.as_deref(), database.as_deref()).await?,
        Command::List => list_queries(),
    }

    Ok(())
}
