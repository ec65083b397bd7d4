use anyhow::Result;
use axum::Router;
use clap::Parser;
use server::open_app;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};
use wordstat_core::AnalyzerConfig;

#[derive(Parser)]
struct Args {
    /// Data directory for the document store
    #[arg(long, default_value = "./data")]
    data: String,
    /// Analyzer config (JSON); defaults apply when omitted
    #[arg(long)]
    config: Option<String>,
    /// Override the number of words kept per document
    #[arg(long)]
    selection_limit: Option<usize>,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => AnalyzerConfig::from_json_file(path)?,
        None => AnalyzerConfig::default(),
    };
    if let Some(limit) = args.selection_limit {
        config.selection_limit = limit;
    }
    let app: Router = open_app(&args.data, config)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, data = %args.data, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
