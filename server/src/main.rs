use anyhow::Result;
use axum::Router;
use clap::Parser;
use mailsearch_core::MailsIndexConfig;
use mailsearch_indexer::IndexerConfig;
use mailsearch_server::build_app;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
    /// Mails per chunk when bootstrapping an account
    #[arg(long, default_value_t = 1000)]
    buffer_size: usize,
    #[arg(long, default_value_t = 30_000)]
    indexing_timeout_ms: u64,
    #[arg(long, default_value_t = 30_000)]
    search_timeout_ms: u64,
    /// Removed documents that trigger a vacuum
    #[arg(long, default_value_t = 25)]
    vacuum_threshold: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let config = IndexerConfig {
        bootstrap_buffer_size: args.buffer_size,
        indexing_timeout: Duration::from_millis(args.indexing_timeout_ms),
        search_timeout: Duration::from_millis(args.search_timeout_ms),
        index: MailsIndexConfig { vacuum_threshold: args.vacuum_threshold, ..MailsIndexConfig::default() },
    };
    let app: Router = build_app(config)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
