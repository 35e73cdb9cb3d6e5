use anyhow::Result;
use clap::Parser;
use mailsearch_core::{HtmlToTextLimits, MailsIndexConfig};
use mailsearch_indexer::{IndexerConfig, IndexerService, Request, Response};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "mailsearch-indexer")]
#[command(about = "Mail indexing worker speaking newline-delimited JSON over stdio", long_about = None)]
struct Args {
    /// Mails per chunk when bootstrapping an account
    #[arg(long, default_value_t = 1000)]
    buffer_size: usize,
    /// Deadline for one indexing chunk
    #[arg(long, default_value_t = 30_000)]
    indexing_timeout_ms: u64,
    /// Deadline for one search
    #[arg(long, default_value_t = 30_000)]
    search_timeout_ms: u64,
    /// Removed documents that trigger a vacuum
    #[arg(long, default_value_t = 25)]
    vacuum_threshold: usize,
    #[arg(long, default_value_t = 1024)]
    html_max_depth: usize,
    #[arg(long, default_value_t = 16 * 1024 * 1024)]
    html_max_input_length: usize,
}

impl Args {
    fn config(&self) -> IndexerConfig {
        IndexerConfig {
            bootstrap_buffer_size: self.buffer_size,
            indexing_timeout: Duration::from_millis(self.indexing_timeout_ms),
            search_timeout: Duration::from_millis(self.search_timeout_ms),
            index: MailsIndexConfig {
                vacuum_threshold: self.vacuum_threshold,
                html_to_text: HtmlToTextLimits {
                    max_input_length: self.html_max_input_length,
                    max_depth: self.html_max_depth,
                },
                ..MailsIndexConfig::default()
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the protocol
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let (events, mut notifications) = mpsc::unbounded_channel::<Response>();
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(response) = notifications.recv().await {
            let mut line = serde_json::to_vec(&response)?;
            line.push(b'\n');
            stdout.write_all(&line).await?;
            stdout.flush().await?;
        }
        anyhow::Ok(())
    });

    let service = IndexerService::new(args.config(), events.clone());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Request>(&line) {
            Ok(request) => service.dispatch(request),
            Err(error) => {
                tracing::warn!(error = %error, "malformed request");
                let _ = events.send(Response::ErrorMessage { message: format!("malformed request: {error}") });
            }
        }
    }

    tracing::info!("stdin closed, shutting down");
    service.shutdown();
    drop(service);
    drop(events);
    writer.await??;
    Ok(())
}
