use crate::queue::AccountQueue;
use mailsearch_core::IndexableMail;
use serde::Serialize;
use std::time::Instant;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BootstrapReport {
    pub indexed: usize,
    pub chunks: usize,
    /// One message per failed chunk.
    pub failures: Vec<String>,
}

/// Feed an account's stored mails to its queue in chunks of `buffer_size`.
///
/// Each chunk is an independent unit: a chunk that fails or times out is
/// recorded and the next one is still submitted. Stops early once the
/// account's session is closed.
pub async fn index_account<I>(queue: &AccountQueue, mails: I, buffer_size: usize) -> BootstrapReport
where
    I: IntoIterator<Item = IndexableMail>,
{
    let started = Instant::now();
    let login = &queue.key().login;
    let buffer_size = buffer_size.max(1);
    let mut report = BootstrapReport::default();
    let mut mails = mails.into_iter().peekable();

    while mails.peek().is_some() {
        if queue.is_closed() {
            tracing::info!(%login, indexed = report.indexed, "account session closed, bootstrap cancelled");
            break;
        }
        let chunk: Vec<IndexableMail> = mails.by_ref().take(buffer_size).collect();
        let size = chunk.len();
        report.chunks += 1;

        let outcome = match queue.index(Vec::new(), chunk) {
            Ok(ticket) => ticket.wait().await,
            Err(error) => Err(error),
        };
        match outcome {
            Ok(()) => report.indexed += size,
            Err(error) => {
                tracing::warn!(%login, size, error = ?error, "bootstrap chunk failed");
                report.failures.push(format!("{error:#}"));
            }
        }
    }

    tracing::info!(
        %login,
        indexed = report.indexed,
        chunks = report.chunks,
        failed = report.failures.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "account bootstrap finished"
    );
    report
}
