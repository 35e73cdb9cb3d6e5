use crate::config::IndexerConfig;
use crate::protocol::{AccountKey, ProgressStatus, Response};
use anyhow::{anyhow, bail, Context, Result};
use mailsearch_core::{IndexableMail, MailPk, MailsIndex, SearchResult};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

enum Job {
    Index {
        remove: Vec<MailPk>,
        add: Vec<IndexableMail>,
        reply: oneshot::Sender<Result<()>>,
    },
    Search {
        query: String,
        reply: oneshot::Sender<SearchResult>,
    },
}

/// FIFO queue in front of one account's index.
///
/// A single worker thread owns the [`MailsIndex`] and runs jobs strictly in
/// submission order, so vacuum never races a search.
pub struct AccountQueue {
    key: AccountKey,
    jobs: mpsc::UnboundedSender<Job>,
    closed: Arc<AtomicBool>,
    indexing_timeout: Duration,
    search_timeout: Duration,
}

impl AccountQueue {
    pub fn spawn(key: AccountKey, config: &IndexerConfig, events: mpsc::UnboundedSender<Response>) -> Result<Self> {
        let (jobs, rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        let worker = Worker {
            key: key.clone(),
            index: MailsIndex::new(config.index),
            closed: closed.clone(),
            events,
        };
        thread::Builder::new()
            .name("mails-index-worker".into())
            .spawn(move || worker.run(rx))
            .context("failed to spawn indexing worker")?;

        Ok(Self {
            key,
            jobs,
            closed,
            indexing_timeout: config.indexing_timeout,
            search_timeout: config.search_timeout,
        })
    }

    pub fn key(&self) -> &AccountKey {
        &self.key
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Discard queued jobs and drop the index once the worker notices.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Enqueue removals followed by additions.
    pub fn index(&self, remove: Vec<MailPk>, add: Vec<IndexableMail>) -> Result<IndexTicket> {
        if self.is_closed() {
            bail!("session of account {} is closed", self.key.login);
        }
        let size = add.len();
        let (reply, rx) = oneshot::channel();
        self.jobs
            .send(Job::Index { remove, add, reply })
            .map_err(|_| anyhow!("indexing worker of account {} has stopped", self.key.login))?;
        Ok(IndexTicket { rx, size, timeout: self.indexing_timeout })
    }

    pub fn search(&self, query: impl Into<String>) -> SearchTicket {
        let (reply, rx) = oneshot::channel();
        if !self.is_closed() {
            // a failed send drops `reply`, which the ticket reports as discarded
            let _ = self.jobs.send(Job::Search { query: query.into(), reply });
        }
        SearchTicket { rx, timeout: self.search_timeout }
    }
}

/// Pending `Index` job.
pub struct IndexTicket {
    rx: oneshot::Receiver<Result<()>>,
    size: usize,
    timeout: Duration,
}

impl IndexTicket {
    pub fn size(&self) -> usize {
        self.size
    }

    pub async fn wait(self) -> Result<()> {
        match tokio::time::timeout(self.timeout, self.rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => bail!("indexing of {} mails was discarded", self.size),
            Err(_) => bail!(
                "failed to index mails in {}ms (mails portion size: {})",
                self.timeout.as_millis(),
                self.size
            ),
        }
    }
}

/// Pending search. Failures resolve to an empty result.
pub struct SearchTicket {
    rx: oneshot::Receiver<SearchResult>,
    timeout: Duration,
}

impl SearchTicket {
    pub async fn wait(self) -> SearchResult {
        match tokio::time::timeout(self.timeout, self.rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => {
                tracing::warn!("search was discarded, returning no results");
                SearchResult::default()
            }
            Err(_) => {
                tracing::warn!(timeout_ms = self.timeout.as_millis() as u64, "search timed out, returning no results");
                SearchResult::default()
            }
        }
    }
}

struct Worker {
    key: AccountKey,
    index: MailsIndex,
    closed: Arc<AtomicBool>,
    events: mpsc::UnboundedSender<Response>,
}

impl Worker {
    fn run(mut self, mut jobs: mpsc::UnboundedReceiver<Job>) {
        tracing::debug!(login = %self.key.login, "indexing worker started");
        while let Some(job) = jobs.blocking_recv() {
            if self.is_closed() {
                break;
            }
            match job {
                Job::Index { remove, add, reply } => {
                    let result = self.index(remove, add);
                    if !self.is_closed() {
                        let _ = reply.send(result);
                    }
                }
                Job::Search { query, reply } => {
                    let result = self.search(&query);
                    if !self.is_closed() {
                        let _ = reply.send(result);
                    }
                }
            }
        }
        tracing::debug!(login = %self.key.login, mails = self.index.len(), "indexing worker stopped, dropping index");
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn index(&mut self, remove: Vec<MailPk>, add: Vec<IndexableMail>) -> Result<()> {
        self.progress(true);
        let index = &mut self.index;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            index.remove_all(remove.iter().map(String::as_str));
            index.add_all(&add)
        }));
        self.progress(false);

        let result = outcome.unwrap_or_else(|payload| Err(anyhow!("indexing panicked: {}", panic_message(payload))));
        match &result {
            Ok(()) => tracing::debug!(login = %self.key.login, removed = remove.len(), added = add.len(), "indexed"),
            Err(error) => self.report(error),
        }
        result
    }

    fn search(&self, query: &str) -> SearchResult {
        let index = &self.index;
        match panic::catch_unwind(AssertUnwindSafe(|| index.search(query))) {
            Ok(result) => result,
            Err(payload) => {
                self.report(&anyhow!("search panicked: {}", panic_message(payload)));
                SearchResult::default()
            }
        }
    }

    fn progress(&self, indexing: bool) {
        let _ = self.events.send(Response::ProgressState {
            key: self.key.clone(),
            status: ProgressStatus { indexing },
        });
    }

    fn report(&self, error: &anyhow::Error) {
        tracing::error!(login = %self.key.login, error = ?error, "indexing worker fault");
        let _ = self.events.send(Response::ErrorMessage { message: format!("{error:#}") });
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
