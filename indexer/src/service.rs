use crate::config::IndexerConfig;
use crate::protocol::{Request, Response};
use crate::registry::IndexerRegistry;
use mailsearch_core::SearchResult;
use tokio::sync::mpsc;

/// Routes protocol requests to account queues and emits the responses.
pub struct IndexerService {
    registry: IndexerRegistry,
    events: mpsc::UnboundedSender<Response>,
}

impl IndexerService {
    pub fn new(config: IndexerConfig, events: mpsc::UnboundedSender<Response>) -> Self {
        Self { registry: IndexerRegistry::new(config, events.clone()), events }
    }

    pub fn registry(&self) -> &IndexerRegistry {
        &self.registry
    }

    /// Must run inside a tokio runtime.
    ///
    /// Jobs are enqueued before this returns, so requests for one account run
    /// in the order they were dispatched. Replies are awaited on spawned tasks.
    pub fn dispatch(&self, request: Request) {
        match request {
            Request::Bootstrap => {
                tracing::info!("indexer bootstrapped");
                self.emit(Response::Bootstrapped);
            }
            Request::Index { uid, key, remove, add } => {
                tracing::info!(%uid, login = %key.login, remove = remove.len(), add = add.len(), "index request");
                let ticket = self
                    .registry
                    .queue(&key)
                    .and_then(|queue| queue.index(remove.into_iter().map(|r| r.pk).collect(), add));
                let events = self.events.clone();
                tokio::spawn(async move {
                    let outcome = match ticket {
                        Ok(ticket) => ticket.wait().await,
                        Err(error) => Err(error),
                    };
                    match outcome {
                        Ok(()) => {
                            let _ = events.send(Response::IndexingResult { uid });
                        }
                        // faults inside the worker were already reported as ErrorMessage
                        Err(error) => tracing::warn!(%uid, error = ?error, "index request failed"),
                    }
                });
            }
            Request::Search { uid, key, query } => {
                tracing::info!(%uid, login = %key.login, "search request");
                // searching never opens a session
                let ticket = match self.registry.get(&key) {
                    Some(queue) => Some(queue.search(query)),
                    None => {
                        tracing::debug!(%uid, login = %key.login, "no session, empty search result");
                        None
                    }
                };
                let events = self.events.clone();
                tokio::spawn(async move {
                    let data = match ticket {
                        Some(ticket) => ticket.wait().await,
                        None => SearchResult::default(),
                    };
                    let _ = events.send(Response::SearchResult { uid, data });
                });
            }
            Request::Logout { key } => {
                self.registry.logout(&key);
            }
        }
    }

    pub fn shutdown(&self) {
        self.registry.shutdown();
    }

    fn emit(&self, response: Response) {
        if self.events.send(response).is_err() {
            tracing::warn!("notification channel closed");
        }
    }
}
