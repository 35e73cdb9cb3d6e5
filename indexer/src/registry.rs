use crate::config::IndexerConfig;
use crate::protocol::{AccountKey, Response};
use crate::queue::AccountQueue;
use anyhow::Result;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// One queue, and so one index, per signed-in account.
pub struct IndexerRegistry {
    config: IndexerConfig,
    events: mpsc::UnboundedSender<Response>,
    queues: Mutex<HashMap<AccountKey, Arc<AccountQueue>>>,
}

impl IndexerRegistry {
    pub fn new(config: IndexerConfig, events: mpsc::UnboundedSender<Response>) -> Self {
        Self { config, events, queues: Mutex::new(HashMap::new()) }
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    /// The account's queue, created on first use.
    pub fn queue(&self, key: &AccountKey) -> Result<Arc<AccountQueue>> {
        let mut queues = self.queues.lock();
        if let Some(queue) = queues.get(key) {
            return Ok(queue.clone());
        }
        let queue = Arc::new(AccountQueue::spawn(key.clone(), &self.config, self.events.clone())?);
        tracing::info!(login = %key.login, "created account index");
        queues.insert(key.clone(), queue.clone());
        Ok(queue)
    }

    pub fn get(&self, key: &AccountKey) -> Option<Arc<AccountQueue>> {
        self.queues.lock().get(key).cloned()
    }

    pub fn accounts(&self) -> Vec<AccountKey> {
        self.queues.lock().keys().cloned().collect()
    }

    /// End the account's session: queued work is discarded and the index dropped.
    pub fn logout(&self, key: &AccountKey) -> bool {
        let Some(queue) = self.queues.lock().remove(key) else {
            return false;
        };
        queue.close();
        tracing::info!(login = %key.login, "dropped account index");
        true
    }

    pub fn shutdown(&self) {
        for (key, queue) in self.queues.lock().drain() {
            queue.close();
            tracing::debug!(login = %key.login, "closed account queue");
        }
    }
}
