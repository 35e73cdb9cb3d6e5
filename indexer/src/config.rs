use mailsearch_core::MailsIndexConfig;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexerConfig {
    /// Mails per `Index` chunk during bootstrap.
    pub bootstrap_buffer_size: usize,
    /// Deadline for one `Index` chunk.
    pub indexing_timeout: Duration,
    /// Deadline for one search.
    pub search_timeout: Duration,
    pub index: MailsIndexConfig,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            bootstrap_buffer_size: 1000,
            indexing_timeout: Duration::from_secs(30),
            search_timeout: Duration::from_secs(30),
            index: MailsIndexConfig::default(),
        }
    }
}
