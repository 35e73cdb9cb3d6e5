pub mod bootstrap;
pub mod config;
pub mod protocol;
pub mod queue;
pub mod registry;
pub mod service;

pub use bootstrap::{index_account, BootstrapReport};
pub use config::IndexerConfig;
pub use protocol::{AccountKey, PkRef, ProgressStatus, Request, Response};
pub use queue::{AccountQueue, IndexTicket, SearchTicket};
pub use registry::IndexerRegistry;
pub use service::IndexerService;
