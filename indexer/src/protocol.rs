use mailsearch_core::{IndexableMail, MailPk, SearchResult};
use serde::{Deserialize, Serialize};

/// Identifies one account's index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountKey {
    pub login: String,
}

impl AccountKey {
    pub fn new(login: impl Into<String>) -> Self {
        Self { login: login.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PkRef {
    pub pk: MailPk,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressStatus {
    pub indexing: bool,
}

/// Messages sent to the indexing worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Request {
    Bootstrap,
    Index {
        uid: String,
        key: AccountKey,
        #[serde(default)]
        remove: Vec<PkRef>,
        #[serde(default)]
        add: Vec<IndexableMail>,
    },
    Search {
        uid: String,
        key: AccountKey,
        query: String,
    },
    /// Session teardown: drop the account's queue and index.
    Logout {
        key: AccountKey,
    },
}

/// Messages emitted by the indexing worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Response {
    Bootstrapped,
    IndexingResult {
        uid: String,
    },
    SearchResult {
        uid: String,
        data: SearchResult,
    },
    ProgressState {
        key: AccountKey,
        status: ProgressStatus,
    },
    ErrorMessage {
        message: String,
    },
}
