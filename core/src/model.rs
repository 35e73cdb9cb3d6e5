use serde::{Deserialize, Serialize};

/// Stable mail identifier, unique within one account.
pub type MailPk = String;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailAddress {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailAttachment {
    #[serde(default)]
    pub name: String,
}

/// The subset of a stored mail that feeds the full-text index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexableMail {
    pub pk: MailPk,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
    /// e.g. `text/plain`, `text/html`
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub sender: MailAddress,
    #[serde(default)]
    pub to_recipients: Vec<MailAddress>,
    #[serde(default)]
    pub cc_recipients: Vec<MailAddress>,
    #[serde(default)]
    pub bcc_recipients: Vec<MailAddress>,
    #[serde(default)]
    pub attachments: Vec<MailAttachment>,
}

impl IndexableMail {
    pub fn new(pk: impl Into<MailPk>) -> Self {
        Self { pk: pk.into(), ..Self::default() }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn is_html(&self) -> bool {
        self.mime_type
            .as_deref()
            .map_or(false, |mime| mime.to_ascii_lowercase().contains("html"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub key: MailPk,
    pub score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub items: Vec<SearchHit>,
    pub expanded_terms: Vec<String>,
}

impl SearchResult {
    /// No ranked mails. Expanded terms may still be reported for tombstoned
    /// mails until the next vacuum.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
