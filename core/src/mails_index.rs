use crate::fields::{FieldDescriptor, FieldExtractor};
use crate::html::HtmlToTextLimits;
use crate::index::InvertedIndex;
use crate::model::{IndexableMail, SearchResult};
use crate::query::{self, Bm25};
use anyhow::{ensure, Context, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MailsIndexConfig {
    /// Vacuum once this many removed documents are waiting to be purged.
    pub vacuum_threshold: usize,
    pub html_to_text: HtmlToTextLimits,
    pub bm25: Bm25,
}

impl Default for MailsIndexConfig {
    fn default() -> Self {
        Self {
            vacuum_threshold: 25,
            html_to_text: HtmlToTextLimits::default(),
            bm25: Bm25::default(),
        }
    }
}

/// Full-text index over one account's mails.
pub struct MailsIndex {
    fields: Vec<FieldDescriptor>,
    boosts: Vec<f64>,
    extractor: FieldExtractor,
    index: InvertedIndex,
    config: MailsIndexConfig,
}

impl MailsIndex {
    pub fn new(config: MailsIndexConfig) -> Self {
        Self::with_fields(FieldDescriptor::defaults(), config)
    }

    /// The field list is frozen for the lifetime of the index.
    pub fn with_fields(fields: Vec<FieldDescriptor>, config: MailsIndexConfig) -> Self {
        let boosts = fields.iter().map(|descriptor| descriptor.boost).collect();
        Self {
            index: InvertedIndex::new(fields.len()),
            extractor: FieldExtractor::new(config.html_to_text),
            fields,
            boosts,
            config,
        }
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.index.doc_count()
    }

    pub fn is_empty(&self) -> bool {
        self.index.doc_count() == 0
    }

    pub fn removed_count(&self) -> usize {
        self.index.removed_count()
    }

    pub fn contains(&self, pk: &str) -> bool {
        self.index.contains(pk)
    }

    /// Index a mail, replacing any live mail with the same pk.
    pub fn add(&mut self, mail: &IndexableMail) -> Result<()> {
        ensure!(!mail.pk.is_empty(), "mail without a pk cannot be indexed (subject: {:?})", mail.subject);
        if self.index.contains(&mail.pk) {
            tracing::debug!(pk = %mail.pk, "replacing indexed mail");
            self.remove(&mail.pk);
        }
        let values: Vec<String> = self
            .fields
            .iter()
            .map(|descriptor| self.extractor.extract(mail, descriptor.field))
            .collect();
        self.index
            .add_document(&mail.pk, &values)
            .with_context(|| format!("failed to index mail {}", mail.pk))?;
        Ok(())
    }

    pub fn add_all(&mut self, mails: &[IndexableMail]) -> Result<()> {
        for mail in mails {
            self.add(mail)?;
        }
        Ok(())
    }

    /// Tombstone a mail. Unknown pks are ignored.
    pub fn remove(&mut self, pk: &str) {
        if !self.index.remove_document(pk) {
            return;
        }
        if self.index.removed_count() >= self.config.vacuum_threshold {
            self.vacuum();
        }
    }

    pub fn remove_all<'a, I>(&mut self, pks: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        for pk in pks {
            self.remove(pk);
        }
    }

    pub fn vacuum(&mut self) {
        let pending = self.index.removed_count();
        let purged = self.index.vacuum();
        tracing::debug!(removed = pending, purged, terms = self.index.term_count(), "vacuumed mails index");
    }

    pub fn search(&self, query: &str) -> SearchResult {
        SearchResult {
            items: query::search(&self.index, &self.boosts, self.config.bm25, query),
            expanded_terms: query::expand_query(&self.index, query),
        }
    }

    pub fn expand_term(&self, term: &str) -> Vec<String> {
        query::expand_term(&self.index, term)
    }
}

impl Default for MailsIndex {
    fn default() -> Self {
        Self::new(MailsIndexConfig::default())
    }
}
