use crate::model::MailPk;
use crate::tokenizer::terms;
use anyhow::{bail, ensure, Result};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Bound;

/// Internal document number, allocated per add and never reused.
pub type DocId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
    pub doc_id: DocId,
    /// occurrences of the term in this field of the document
    pub term_freq: u32,
    /// number of terms in this field of the document
    pub field_len: u32,
}

/// Postings of one term, one list per field.
#[derive(Debug, Clone)]
pub struct TermPostings {
    pub fields: Vec<Vec<Posting>>,
}

impl TermPostings {
    fn new(field_count: usize) -> Self {
        Self { fields: vec![Vec::new(); field_count] }
    }

    fn is_empty(&self) -> bool {
        self.fields.iter().all(Vec::is_empty)
    }
}

#[derive(Debug, Clone)]
pub struct DocEntry {
    pub key: MailPk,
    pub field_lengths: Vec<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FieldStats {
    pub doc_count: u32,
    pub total_len: u64,
}

impl FieldStats {
    pub fn avg_len(&self) -> f64 {
        if self.doc_count == 0 {
            0.0
        } else {
            self.total_len as f64 / self.doc_count as f64
        }
    }
}

/// Multi-field inverted index with tombstone based removal.
///
/// Terms live in a sorted map so prefix expansion is a range scan.
#[derive(Debug)]
pub struct InvertedIndex {
    field_count: usize,
    terms: BTreeMap<String, TermPostings>,
    docs: HashMap<DocId, DocEntry>,
    keys: HashMap<MailPk, DocId>,
    removed: HashSet<DocId>,
    fields: Vec<FieldStats>,
    next_doc_id: DocId,
}

impl InvertedIndex {
    pub fn new(field_count: usize) -> Self {
        Self {
            field_count,
            terms: BTreeMap::new(),
            docs: HashMap::new(),
            keys: HashMap::new(),
            removed: HashSet::new(),
            fields: vec![FieldStats::default(); field_count],
            next_doc_id: 0,
        }
    }

    pub fn field_count(&self) -> usize {
        self.field_count
    }

    /// Live (not removed) documents.
    pub fn doc_count(&self) -> usize {
        self.docs.len()
    }

    pub fn removed_count(&self) -> usize {
        self.removed.len()
    }

    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains_key(key)
    }

    pub fn is_removed(&self, doc_id: DocId) -> bool {
        self.removed.contains(&doc_id)
    }

    pub fn doc(&self, doc_id: DocId) -> Option<&DocEntry> {
        self.docs.get(&doc_id)
    }

    pub fn field_stats(&self, field: usize) -> FieldStats {
        self.fields.get(field).copied().unwrap_or_default()
    }

    pub fn postings(&self, term: &str) -> Option<&TermPostings> {
        self.terms.get(term)
    }

    /// Indexed terms starting with `prefix`, in lexicographic order.
    pub fn terms_with_prefix<'a, 'p>(&'a self, prefix: &'p str) -> impl Iterator<Item = &'a str> + 'p
    where
        'a: 'p,
    {
        self.terms
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(move |(term, _)| term.starts_with(prefix))
            .map(|(term, _)| term.as_str())
    }

    /// Index one document given the text of each field, in field order.
    ///
    /// Adding a key that is already live is rejected; replacing a document
    /// means removing it first.
    pub fn add_document(&mut self, key: &str, field_values: &[String]) -> Result<DocId> {
        ensure!(
            field_values.len() == self.field_count,
            "document {key} has {} field values, index expects {}",
            field_values.len(),
            self.field_count
        );
        if self.keys.contains_key(key) {
            bail!("document {key} is already indexed");
        }

        let doc_id = self.next_doc_id;
        self.next_doc_id = doc_id
            .checked_add(1)
            .ok_or_else(|| anyhow::anyhow!("document id space exhausted"))?;

        let mut field_lengths = vec![0u32; self.field_count];
        let mut term_counts: HashMap<String, Vec<u32>> = HashMap::new();
        for (field, value) in field_values.iter().enumerate() {
            for term in terms(value) {
                field_lengths[field] += 1;
                term_counts
                    .entry(term)
                    .or_insert_with(|| vec![0; self.field_count])[field] += 1;
            }
        }

        for (field, stats) in self.fields.iter_mut().enumerate() {
            stats.doc_count += 1;
            stats.total_len += u64::from(field_lengths[field]);
        }

        for (term, counts) in term_counts {
            let field_count = self.field_count;
            let postings = self
                .terms
                .entry(term)
                .or_insert_with(|| TermPostings::new(field_count));
            for (field, &term_freq) in counts.iter().enumerate() {
                if term_freq > 0 {
                    postings.fields[field].push(Posting {
                        doc_id,
                        term_freq,
                        field_len: field_lengths[field],
                    });
                }
            }
        }

        self.keys.insert(key.to_string(), doc_id);
        self.docs.insert(doc_id, DocEntry { key: key.to_string(), field_lengths });
        Ok(doc_id)
    }

    /// Tombstone a document. Its postings stay in place until [`vacuum`](Self::vacuum),
    /// but it stops counting in field statistics right away.
    pub fn remove_document(&mut self, key: &str) -> bool {
        let Some(doc_id) = self.keys.remove(key) else {
            return false;
        };
        if let Some(entry) = self.docs.remove(&doc_id) {
            for (stats, &len) in self.fields.iter_mut().zip(&entry.field_lengths) {
                stats.doc_count = stats.doc_count.saturating_sub(1);
                stats.total_len = stats.total_len.saturating_sub(u64::from(len));
            }
        }
        self.removed.insert(doc_id);
        true
    }

    /// Purge tombstoned postings and drop terms left without any.
    pub fn vacuum(&mut self) -> usize {
        if self.removed.is_empty() {
            return 0;
        }
        let removed = std::mem::take(&mut self.removed);
        let mut purged = 0;
        self.terms.retain(|_, postings| {
            for list in postings.fields.iter_mut() {
                let before = list.len();
                list.retain(|posting| !removed.contains(&posting.doc_id));
                purged += before - list.len();
            }
            !postings.is_empty()
        });
        purged
    }
}
