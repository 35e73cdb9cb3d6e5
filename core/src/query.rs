use crate::index::{DocId, InvertedIndex};
use crate::model::SearchHit;
use crate::tokenizer::terms;
use std::collections::{HashMap, HashSet};

/// BM25 tuning. The defaults must stay as they are for reproducible ranking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25 {
    pub k1: f64,
    pub b: f64,
}

impl Default for Bm25 {
    fn default() -> Self {
        Bm25 { k1: 1.2, b: 0.75 }
    }
}

impl Bm25 {
    /// Contribution of one field: `boost * idf * tf*(k1+1) / (tf + k1*(1 - b + b*len/avg))`.
    pub fn field_score(&self, boost: f64, idf: f64, term_freq: u32, field_len: u32, avg_field_len: f64) -> f64 {
        let tf = f64::from(term_freq);
        let length_ratio = if avg_field_len > 0.0 {
            f64::from(field_len) / avg_field_len
        } else {
            1.0
        };
        let numerator = idf * tf * (self.k1 + 1.0);
        let denominator = tf + self.k1 * (1.0 - self.b + self.b * length_ratio);
        boost * numerator / denominator
    }
}

/// Non-negative BM25 idf.
pub fn idf(total_docs: usize, doc_freq: usize) -> f64 {
    let n = total_docs as f64;
    let df = doc_freq as f64;
    (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
}

/// Weight of a prefix expansion relative to the query term it came from.
pub fn expansion_boost(term: &str, expanded: &str) -> f64 {
    if expanded == term {
        return 1.0;
    }
    let extra = expanded.chars().count().saturating_sub(term.chars().count());
    (1.0 + 1.0 / (1.0 + extra as f64)).ln()
}

/// All distinct indexed terms having `term` as a prefix.
pub fn expand_term(index: &InvertedIndex, term: &str) -> Vec<String> {
    index.terms_with_prefix(term).map(str::to_string).collect()
}

/// Expanded terms of every normalized query term, first occurrence wins.
pub fn expand_query(index: &InvertedIndex, query: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut expanded = Vec::new();
    for term in terms(query) {
        for candidate in index.terms_with_prefix(&term) {
            if seen.insert(candidate) {
                expanded.push(candidate.to_string());
            }
        }
    }
    expanded
}

/// Rank live documents against a free-text query.
///
/// `boosts` holds one weight per index field. Results are ordered by descending
/// score, ties by ascending key.
pub fn search(index: &InvertedIndex, boosts: &[f64], bm25: Bm25, query: &str) -> Vec<SearchHit> {
    let total_docs = index.doc_count();
    let avg_lengths: Vec<f64> = (0..index.field_count())
        .map(|field| index.field_stats(field).avg_len())
        .collect();
    let mut scores: HashMap<DocId, f64> = HashMap::new();

    for term in terms(query) {
        // best expansion per document for this query term
        let mut best: HashMap<DocId, f64> = HashMap::new();

        for expanded in index.terms_with_prefix(&term) {
            let Some(postings) = index.postings(expanded) else {
                continue;
            };
            let live_docs: HashSet<DocId> = postings
                .fields
                .iter()
                .flatten()
                .map(|posting| posting.doc_id)
                .filter(|&doc_id| !index.is_removed(doc_id))
                .collect();
            if live_docs.is_empty() {
                continue;
            }
            let term_idf = idf(total_docs, live_docs.len());
            let weight = expansion_boost(&term, expanded);

            let mut expanded_scores: HashMap<DocId, f64> = HashMap::new();
            for (field, list) in postings.fields.iter().enumerate() {
                let boost = boosts.get(field).copied().unwrap_or(0.0);
                if boost == 0.0 {
                    continue;
                }
                for posting in list.iter().filter(|p| !index.is_removed(p.doc_id)) {
                    *expanded_scores.entry(posting.doc_id).or_insert(0.0) += bm25.field_score(
                        boost,
                        term_idf,
                        posting.term_freq,
                        posting.field_len,
                        avg_lengths[field],
                    );
                }
            }

            for (doc_id, score) in expanded_scores {
                let weighted = score * weight;
                let entry = best.entry(doc_id).or_insert(weighted);
                if weighted > *entry {
                    *entry = weighted;
                }
            }
        }

        for (doc_id, score) in best {
            *scores.entry(doc_id).or_insert(0.0) += score;
        }
    }

    let mut hits: Vec<SearchHit> = scores
        .into_iter()
        .filter(|(_, score)| *score > 0.0)
        .filter_map(|(doc_id, score)| {
            index.doc(doc_id).map(|entry| SearchHit { key: entry.key.clone(), score })
        })
        .collect();
    hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.key.cmp(&b.key)));
    hits
}
