use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// A keyword hit: position in the ranked slice and its score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeywordMatch {
    pub index: usize,
    pub score: f32,
}

/// Keyword ranking collaborator used for hybrid (`is_bm25`) queries.
pub trait KeywordRanker: Send + Sync {
    /// Rank `documents` against `query`, best first, at most `top_k` entries.
    /// Documents that share no term with the query are left out.
    fn rank(&self, query: &str, documents: &[&str], top_k: usize) -> Vec<KeywordMatch>;
}

/// Okapi BM25 over lowercase alphanumeric terms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25Ranker {
    pub k1: f32,
    pub b: f32,
    /// Terms shorter than this are ignored
    pub min_term_len: usize,
}

impl Default for Bm25Ranker {
    fn default() -> Self {
        Self {
            k1: 1.2,
            b: 0.75,
            min_term_len: 2,
        }
    }
}

impl Bm25Ranker {
    fn terms(&self, text: &str) -> Vec<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|part| part.chars().count() >= self.min_term_len)
            .map(str::to_lowercase)
            .collect()
    }
}

impl KeywordRanker for Bm25Ranker {
    fn rank(&self, query: &str, documents: &[&str], top_k: usize) -> Vec<KeywordMatch> {
        let query_terms: HashSet<String> = self.terms(query).into_iter().collect();
        if query_terms.is_empty() || documents.is_empty() || top_k == 0 {
            return Vec::new();
        }

        let docs: Vec<Vec<String>> = documents.iter().map(|doc| self.terms(doc)).collect();
        let mut doc_freq: HashMap<&str, usize> = HashMap::new();
        for terms in &docs {
            let unique: HashSet<&str> = terms.iter().map(String::as_str).collect();
            for term in unique {
                if query_terms.contains(term) {
                    *doc_freq.entry(term).or_insert(0) += 1;
                }
            }
        }

        let total_docs = docs.len() as f32;
        let avg_len = docs.iter().map(Vec::len).sum::<usize>() as f32 / total_docs;

        let mut matches: Vec<KeywordMatch> = docs
            .iter()
            .enumerate()
            .filter_map(|(index, terms)| {
                let dl = terms.len() as f32;
                let mut score = 0.0;
                for term in &query_terms {
                    let freq = terms.iter().filter(|t| *t == term).count() as f32;
                    if freq == 0.0 {
                        continue;
                    }
                    let df = doc_freq.get(term.as_str()).copied().unwrap_or(0) as f32;
                    let idf = ((total_docs - df + 0.5) / (df + 0.5)).ln_1p();
                    let denom = freq + self.k1 * (1.0 - self.b + self.b * dl / avg_len.max(1e-3));
                    score += idf * (freq * (self.k1 + 1.0)) / denom;
                }
                (score > 0.0).then_some(KeywordMatch { index, score })
            })
            .collect();

        matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        matches.truncate(top_k);
        matches
    }
}
