//! TF-IDF vectorizer over catalog content.
//!
//! `fit` builds the vocabulary (document frequencies, optional cap, idf) and returns
//! one L2-normalized row per document. `transform` maps arbitrary text into the same
//! space; terms outside the fitted vocabulary are ignored.

use crate::error::{EngineError, EngineResult};
use crate::tokenizer::{analyze, AnalyzerConfig};
use crate::vector::{SparseVector, TermId};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TfidfConfig {
    pub ngram_range: (usize, usize),
    /// Keep only the most document-frequent terms.
    pub max_features: Option<usize>,
    pub stem: bool,
    /// Use smoothed IDF = ln((1 + N) / (1 + df)) + 1 instead of ln(N / df) + 1
    pub smooth_idf: bool,
    /// Use tf = 1 + ln(count) instead of the raw count
    pub sublinear_tf: bool,
}

impl Default for TfidfConfig {
    fn default() -> Self {
        Self { ngram_range: (1, 2), max_features: Some(50_000), stem: false, smooth_idf: true, sublinear_tf: false }
    }
}

impl TfidfConfig {
    fn analyzer(&self) -> AnalyzerConfig {
        AnalyzerConfig { ngram_range: self.ngram_range, stem: self.stem }
    }
}

/// Fitted term -> dimension mapping with per-dimension idf.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    terms: HashMap<String, TermId>,
    idf: Vec<f32>,
}

impl Vocabulary {
    pub fn len(&self) -> usize { self.idf.len() }
    pub fn is_empty(&self) -> bool { self.idf.is_empty() }
    pub fn term_id(&self, term: &str) -> Option<TermId> { self.terms.get(term).copied() }
    pub fn idf(&self, term_id: TermId) -> Option<f32> { self.idf.get(term_id as usize).copied() }
}

#[derive(Debug, Clone, Default)]
pub struct Vectorizer {
    config: TfidfConfig,
    vocabulary: Option<Vocabulary>,
}

impl Vectorizer {
    pub fn new(config: TfidfConfig) -> Self {
        Self { config, vocabulary: None }
    }

    pub fn config(&self) -> &TfidfConfig { &self.config }
    pub fn vocabulary(&self) -> Option<&Vocabulary> { self.vocabulary.as_ref() }

    /// Fit on `documents` and return their vectors in input order. Replaces any
    /// previous vocabulary.
    pub fn fit(&mut self, documents: &[&str]) -> EngineResult<Vec<SparseVector>> {
        if documents.iter().all(|d| d.trim().is_empty()) {
            return Err(EngineError::EmptyCorpus);
        }
        let analyzer = self.config.analyzer();
        let analyzed: Vec<Vec<String>> = documents.iter().map(|d| analyze(d, &analyzer)).collect();

        let mut df: HashMap<&str, u32> = HashMap::new();
        for terms in &analyzed {
            let seen_in_doc: HashSet<&str> = terms.iter().map(String::as_str).collect();
            for term in seen_in_doc {
                *df.entry(term).or_insert(0) += 1;
            }
        }

        let mut kept: Vec<(&str, u32)> = df.into_iter().collect();
        if let Some(max) = self.config.max_features {
            if kept.len() > max {
                kept.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
                kept.truncate(max);
            }
        }
        if kept.is_empty() {
            return Err(EngineError::EmptyCorpus);
        }
        kept.sort_by(|a, b| a.0.cmp(b.0));

        let n = documents.len() as f32;
        let mut terms = HashMap::with_capacity(kept.len());
        let mut idf = Vec::with_capacity(kept.len());
        for (tid, (term, df_t)) in kept.into_iter().enumerate() {
            let df_t = df_t as f32;
            let w = if self.config.smooth_idf {
                ((1.0 + n) / (1.0 + df_t)).ln() + 1.0
            } else {
                (n / df_t).ln() + 1.0
            };
            terms.insert(term.to_string(), tid as TermId);
            idf.push(w);
        }
        let vocabulary = Vocabulary { terms, idf };
        tracing::debug!(docs = documents.len(), terms = vocabulary.len(), "tf-idf vocabulary fitted");

        let rows = analyzed.iter().map(|t| weigh(&vocabulary, &self.config, t)).collect();
        self.vocabulary = Some(vocabulary);
        Ok(rows)
    }

    /// Project `text` into the fitted space.
    pub fn transform(&self, text: &str) -> EngineResult<SparseVector> {
        let vocabulary = self.vocabulary.as_ref().ok_or(EngineError::NotFitted)?;
        let terms = analyze(text, &self.config.analyzer());
        Ok(weigh(vocabulary, &self.config, &terms))
    }
}

fn weigh(vocabulary: &Vocabulary, config: &TfidfConfig, terms: &[String]) -> SparseVector {
    let mut tf_raw: HashMap<TermId, u32> = HashMap::new();
    for term in terms {
        if let Some(tid) = vocabulary.term_id(term) {
            *tf_raw.entry(tid).or_insert(0) += 1;
        }
    }
    let entries = tf_raw
        .into_iter()
        .map(|(tid, count)| {
            let tf = if config.sublinear_tf { 1.0 + (count as f32).ln() } else { count as f32 };
            (tid, tf * vocabulary.idf[tid as usize])
        })
        .collect();
    let mut v = SparseVector::from_entries(entries);
    v.normalize();
    v
}
