//! Per-corpus engines and the process-wide registry that serves them.
//!
//! A [`RegistryBuilder`] fits each corpus exactly once; [`RegistryBuilder::build`]
//! freezes the result into an immutable [`Registry`] that is shared read-only.

use crate::assemble::{assemble, Recommendation};
use crate::backend::{BackendKind, SimilarityBackend};
use crate::catalog::{self, Corpus};
use crate::error::{EngineError, EngineResult};
use crate::ranker::{rank_by_anchor, rank_by_text};
use crate::resolver::{Resolution, ResolveMode, Resolver, DEFAULT_FUZZY_CUTOFF};
use crate::vectorizer::TfidfConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

pub const DEFAULT_TOP_N: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub backend: BackendKind,
    pub tfidf: TfidfConfig,
    pub resolve_mode: ResolveMode,
    pub fuzzy_cutoff: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Tfidf,
            tfidf: TfidfConfig::default(),
            resolve_mode: ResolveMode::Strict,
            fuzzy_cutoff: DEFAULT_FUZZY_CUTOFF,
        }
    }
}

/// What a recommendation is anchored on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecommendQuery {
    Title(String),
    ItemId(i64),
    Position(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendResponse {
    pub media_type: String,
    pub engine_used: String,
    pub base_title: String,
    pub topn: usize,
    pub recommendations: Vec<Recommendation>,
}

/// A loaded corpus with its fitted backend.
pub struct CorpusEngine {
    key: String,
    corpus: Corpus,
    backend: Box<dyn SimilarityBackend>,
    resolver: Resolver,
}

impl std::fmt::Debug for CorpusEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorpusEngine")
            .field("key", &self.key)
            .field("items", &self.corpus.len())
            .field("backend", &self.backend.name())
            .finish()
    }
}

impl CorpusEngine {
    pub fn build(key: impl Into<String>, corpus: Corpus, config: &EngineConfig) -> EngineResult<Self> {
        let key = key.into();
        let mut backend = config.backend.create(config.tfidf);
        backend.fit(&corpus.contents())?;
        tracing::info!(corpus = %key, items = corpus.len(), backend = backend.name(), "corpus engine ready");
        Ok(Self { key, corpus, backend, resolver: Resolver::new(config.resolve_mode, config.fuzzy_cutoff) })
    }

    pub fn key(&self) -> &str { &self.key }
    pub fn corpus(&self) -> &Corpus { &self.corpus }
    pub fn backend(&self) -> &dyn SimilarityBackend { self.backend.as_ref() }

    pub fn resolve(&self, query: &str) -> Option<Resolution> {
        self.resolver.resolve(&self.corpus, query)
    }

    /// Recommend around a catalog item. `Ok(None)` means the query matched nothing.
    pub fn recommend(&self, query: &RecommendQuery, top_n: usize) -> EngineResult<Option<RecommendResponse>> {
        let anchor = match query {
            RecommendQuery::Title(text) => self.resolve(text).map(|r| r.position),
            RecommendQuery::ItemId(id) => self.corpus.position_of_id(*id),
            RecommendQuery::Position(p) => Some(*p),
        };
        let Some(anchor) = anchor else {
            tracing::debug!(corpus = %self.key, ?query, "no local match");
            return Ok(None);
        };
        let ranked = rank_by_anchor(self.backend(), anchor, top_n)?;
        let base_title = self.corpus.get(anchor).map(|it| it.title().to_string()).unwrap_or_default();
        Ok(Some(RecommendResponse {
            media_type: self.key.clone(),
            engine_used: format!("{} (Local Title Match)", self.backend.name()),
            base_title,
            topn: top_n,
            recommendations: assemble(&self.corpus, &ranked),
        }))
    }

    /// Recommend around text that is not in the catalog.
    pub fn recommend_from_text(&self, text: &str, base_title: &str, top_n: usize) -> EngineResult<RecommendResponse> {
        let ranked = rank_by_text(self.backend(), text, top_n)?;
        Ok(RecommendResponse {
            media_type: self.key.clone(),
            engine_used: format!("{} (Live Web Mode)", self.backend.name()),
            base_title: base_title.to_string(),
            topn: top_n,
            recommendations: assemble(&self.corpus, &ranked),
        })
    }
}

#[derive(Debug, Default)]
pub struct RegistryBuilder {
    config: EngineConfig,
    engines: BTreeMap<String, Arc<CorpusEngine>>,
}

impl RegistryBuilder {
    pub fn new(config: EngineConfig) -> Self {
        Self { config, engines: BTreeMap::new() }
    }

    /// Fit `corpus` under `key`. A key can be initialized only once.
    pub fn insert(&mut self, key: &str, corpus: Corpus) -> EngineResult<()> {
        if self.engines.contains_key(key) {
            return Err(EngineError::DuplicateCorpus(key.to_string()));
        }
        let engine = CorpusEngine::build(key, corpus, &self.config)?;
        self.engines.insert(key.to_string(), Arc::new(engine));
        Ok(())
    }

    pub fn load(&mut self, key: &str, path: &Path) -> EngineResult<()> {
        if self.engines.contains_key(key) {
            return Err(EngineError::DuplicateCorpus(key.to_string()));
        }
        let corpus = catalog::load_path(path)?;
        self.insert(key, corpus)
    }

    /// Load every source, logging and skipping the ones that fail. Returns the keys
    /// that failed together with their errors.
    pub fn load_all<'a, I>(&mut self, sources: I) -> Vec<(String, EngineError)>
    where
        I: IntoIterator<Item = (&'a str, &'a Path)>,
    {
        let mut failures = Vec::new();
        for (key, path) in sources {
            if !path.exists() {
                tracing::warn!(corpus = key, path = %path.display(), "catalog file not found, skipping");
                continue;
            }
            if let Err(e) = self.load(key, path) {
                tracing::error!(corpus = key, path = %path.display(), error = %e, "corpus failed to load");
                failures.push((key.to_string(), e));
            }
        }
        failures
    }

    pub fn build(self) -> Registry {
        Registry { engines: self.engines }
    }
}

/// Immutable map from corpus key to its engine.
#[derive(Debug, Default)]
pub struct Registry {
    engines: BTreeMap<String, Arc<CorpusEngine>>,
}

impl Registry {
    pub fn builder(config: EngineConfig) -> RegistryBuilder {
        RegistryBuilder::new(config)
    }

    pub fn get(&self, key: &str) -> EngineResult<Arc<CorpusEngine>> {
        self.engines
            .get(key)
            .cloned()
            .ok_or_else(|| EngineError::UnknownCorpus(key.to_string()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.engines.keys().map(String::as_str)
    }

    pub fn engines(&self) -> impl Iterator<Item = &Arc<CorpusEngine>> {
        self.engines.values()
    }

    pub fn len(&self) -> usize { self.engines.len() }
    pub fn is_empty(&self) -> bool { self.engines.is_empty() }
}
