use crate::error::{EngineError, EngineResult};
use crate::tokenizer::tokenize;
use crate::vector::{l2_normalize, Embedding};
use crate::vectorizer::{TfidfConfig, Vectorizer};

/// A vector space fitted over a corpus' content fields.
///
/// Implementations hold one vector per corpus position after `fit` and never change
/// them until the next `fit`.
pub trait SimilarityBackend: Send + Sync {
    /// Label used in responses, e.g. "TF-IDF".
    fn name(&self) -> &'static str;

    fn fit(&mut self, contents: &[&str]) -> EngineResult<()>;

    /// Map free text into the fitted space.
    fn transform(&self, text: &str) -> EngineResult<Embedding>;

    fn vector_of(&self, position: usize) -> Option<&Embedding>;

    fn similarity(&self, a: &Embedding, b: &Embedding) -> f32 {
        a.cosine(b)
    }

    /// Number of fitted vectors.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    #[default]
    Tfidf,
    HashedEmbedding,
}

impl BackendKind {
    pub fn create(self, tfidf: TfidfConfig) -> Box<dyn SimilarityBackend> {
        match self {
            BackendKind::Tfidf => Box::new(TfidfBackend::new(tfidf)),
            BackendKind::HashedEmbedding => Box::new(HashedEmbeddingBackend::default()),
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tfidf" | "tf-idf" => Ok(BackendKind::Tfidf),
            "hashed" | "embedding" | "hashed-embedding" => Ok(BackendKind::HashedEmbedding),
            other => Err(format!("unknown backend: {other}")),
        }
    }
}

/// Lexical TF-IDF space.
#[derive(Debug, Default)]
pub struct TfidfBackend {
    vectorizer: Vectorizer,
    rows: Vec<Embedding>,
}

impl TfidfBackend {
    pub fn new(config: TfidfConfig) -> Self {
        Self { vectorizer: Vectorizer::new(config), rows: Vec::new() }
    }

    pub fn vectorizer(&self) -> &Vectorizer { &self.vectorizer }
}

impl SimilarityBackend for TfidfBackend {
    fn name(&self) -> &'static str { "TF-IDF" }

    fn fit(&mut self, contents: &[&str]) -> EngineResult<()> {
        let rows = self.vectorizer.fit(contents)?;
        self.rows = rows.into_iter().map(Embedding::Sparse).collect();
        Ok(())
    }

    fn transform(&self, text: &str) -> EngineResult<Embedding> {
        self.vectorizer.transform(text).map(Embedding::Sparse)
    }

    fn vector_of(&self, position: usize) -> Option<&Embedding> { self.rows.get(position) }

    fn len(&self) -> usize { self.rows.len() }
}

pub const EMBEDDING_DIM: usize = 384;

/// Dense space built with signed feature hashing of unigrams and bigrams.
///
/// Needs no fitted vocabulary, so `transform` works for any text once the corpus rows
/// are encoded.
#[derive(Debug, Default)]
pub struct HashedEmbeddingBackend {
    rows: Vec<Embedding>,
    fitted: bool,
}

impl HashedEmbeddingBackend {
    pub fn encode(text: &str) -> Vec<f32> {
        let tokens = tokenize(text);
        let mut vec = vec![0.0f32; EMBEDDING_DIM];
        for t in &tokens {
            add_hashed(&mut vec, t, 0, 1.0);
        }
        for pair in tokens.windows(2) {
            let bigram = format!("{} {}", pair[0], pair[1]);
            add_hashed(&mut vec, &bigram, 2, 0.5);
        }
        l2_normalize(&mut vec);
        vec
    }
}

fn add_hashed(vec: &mut [f32], term: &str, seed: u64, weight: f32) {
    let idx = (hash_term(term, seed) % EMBEDDING_DIM as u64) as usize;
    let sign = if hash_term(term, seed + 1) % 2 == 0 { 1.0 } else { -1.0 };
    vec[idx] += weight * sign;
}

/// Seeded FNV-1a.
fn hash_term(term: &str, seed: u64) -> u64 {
    let mut h: u64 = 14695981039346656037u64.wrapping_add(seed.wrapping_mul(6364136223846793005));
    for b in term.bytes() {
        h ^= b as u64;
        h = h.wrapping_mul(1099511628211);
    }
    h
}

impl SimilarityBackend for HashedEmbeddingBackend {
    fn name(&self) -> &'static str { "Hashed Embedding" }

    fn fit(&mut self, contents: &[&str]) -> EngineResult<()> {
        let rows: Vec<Embedding> = contents.iter().map(|c| Embedding::Dense(Self::encode(c))).collect();
        if rows.iter().all(Embedding::is_zero) {
            return Err(EngineError::EmptyCorpus);
        }
        self.rows = rows;
        self.fitted = true;
        Ok(())
    }

    fn transform(&self, text: &str) -> EngineResult<Embedding> {
        if !self.fitted {
            return Err(EngineError::NotFitted);
        }
        Ok(Embedding::Dense(Self::encode(text)))
    }

    fn vector_of(&self, position: usize) -> Option<&Embedding> { self.rows.get(position) }

    fn len(&self) -> usize { self.rows.len() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backends_share_the_contract() {
        let docs = ["ninja village action", "ninja school action", "quiet romance drama"];
        for kind in [BackendKind::Tfidf, BackendKind::HashedEmbedding] {
            let mut b = kind.create(TfidfConfig::default());
            assert!(matches!(b.transform("ninja"), Err(EngineError::NotFitted)));
            b.fit(&docs).unwrap();
            assert_eq!(b.len(), 3);
            let a = b.vector_of(0).unwrap();
            let near = b.similarity(a, b.vector_of(1).unwrap());
            let far = b.similarity(a, b.vector_of(2).unwrap());
            assert!(near > far, "{}: {near} <= {far}", b.name());
            assert!((b.similarity(a, a) - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn hashed_backend_rejects_empty_content() {
        let mut b = HashedEmbeddingBackend::default();
        assert!(matches!(b.fit(&["", "the"]), Err(EngineError::EmptyCorpus)));
    }

    #[test]
    fn backend_kind_parses() {
        assert_eq!("TF-IDF".parse::<BackendKind>().unwrap(), BackendKind::Tfidf);
        assert_eq!("hashed".parse::<BackendKind>().unwrap(), BackendKind::HashedEmbedding);
        assert!("bert".parse::<BackendKind>().is_err());
    }
}
