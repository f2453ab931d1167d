//! Content-based recommendation over media catalogs.
//!
//! Catalog rows are folded into a `content` string, fitted into a similarity space
//! (TF-IDF by default), and ranked by cosine similarity against an anchor item or
//! free text.

pub mod assemble;
pub mod backend;
pub mod catalog;
pub mod error;
pub mod ranker;
pub mod registry;
pub mod resolver;
pub mod tokenizer;
pub mod vector;
pub mod vectorizer;

pub use assemble::{assemble, Recommendation};
pub use backend::{BackendKind, HashedEmbeddingBackend, SimilarityBackend, TfidfBackend};
pub use catalog::{CatalogItem, Corpus, RawRow, PLACEHOLDER_IMAGE_URL};
pub use error::{EngineError, EngineResult};
pub use ranker::{rank_by_anchor, rank_by_text, ScoredPosition};
pub use registry::{CorpusEngine, EngineConfig, RecommendQuery, RecommendResponse, Registry, RegistryBuilder, DEFAULT_TOP_N};
pub use resolver::{Resolution, ResolveMode, Resolver};
pub use vectorizer::{TfidfConfig, Vectorizer};
