//! Live title lookup used when a query matches nothing in the local catalog.

use engine::PLACEHOLDER_IMAGE_URL;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

pub const JIKAN_BASE_URL: &str = "https://api.jikan.moe/v4";
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// A title found upstream, reduced to what ranking needs.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupHit {
    pub title: String,
    pub content: String,
    pub genres: String,
    pub image_url: String,
}

#[derive(thiserror::Error, Debug)]
pub enum LookupError {
    #[error("lookup request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("lookup returned status {0}")]
    Status(u16),
}

#[async_trait::async_trait]
pub trait TitleLookup: Send + Sync {
    /// Find the best upstream match for `query` in the catalog family of `corpus_key`.
    async fn lookup(&self, query: &str, corpus_key: &str) -> Result<Option<LookupHit>, LookupError>;

    fn name(&self) -> &'static str;
}

/// Jikan (MyAnimeList) search, one result per query.
pub struct JikanLookup {
    client: Client,
    base_url: String,
}

impl JikanLookup {
    pub fn new(timeout: Duration) -> Result<Self, LookupError> {
        Self::with_base_url(JIKAN_BASE_URL, timeout)
    }

    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> Result<Self, LookupError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url: base_url.into() })
    }
}

/// Upstream endpoint family for a corpus key.
fn api_type(corpus_key: &str) -> &'static str {
    match corpus_key {
        "manga" | "manhwa" => "manga",
        _ => "anime",
    }
}

#[async_trait::async_trait]
impl TitleLookup for JikanLookup {
    async fn lookup(&self, query: &str, corpus_key: &str) -> Result<Option<LookupHit>, LookupError> {
        let url = format!("{}/{}", self.base_url, api_type(corpus_key));
        tracing::info!(query, corpus = corpus_key, "searching upstream catalog");
        let resp = self
            .client
            .get(url)
            .query(&[("q", query), ("limit", "1")])
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(LookupError::Status(resp.status().as_u16()));
        }
        let body: SearchBody = resp.json().await?;
        Ok(body.data.into_iter().next().map(into_hit))
    }

    fn name(&self) -> &'static str { "jikan" }
}

#[derive(Debug, Deserialize)]
struct SearchBody {
    #[serde(default)]
    data: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    title: String,
    #[serde(default)]
    synopsis: Option<String>,
    #[serde(default)]
    genres: Vec<Named>,
    #[serde(default)]
    images: Option<Images>,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Images {
    jpg: Option<Jpg>,
}

#[derive(Debug, Deserialize)]
struct Jpg {
    image_url: Option<String>,
}

fn into_hit(entry: Entry) -> LookupHit {
    let genres = entry.genres.into_iter().map(|g| g.name).collect::<Vec<_>>().join(", ");
    let image_url = entry
        .images
        .and_then(|i| i.jpg)
        .and_then(|j| j.image_url)
        .unwrap_or_else(|| PLACEHOLDER_IMAGE_URL.to_string());
    let description = entry.synopsis.unwrap_or_default();
    LookupHit {
        content: format!("{} {} {}", entry.title, genres, description),
        title: entry.title,
        genres,
        image_url,
    }
}
