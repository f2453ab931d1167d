use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use engine::EngineConfig;
use http_body_util::BodyExt;
use serde_json::Value;
use server::lookup::{LookupError, LookupHit, TitleLookup};
use server::{build_app, ServerConfig};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;
use tower::ServiceExt;

enum StubLookup {
    Hit,
    Miss,
    Fail,
}

#[async_trait::async_trait]
impl TitleLookup for StubLookup {
    async fn lookup(&self, query: &str, _corpus_key: &str) -> Result<Option<LookupHit>, LookupError> {
        match self {
            StubLookup::Hit => Ok(Some(LookupHit {
                title: query.to_string(),
                content: format!("{query} Romance School high school love story"),
                genres: "Romance, School".into(),
                image_url: "http://img/x.jpg".into(),
            })),
            StubLookup::Miss => Ok(None),
            StubLookup::Fail => Err(LookupError::Status(503)),
        }
    }

    fn name(&self) -> &'static str { "stub" }
}

fn write_tiny_catalog(dir: &Path) {
    fs::write(
        dir.join("anime.csv"),
        "item_id,title,genres,description,image_url\n\
         1,Naruto,Action|Adventure,A young ninja seeks recognition,http://img/1.jpg\n\
         2,Naruto Shippuden,Action|Adventure,The ninja returns older,\n\
         3,Toradora,Romance|School,High school love story,\n",
    )
    .unwrap();
}

fn app(dir: &Path, lookup: Option<StubLookup>, admin_token: Option<&str>) -> Router {
    let config = ServerConfig {
        corpora: ServerConfig::media_defaults(dir),
        engine: EngineConfig::default(),
        admin_token: admin_token.map(str::to_string),
    };
    let lookup = lookup.map(|l| Arc::new(l) as Arc<dyn TitleLookup>);
    build_app(config, lookup).unwrap()
}

async fn call(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    call(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

#[tokio::test]
async fn health_and_corpora() {
    let dir = tempdir().unwrap();
    write_tiny_catalog(dir.path());
    let (status, json) = get(app(dir.path(), None, None), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");

    let (_, json) = get(app(dir.path(), None, None), "/corpora").await;
    let arr = json.as_array().unwrap();
    assert_eq!(arr.len(), 1);
    assert_eq!(arr[0]["media_type"], "anime");
    assert_eq!(arr[0]["items"], 3);
}

#[tokio::test]
async fn recommend_returns_ranked_results() {
    let dir = tempdir().unwrap();
    write_tiny_catalog(dir.path());
    let (status, json) = get(app(dir.path(), None, None), "/recommend?media_type=Anime&query=naruto&topn=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["engine_used"], "TF-IDF (Local Title Match)");
    assert_eq!(json["base_title"], "Naruto");
    assert_eq!(json["topn"], 2);
    let arr = json["recommendations"].as_array().unwrap();
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["item_id"], 2);
    assert_eq!(arr[1]["item_id"], 3);
    assert!(arr[0]["similarity_score"].as_f64().unwrap() >= arr[1]["similarity_score"].as_f64().unwrap());
}

#[tokio::test]
async fn recommend_by_item_id() {
    let dir = tempdir().unwrap();
    write_tiny_catalog(dir.path());
    let (status, json) = get(app(dir.path(), None, None), "/recommend?item_id=3&topn=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["base_title"], "Toradora");
    let (status, json) = get(app(dir.path(), Some(StubLookup::Hit), None), "/recommend?item_id=42").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "not_found");
}

#[tokio::test]
async fn failures_are_distinguishable() {
    let dir = tempdir().unwrap();
    write_tiny_catalog(dir.path());

    let (status, json) = get(app(dir.path(), None, None), "/recommend?media_type=manga&query=berserk").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "unknown_corpus");

    let (status, json) =
        get(app(dir.path(), Some(StubLookup::Hit), None), "/recommend?query=gintama&use_smart_search=false").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "not_found");

    let (status, json) = get(app(dir.path(), Some(StubLookup::Miss), None), "/recommend?query=gintama").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "not_found");

    let (status, json) = get(app(dir.path(), Some(StubLookup::Fail), None), "/recommend?query=gintama").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "upstream_lookup_failed");

    let (status, _) = get(app(dir.path(), None, None), "/recommend?query=naruto&topn=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = get(app(dir.path(), None, None), "/recommend?query=%20").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn lookup_hit_ranks_upstream_text() {
    let dir = tempdir().unwrap();
    write_tiny_catalog(dir.path());
    let (status, json) = get(app(dir.path(), Some(StubLookup::Hit), None), "/recommend?query=gintama&topn=10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["engine_used"], "TF-IDF (Live Web Mode)");
    assert_eq!(json["base_title"], "gintama (Web Search)");
    let arr = json["recommendations"].as_array().unwrap();
    assert_eq!(arr.len(), 3);
    assert_eq!(arr[0]["item_id"], 3);
}

#[tokio::test]
async fn admin_reload_requires_token_and_picks_up_new_files() {
    let dir = tempdir().unwrap();
    write_tiny_catalog(dir.path());
    let app = app(dir.path(), None, Some("secret"));

    let req = Request::post("/admin/reload").body(Body::empty()).unwrap();
    let (status, json) = call(app.clone(), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "unauthorized");

    fs::write(dir.path().join("manga.csv"), "item_id,title,genres,description\n7,Berserk,Dark Fantasy,Guts\n8,Vagabond,Samurai,Musashi\n").unwrap();
    let req = Request::post("/admin/reload").header("X-ADMIN-TOKEN", "secret").body(Body::empty()).unwrap();
    let (status, json) = call(app.clone(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["loaded"], serde_json::json!(["anime", "manga"]));

    let (status, json) = get(app, "/recommend?media_type=manga&query=berserk").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["recommendations"][0]["item_id"], 8);
}
