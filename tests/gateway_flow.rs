use axum::body::{to_bytes, Body, Bytes};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use cinecatalog::app::{build_router, AppState};
use cinecatalog::config::GatewayConfig;
use cinecatalog::gateway::CACHE_CONTROL_VALUE;
use cinecatalog::tmdb::{TmdbApi, UpstreamResponse};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::util::ServiceExt;

const API_KEY: &str = "server-secret";

enum Reply {
    Json(StatusCode, Value),
    Raw(StatusCode, &'static str),
    Unreachable,
}

struct FakeTmdb {
    reply: Reply,
    calls: Mutex<Vec<(String, Vec<(String, String)>)>>,
}

impl FakeTmdb {
    fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<(String, Vec<(String, String)>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl TmdbApi for FakeTmdb {
    async fn get(&self, url: &str, query: &[(String, String)]) -> anyhow::Result<UpstreamResponse> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), query.to_vec()));
        match &self.reply {
            Reply::Json(status, body) => Ok(UpstreamResponse {
                status: *status,
                body: Bytes::from(body.to_string()),
            }),
            Reply::Raw(status, body) => Ok(UpstreamResponse {
                status: *status,
                body: Bytes::from(body.to_string()),
            }),
            Reply::Unreachable => Err(anyhow::anyhow!("connection refused")),
        }
    }
}

fn app(tmdb: Arc<FakeTmdb>, api_key: Option<&str>) -> Router {
    let state = AppState {
        tmdb,
        gateway: Arc::new(GatewayConfig::new(api_key.map(str::to_string))),
    };
    build_router(state)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri)
        .body(Body::empty())
        .expect("failed to build request")
}

async fn body_json(res: axum::response::Response) -> Value {
    let bytes = to_bytes(res.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

fn param<'a>(query: &'a [(String, String)], key: &str) -> Vec<&'a str> {
    query
        .iter()
        .filter(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
        .collect()
}

#[tokio::test]
async fn relays_upstream_body_with_cache_header() {
    let movie = json!({ "id": 550, "title": "Fight Club", "runtime": 139 });
    let tmdb = FakeTmdb::new(Reply::Json(StatusCode::OK, movie.clone()));
    let res = app(tmdb.clone(), Some(API_KEY))
        .oneshot(get("/api/catalog/movie/550"))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers().get(header::CACHE_CONTROL).unwrap(),
        CACHE_CONTROL_VALUE
    );
    assert_eq!(
        res.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );
    assert_eq!(body_json(res).await, movie);

    let calls = tmdb.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "https://api.themoviedb.org/3/movie/550");
    assert_eq!(param(&calls[0].1, "api_key"), vec![API_KEY]);
    assert_eq!(param(&calls[0].1, "language"), vec!["en-US"]);
}

#[tokio::test]
async fn forwards_nested_path_and_caller_parameters() {
    let tmdb = FakeTmdb::new(Reply::Json(StatusCode::OK, json!({ "id": 550, "cast": [], "crew": [] })));
    let res = app(tmdb.clone(), Some(API_KEY))
        .oneshot(get("/api/catalog/discover/movie?page=2&with_genres=28%2C12&sort_by=popularity.desc"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let calls = tmdb.calls();
    assert_eq!(calls[0].0, "https://api.themoviedb.org/3/discover/movie");
    assert_eq!(param(&calls[0].1, "page"), vec!["2"]);
    assert_eq!(param(&calls[0].1, "with_genres"), vec!["28,12"]);
    assert_eq!(param(&calls[0].1, "sort_by"), vec!["popularity.desc"]);
}

#[tokio::test]
async fn caller_credential_is_never_forwarded() {
    let tmdb = FakeTmdb::new(Reply::Json(StatusCode::OK, json!({ "page": 1, "results": [], "total_pages": 1, "total_results": 0 })));
    let res = app(tmdb.clone(), Some(API_KEY))
        .oneshot(get("/api/catalog/movie/popular?api_key=attacker&page=1&api_key=again"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let calls = tmdb.calls();
    assert_eq!(param(&calls[0].1, "api_key"), vec![API_KEY]);
    assert!(calls[0]
        .1
        .iter()
        .all(|(_, v)| v != "attacker" && v != "again"));
}

#[tokio::test]
async fn mirrors_upstream_error_statuses() {
    for code in [400u16, 401, 404, 429, 500, 503] {
        let status = StatusCode::from_u16(code).unwrap();
        let tmdb = FakeTmdb::new(Reply::Json(
            status,
            json!({ "status_message": "nope", "success": false }),
        ));
        let res = app(tmdb, Some(API_KEY))
            .oneshot(get("/api/catalog/movie/999999999"))
            .await
            .unwrap();
        assert_eq!(res.status(), status);
        assert!(res.headers().get(header::CACHE_CONTROL).is_none());
        assert_eq!(
            body_json(res).await,
            json!({ "error": format!("TMDB API error: {}", code) })
        );
    }
}

#[tokio::test]
async fn missing_credential_fails_without_calling_upstream() {
    let tmdb = FakeTmdb::new(Reply::Json(StatusCode::OK, json!({ "id": 550 })));
    let res = app(tmdb.clone(), None)
        .oneshot(get("/api/catalog/movie/550"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(res).await,
        json!({ "error": "TMDB API key is not configured" })
    );
    assert!(tmdb.calls().is_empty());
}

#[tokio::test]
async fn transport_failure_becomes_generic_500() {
    let tmdb = FakeTmdb::new(Reply::Unreachable);
    let res = app(tmdb, Some(API_KEY))
        .oneshot(get("/api/catalog/movie/550"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(res).await,
        json!({ "error": "Failed to fetch from TMDB" })
    );
}

#[tokio::test]
async fn non_json_upstream_body_becomes_generic_500() {
    let tmdb = FakeTmdb::new(Reply::Raw(StatusCode::OK, "<html>maintenance</html>"));
    let res = app(tmdb, Some(API_KEY))
        .oneshot(get("/api/catalog/movie/550"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(res).await,
        json!({ "error": "Failed to fetch from TMDB" })
    );
}

#[tokio::test]
async fn dot_segments_are_rejected() {
    let tmdb = FakeTmdb::new(Reply::Json(StatusCode::OK, json!({})));
    let res = app(tmdb.clone(), Some(API_KEY))
        .oneshot(get("/api/catalog/movie/%2E%2E/account"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(tmdb.calls().is_empty());
}

#[tokio::test]
async fn undecodable_path_gets_json_error() {
    let tmdb = FakeTmdb::new(Reply::Json(StatusCode::OK, json!({})));
    let res = app(tmdb.clone(), Some(API_KEY))
        .oneshot(get("/api/catalog/movie/%FF"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(res).await,
        json!({ "error": "Invalid catalog path" })
    );
    assert!(tmdb.calls().is_empty());

    let res = app(tmdb.clone(), None)
        .oneshot(get("/api/catalog/movie/%FF"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(res).await,
        json!({ "error": "TMDB API key is not configured" })
    );
}

#[tokio::test]
async fn health_reports_ok() {
    let tmdb = FakeTmdb::new(Reply::Unreachable);
    let res = app(tmdb, None).oneshot(get("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}
