use axum::body::Bytes;
use axum::http::StatusCode;
use cinecatalog::app::{build_router, AppState};
use cinecatalog::client::{
    movies, search, FetchError, HttpTransport, Lookup, QueryClient, QueryObserver, QueryStatus,
};
use cinecatalog::config::GatewayConfig;
use cinecatalog::tmdb::{TmdbApi, UpstreamResponse};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

/// Upstream stand-in that answers by path.
struct ScriptedTmdb {
    calls: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl TmdbApi for ScriptedTmdb {
    async fn get(&self, url: &str, _query: &[(String, String)]) -> anyhow::Result<UpstreamResponse> {
        self.calls.lock().unwrap().push(url.to_string());
        let (status, body) = if url.ends_with("/movie/550") {
            (
                StatusCode::OK,
                json!({ "id": 550, "title": "Fight Club", "poster_path": "/p.jpg", "backdrop_path": null, "runtime": 139, "genres": [{ "id": 18, "name": "Drama" }] }),
            )
        } else if url.ends_with("/search/multi") {
            (
                StatusCode::OK,
                json!({
                    "page": 1,
                    "results": [
                        { "media_type": "tv", "id": 1399, "name": "Game of Thrones", "poster_path": null, "backdrop_path": null },
                        { "media_type": "person", "id": 287, "name": "Brad Pitt", "profile_path": null }
                    ],
                    "total_pages": 1,
                    "total_results": 2
                }),
            )
        } else {
            (
                StatusCode::NOT_FOUND,
                json!({ "status_code": 34, "status_message": "The resource you requested could not be found." }),
            )
        };
        Ok(UpstreamResponse {
            status,
            body: Bytes::from(body.to_string()),
        })
    }
}

async fn spawn_gateway(tmdb: Arc<ScriptedTmdb>) -> SocketAddr {
    let state = AppState {
        tmdb,
        gateway: Arc::new(GatewayConfig::new(Some("server-secret".to_string()))),
    };
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, build_router(state)).await.unwrap();
    });
    addr
}

async fn client_for(tmdb: Arc<ScriptedTmdb>) -> QueryClient {
    let addr = spawn_gateway(tmdb).await;
    let transport = HttpTransport::new(format!("http://{}/api/catalog/", addr)).unwrap();
    QueryClient::new(Arc::new(transport))
}

#[tokio::test]
async fn details_travel_through_gateway_and_cache() {
    let tmdb = Arc::new(ScriptedTmdb {
        calls: Mutex::new(Vec::new()),
    });
    let client = client_for(tmdb.clone()).await;

    let spec = movies::details(550);
    let Lookup::Found(movie) = client.details_or_not_found(&spec).await else {
        panic!("expected movie 550");
    };
    assert_eq!(movie.title, "Fight Club");
    assert_eq!(movie.runtime, Some(139));
    assert_eq!(movie.genres[0].name, "Drama");

    client.fetch(&movies::details(550)).await.unwrap();
    assert_eq!(tmdb.calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn upstream_status_reaches_client_error() {
    let tmdb = Arc::new(ScriptedTmdb {
        calls: Mutex::new(Vec::new()),
    });
    let client = client_for(tmdb).await;

    let err = client.fetch(&movies::details(999999999)).await.unwrap_err();
    assert_eq!(
        err,
        FetchError::Status {
            status: 404,
            message: Some("TMDB API error: 404".to_string()),
        }
    );
    assert_eq!(
        client.details_or_not_found(&movies::details(999999999)).await,
        Lookup::NotFound
    );
}

#[tokio::test]
async fn multi_search_decodes_mixed_media() {
    let tmdb = Arc::new(ScriptedTmdb {
        calls: Mutex::new(Vec::new()),
    });
    let client = client_for(tmdb).await;

    let observer = QueryObserver::new(client, search::multi("thrones", 1));
    let snapshot = observer.load().await;
    assert_eq!(snapshot.status, QueryStatus::Success);
    let results = snapshot.data.unwrap().results;
    let names: Vec<&str> = results.iter().map(|r| r.display_name()).collect();
    assert_eq!(names, vec!["Game of Thrones", "Brad Pitt"]);
}
