//! Companion HTTP server: scraping endpoints, model-drafted posts, post persistence.
//!
//! ## Routes
//!
//! - `GET  /health`
//! - `GET  /api/river`, `POST /api/river/generate`
//! - `GET  /api/random-wiki`, `POST /api/random-wiki/generate`
//! - `POST /api/writepost`
//! - `POST /api/posts/save`
//! - `GET  /posts`, `GET /posts/{name}`

mod error;
mod routes;

use axum::http::Request;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::Level;

pub use error::ApiError;

use crate::config::Config;
use crate::provider::DynProvider;
use crate::publish::PostStore;
use crate::scrape::Scraper;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub provider: DynProvider,
    pub scraper: Scraper,
    pub store: PostStore,
}

impl AppState {
    pub fn new(config: Config, provider: DynProvider) -> crate::errors::Result<Self> {
        let scraper = Scraper::new(&config)?;
        let store = PostStore::new(config.posts_root.clone());
        Ok(Self { config: Arc::new(config), provider, scraper, store })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/api/river", get(routes::river))
        .route("/api/river/generate", post(routes::river_generate))
        .route("/api/random-wiki", get(routes::random_wiki))
        .route("/api/random-wiki/generate", post(routes::random_wiki_generate))
        .route("/api/writepost", post(routes::write_post))
        .route("/api/posts/save", post(routes::save_post))
        .route("/posts", get(routes::post_index))
        .route("/posts/{name}", get(routes::post_page))
        .with_state(state)
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
            tracing::span!(
                Level::INFO,
                "http_request",
                method = %request.method(),
                path = %request.uri().path(),
            )
        }))
}

pub async fn serve(state: AppState) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{}", state.config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, posts = %state.store.root().display(), "starting companion server");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::testing::ScriptedProvider;
    use axum::body::Body;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    fn state(posts_root: &std::path::Path) -> AppState {
        let config = Config { posts_root: posts_root.to_path_buf(), ..Config::default() };
        AppState::new(config, Arc::new(ScriptedProvider::new())).unwrap()
    }

    async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let dir = tempfile::tempdir().unwrap();
        let resp = router(state(dir.path()))
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["status"], "ok");
    }

    #[tokio::test]
    async fn generate_routes_require_a_url() {
        let dir = tempfile::tempdir().unwrap();
        for uri in ["/api/writepost", "/api/river/generate", "/api/random-wiki/generate"] {
            let resp = router(state(dir.path()))
                .oneshot(post_json(uri, serde_json::json!({ "title": "x" })))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body_json(resp).await["error"], "URL is required");
        }
    }

    #[tokio::test]
    async fn save_needs_post_and_filename() {
        let dir = tempfile::tempdir().unwrap();
        let resp = router(state(dir.path()))
            .oneshot(post_json("/api/posts/save", serde_json::json!({ "filename": "x" })))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["error"], "Post data and filename are required");
    }

    #[tokio::test]
    async fn saved_post_is_listed_and_served() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(state(dir.path()));

        let body = serde_json::json!({
            "post": { "headline": "Whale explodes", "post": "<p>Boom.</p>", "sourceUrl": "https://x.example" },
            "filename": "Whale Explodes"
        });
        let resp = app.clone().oneshot(post_json("/api/posts/save", body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let saved = body_json(resp).await;
        assert_eq!(saved["filename"], "post-whale-explodes.html");
        assert_eq!(saved["success"], true);

        let index = app
            .clone()
            .oneshot(Request::builder().uri("/posts").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(index.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("{ file: 'post-whale-explodes.html', title: 'Whale explodes' },"));

        let page = app
            .oneshot(Request::builder().uri("/posts/post-whale-explodes.html").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(page.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_pages_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let resp = router(state(dir.path()))
            .oneshot(Request::builder().uri("/posts/secret.txt").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
