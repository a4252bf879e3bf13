use axum::extract::{Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::error::ApiError;
use super::AppState;
use crate::publish::{self, Post};
use crate::scrape::{RiverLink, WikiLink};

const MIN_ARTICLE_CHARS: usize = 100;

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok", service: "draftdesk", version: env!("CARGO_PKG_VERSION") })
}

#[derive(Debug, Deserialize)]
pub struct UrlRequest {
    #[serde(default)]
    url: String,
    #[serde(default)]
    title: Option<String>,
}

impl UrlRequest {
    fn url(&self) -> Result<&str, ApiError> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(ApiError::BadRequest("URL is required".into()));
        }
        Ok(url)
    }

    fn title_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.title.as_deref().map(str::trim).filter(|t| !t.is_empty()).unwrap_or(fallback)
    }
}

async fn draft(state: &AppState, article: &str, url: &str, context: &str) -> Result<Post, ApiError> {
    Ok(publish::draft_post(
        state.provider.as_ref(),
        state.config.model,
        state.config.light_output_tokens,
        article,
        url,
        context,
    )
    .await?)
}

pub async fn river(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let headlines: Vec<RiverLink> = state.scraper.fetch_river().await?;
    Ok(Json(json!({ "headlines": headlines })))
}

pub async fn river_generate(
    State(state): State<AppState>,
    Json(body): Json<UrlRequest>,
) -> Result<Json<Value>, ApiError> {
    let url = body.url()?;
    let article = state.scraper.fetch_article(url).await?;
    let context = publish::river_context(body.title_or(&article.title));
    let post = draft(&state, &article.content, url, &context).await?;
    Ok(Json(json!({ "post": post })))
}

pub async fn random_wiki(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let articles: Vec<WikiLink> = state.scraper.fetch_unusual_articles().await?;
    Ok(Json(json!({ "articles": articles })))
}

pub async fn random_wiki_generate(
    State(state): State<AppState>,
    Json(body): Json<UrlRequest>,
) -> Result<Json<Value>, ApiError> {
    let url = body.url()?;
    let article = state.scraper.fetch_wiki_article(url).await?;
    let context = publish::wiki_context(body.title_or(&article.title), &article.description);
    let post = draft(&state, &article.content, url, &context).await?;
    Ok(Json(json!({ "post": post })))
}

pub async fn write_post(
    State(state): State<AppState>,
    Json(body): Json<UrlRequest>,
) -> Result<Json<Value>, ApiError> {
    let url = body.url()?;
    let article = state.scraper.fetch_article(url).await?;
    if article.content.chars().count() < MIN_ARTICLE_CHARS {
        return Err(ApiError::BadRequest(
            "Could not extract article content. The site may be blocking scrapers.".into(),
        ));
    }
    let context = publish::article_context(&article.title);
    let post = draft(&state, &article.content, url, &context).await?;
    Ok(Json(json!({ "post": post })))
}

#[derive(Debug, Deserialize)]
pub struct SaveRequest {
    post: Option<Post>,
    #[serde(default)]
    filename: String,
}

pub async fn save_post(
    State(state): State<AppState>,
    Json(body): Json<SaveRequest>,
) -> Result<Json<Value>, ApiError> {
    let (Some(post), false) = (body.post, body.filename.trim().is_empty()) else {
        return Err(ApiError::BadRequest("Post data and filename are required".into()));
    };
    let saved = state.store.save(&post, &body.filename)?;
    Ok(Json(json!({ "success": true, "filename": saved.filename, "path": saved.path })))
}

fn html(body: String) -> impl IntoResponse {
    ([(CONTENT_TYPE, "text/html; charset=utf-8")], body)
}

pub async fn post_index(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(html(state.store.read_index()?))
}

pub async fn post_page(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let path = state
        .store
        .page_path(&name)
        .filter(|p| p.exists())
        .ok_or_else(|| ApiError::BadRequest(format!("no such post: {name}")))?;
    let body = fs_err::read_to_string(path).map_err(anyhow::Error::from)?;
    Ok(html(body))
}
