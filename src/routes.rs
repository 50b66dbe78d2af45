use std::sync::Arc;

use askama::Template;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::info;

use crate::db::{count_news, Database, NewsRecord};
use crate::ingestor::{store_candidates, Ingestor};
use crate::query::{list_distinct_authors, list_news, NewsFilter};

pub struct AppState {
    pub db: Arc<Database>,
    pub ingestor: Arc<Ingestor>,
    pub max_items: usize,
    pub max_news: i64,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub news: Vec<NewsRecord>,
    pub search: String,
    pub authors: Vec<AuthorOption>,
    pub total: i64,
}

pub struct AuthorOption {
    pub name: String,
    pub selected: bool,
}

// Wrapper for HTML responses
struct HtmlTemplate<T>(T);

impl<T: Template> IntoResponse for HtmlTemplate<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to render template: {}", err),
            )
                .into_response(),
        }
    }
}

// Custom error type
pub struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!("Request failed: {}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Error: {}", self.0),
        )
            .into_response()
    }
}

impl<E: Into<anyhow::Error>> From<E> for AppError {
    fn from(err: E) -> Self {
        AppError(err.into())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub q: Option<String>,
    pub author: Option<String>,
}

// Route handlers
pub async fn index(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = NewsFilter::new(query.q, query.author);
    let mut conn = state.db.acquire().await?;

    let news = list_news(&mut conn, &filter, state.max_news).await?;
    let total = count_news(&mut conn).await?;
    let authors = list_distinct_authors(&mut conn)
        .await?
        .into_iter()
        .map(|name| AuthorOption {
            selected: filter.author.as_deref() == Some(name.as_str()),
            name,
        })
        .collect();

    Ok(HtmlTemplate(IndexTemplate {
        news,
        search: filter.search.unwrap_or_default(),
        authors,
        total,
    }))
}

pub async fn scrape(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    // Fetch before taking a pooled connection
    let candidates = state.ingestor.fetch_candidates(state.max_items).await;
    let mut conn = state.db.acquire().await?;
    let inserted = store_candidates(&mut conn, &candidates).await?;
    info!("Scrape finished, {} new headlines", inserted);

    Ok(Redirect::to("/"))
}

pub async fn health() -> impl IntoResponse {
    Html("OK")
}
