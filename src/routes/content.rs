use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::i18n;
use crate::models::{ArticleKind, PublishedArticle};
use crate::AppState;

pub fn news_router() -> Router<Arc<AppState>> {
    router(ArticleKind::News)
}

pub fn patches_router() -> Router<Arc<AppState>> {
    router(ArticleKind::Patch)
}

fn router(kind: ArticleKind) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/",
            get(move |state: State<Arc<AppState>>| list_articles(state, kind)),
        )
        .route(
            "/:slug",
            get(move |state: State<Arc<AppState>>, slug: Path<String>| {
                get_article(state, slug, kind)
            }),
        )
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ArticleListResponse {
    pub items: Vec<ArticleSummary>,
    pub total: usize,
}

/// Listing entry; the full article body is only sent by the single-article route.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleSummary {
    pub slug: String,
    pub title: String,
    pub date: String,
    pub summary: String,
    pub link: String,
    pub is_latest: bool,
}

impl From<PublishedArticle> for ArticleSummary {
    fn from(p: PublishedArticle) -> Self {
        Self {
            slug: p.slug,
            title: p.article.title,
            date: p.article.date,
            summary: p.article.summary,
            link: p.article.link,
            is_latest: p.article.is_latest,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn list_articles(
    State(state): State<Arc<AppState>>,
    kind: ArticleKind,
) -> AppResult<Json<ArticleListResponse>> {
    let articles = state.content.list(kind).await?;
    let items: Vec<ArticleSummary> = articles.into_iter().map(Into::into).collect();

    Ok(Json(ArticleListResponse {
        total: items.len(),
        items,
    }))
}

async fn get_article(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    kind: ArticleKind,
) -> AppResult<Json<PublishedArticle>> {
    state
        .content
        .find(kind, &slug)
        .await?
        .map(Json)
        .ok_or_else(|| {
            AppError::NotFound(i18n::tr(
                None,
                "not_found.article",
                Some(&[("slug", slug.as_str())]),
            ))
        })
}
