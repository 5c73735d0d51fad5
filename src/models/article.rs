use serde::{Deserialize, Serialize};

/// A news item or patch-notes entry as stored in `news.json` / `patches.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub title: String,
    /// Publication date, `YYYY-MM-DD`. Kept as text; the scrapers write
    /// whatever the source page showed when parsing failed.
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub is_latest: bool,
    #[serde(default)]
    pub full_content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleKind {
    News,
    Patch,
}

impl ArticleKind {
    pub fn file_name(&self) -> &'static str {
        match self {
            ArticleKind::News => "news.json",
            ArticleKind::Patch => "patches.json",
        }
    }
}

/// An article together with its routing slug.
#[derive(Debug, Clone, Serialize)]
pub struct PublishedArticle {
    pub slug: String,
    pub kind: ArticleKind,
    #[serde(flatten)]
    pub article: Article,
}
