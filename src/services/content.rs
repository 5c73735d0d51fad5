//! News and patch-notes content.
//!
//! The scrapers drop `news.json` and `patches.json` into the content directory;
//! this module loads both, re-files articles whose titles mark them as patch
//! notes, merges duplicates, orders by date and assigns routing slugs.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::models::{Article, ArticleKind, PublishedArticle};

pub const SITE_ORIGIN: &str = "https://arcraiders.com";

const PATCH_KEYWORDS: [&str; 4] = ["patch", "hotfix", "update", "notes"];

#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid content file {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// URL-safe identifier: lowercase, runs of non-alphanumerics become one `-`.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for c in title.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug
    }
}

/// Patch notes are recognised by title keywords; everything else is news.
pub fn kind_for_title(title: &str) -> ArticleKind {
    let lower = title.to_lowercase();
    if PATCH_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        ArticleKind::Patch
    } else {
        ArticleKind::News
    }
}

/// Make relative links absolute against the official site.
pub fn absolute_link(link: &str) -> String {
    if link.is_empty() || link.starts_with("http") {
        link.to_string()
    } else if link.starts_with('/') {
        format!("{}{}", SITE_ORIGIN, link)
    } else {
        format!("{}/{}", SITE_ORIGIN, link)
    }
}

/// Merge duplicates (same title or same link, first wins), sort newest first
/// and flag only the first entry as latest.
pub fn normalize(articles: Vec<Article>) -> Vec<Article> {
    let mut titles = HashSet::new();
    let mut links = HashSet::new();
    let mut out = Vec::with_capacity(articles.len());

    for mut article in articles {
        article.link = absolute_link(&article.link);

        let duplicate = titles.contains(&article.title)
            || (!article.link.is_empty() && links.contains(&article.link));
        if duplicate {
            continue;
        }

        titles.insert(article.title.clone());
        if !article.link.is_empty() {
            links.insert(article.link.clone());
        }
        out.push(article);
    }

    // ISO dates sort lexicographically; stable sort keeps file order on ties.
    out.sort_by(|a, b| b.date.cmp(&a.date));
    for (i, article) in out.iter_mut().enumerate() {
        article.is_latest = i == 0;
    }
    out
}

/// Attach slugs, suffixing `-2`, `-3`, ... on collisions in list order.
/// A suffixed slug never reuses one already taken by an earlier title.
pub fn publish(kind: ArticleKind, articles: Vec<Article>) -> Vec<PublishedArticle> {
    let mut taken: HashSet<String> = HashSet::new();

    articles
        .into_iter()
        .map(|article| {
            let base = slugify(&article.title);
            let mut slug = base.clone();
            let mut n = 1;
            while taken.contains(&slug) {
                n += 1;
                slug = format!("{}-{}", base, n);
            }
            taken.insert(slug.clone());
            PublishedArticle {
                slug,
                kind,
                article,
            }
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct ContentStore {
    dir: PathBuf,
}

impl ContentStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Load, re-file and normalize one content list. Files are re-read on
    /// every call; the scrapers rewrite them in place.
    pub async fn list(&self, kind: ArticleKind) -> Result<Vec<PublishedArticle>, ContentError> {
        let mut all = self.read_file(ArticleKind::News).await?;
        all.extend(self.read_file(ArticleKind::Patch).await?);

        let selected = all
            .into_iter()
            .filter(|article| kind_for_title(&article.title) == kind)
            .collect();

        Ok(publish(kind, normalize(selected)))
    }

    pub async fn find(
        &self,
        kind: ArticleKind,
        slug: &str,
    ) -> Result<Option<PublishedArticle>, ContentError> {
        Ok(self
            .list(kind)
            .await?
            .into_iter()
            .find(|article| article.slug == slug))
    }

    async fn read_file(&self, kind: ArticleKind) -> Result<Vec<Article>, ContentError> {
        let path = self.dir.join(kind.file_name());
        read_articles(&path).await
    }
}

/// A missing file is an empty list, matching how the scrapers bootstrap.
async fn read_articles(path: &Path) -> Result<Vec<Article>, ContentError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(ContentError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    serde_json::from_slice(&bytes).map_err(|source| ContentError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(title: &str, date: &str, link: &str) -> Article {
        Article {
            title: title.to_string(),
            date: date.to_string(),
            summary: String::new(),
            link: link.to_string(),
            is_latest: false,
            full_content: String::new(),
        }
    }

    #[test]
    fn slugify_basic() {
        assert_eq!(slugify("Patch Notes 1.2.0"), "patch-notes-1-2-0");
        assert_eq!(slugify("  Hello, World!  "), "hello-world");
        assert_eq!(slugify("ARC Raiders -- Update #3"), "arc-raiders-update-3");
    }

    #[test]
    fn slugify_edgecases() {
        assert_eq!(slugify(""), "untitled");
        assert_eq!(slugify("!!!"), "untitled");
        // Non-ASCII letters are separators, not kept
        assert_eq!(slugify("Café Night"), "caf-night");
    }

    #[test]
    fn patch_keywords_pick_kind() {
        assert_eq!(kind_for_title("Hotfix 1.0.3"), ArticleKind::Patch);
        assert_eq!(kind_for_title("Winter UPDATE"), ArticleKind::Patch);
        assert_eq!(kind_for_title("Patch Notes"), ArticleKind::Patch);
        assert_eq!(kind_for_title("New trailer revealed"), ArticleKind::News);
    }

    #[test]
    fn relative_links_are_made_absolute() {
        assert_eq!(absolute_link("/news/foo"), "https://arcraiders.com/news/foo");
        assert_eq!(absolute_link("news/foo"), "https://arcraiders.com/news/foo");
        assert_eq!(absolute_link("https://x.io/a"), "https://x.io/a");
        assert_eq!(absolute_link(""), "");
    }

    #[test]
    fn normalize_dedupes_sorts_and_flags_latest() {
        let merged = normalize(vec![
            article("Old", "2025-01-01", "/news/old"),
            article("New", "2025-03-01", "/news/new"),
            article("New", "2025-03-02", "/news/other"),
            article("Renamed", "2025-02-01", "https://arcraiders.com/news/old"),
        ]);

        let titles: Vec<_> = merged.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, ["New", "Old"]);
        assert!(merged[0].is_latest);
        assert!(!merged[1].is_latest);
    }

    #[test]
    fn publish_suffixes_colliding_slugs() {
        let published = publish(
            ArticleKind::News,
            vec![
                article("Dev Diary", "2025-03-01", ""),
                article("Dev Diary!", "2025-02-01", ""),
                article("dev-diary", "2025-01-01", ""),
            ],
        );

        let slugs: Vec<_> = published.iter().map(|a| a.slug.as_str()).collect();
        assert_eq!(slugs, ["dev-diary", "dev-diary-2", "dev-diary-3"]);
    }

    #[test]
    fn suffixed_slug_skips_natural_slugs() {
        let published = publish(
            ArticleKind::News,
            vec![
                article("Dev Diary", "2025-03-01", ""),
                article("Dev Diary!", "2025-02-01", ""),
                article("Dev Diary 2", "2025-01-01", ""),
            ],
        );

        let slugs: Vec<_> = published.iter().map(|a| a.slug.as_str()).collect();
        assert_eq!(slugs, ["dev-diary", "dev-diary-2", "dev-diary-2-2"]);

        let unique: HashSet<_> = slugs.iter().collect();
        assert_eq!(unique.len(), slugs.len());
    }

    #[tokio::test]
    async fn store_refiles_and_finds_by_slug() {
        let dir = tempfile::tempdir().unwrap();
        let news = vec![
            article("Server Slam recap", "2025-02-10", "/news/recap"),
            article("Hotfix 1.0.2", "2025-02-12", "/news/hotfix-102"),
        ];
        let patches = vec![article("Patch Notes 1.0.1", "2025-02-01", "/news/pn-101")];
        std::fs::write(
            dir.path().join("news.json"),
            serde_json::to_vec(&news).unwrap(),
        )
        .unwrap();
        std::fs::write(
            dir.path().join("patches.json"),
            serde_json::to_vec(&patches).unwrap(),
        )
        .unwrap();

        let store = ContentStore::new(dir.path());

        let news = store.list(ArticleKind::News).await.unwrap();
        assert_eq!(news.len(), 1);
        assert_eq!(news[0].slug, "server-slam-recap");

        let patches = store.list(ArticleKind::Patch).await.unwrap();
        let slugs: Vec<_> = patches.iter().map(|a| a.slug.as_str()).collect();
        assert_eq!(slugs, ["hotfix-1-0-2", "patch-notes-1-0-1"]);
        assert!(patches[0].article.is_latest);

        let found = store
            .find(ArticleKind::Patch, "patch-notes-1-0-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.article.link, "https://arcraiders.com/news/pn-101");
        assert!(store
            .find(ArticleKind::News, "nope")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn missing_files_are_empty_lists() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(dir.path());
        let news = tokio_test::assert_ok!(store.list(ArticleKind::News).await);
        assert!(news.is_empty());
    }

    #[tokio::test]
    async fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("news.json"), b"{not json").unwrap();
        let store = ContentStore::new(dir.path());
        assert!(matches!(
            store.list(ArticleKind::News).await,
            Err(ContentError::Decode { .. })
        ));
    }
}
