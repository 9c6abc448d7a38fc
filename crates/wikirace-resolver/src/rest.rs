//! Production resolver backed by the Wikipedia REST `page/summary` endpoint.

use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::{ArticleResolver, PageKind, PageNamespace, Resolution, ResolvedArticle};

/// The REST API reports "page not found" as an error type under this prefix
/// (with a 404 status); any error type is treated as not found.
const ERROR_TYPE_PREFIX: &str = "https://mediawiki.org/wiki/HyperSwitch/errors";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Resolves titles against `https://{lang}.wikipedia.org/api/rest_v1/`.
///
/// The summary endpoint follows redirects server-side, so the canonical
/// title it returns is the redirect target. Every transport, status, or
/// decode failure maps to [`Resolution::NotFound`] — a flaky wiki must
/// never crash a room.
#[derive(Debug, Clone)]
pub struct RestResolver {
    client: reqwest::Client,
}

impl RestResolver {
    /// Creates a resolver with a shared connection pool and request timeout.
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("wikirace-server/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

impl Default for RestResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ArticleResolver for RestResolver {
    async fn resolve(&self, title: &str, language: &str) -> Resolution {
        let title = title.trim();
        if title.is_empty() {
            return Resolution::NotFound;
        }
        let Some(url) = summary_url(language, title) else {
            return Resolution::NotFound;
        };

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(title, language, error = %e, "article lookup failed");
                return Resolution::NotFound;
            }
        };

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Resolution::NotFound;
        }
        if !response.status().is_success() {
            tracing::warn!(
                title,
                language,
                status = %response.status(),
                "article lookup returned an unexpected status"
            );
            return Resolution::NotFound;
        }

        match response.json::<PageSummary>().await {
            Ok(summary) => classify(summary),
            Err(e) => {
                tracing::warn!(title, language, error = %e, "article summary was unreadable");
                Resolution::NotFound
            }
        }
    }

    async fn resolve_many(&self, titles: &[String], language: &str) -> Vec<Resolution> {
        futures_util::future::join_all(
            titles.iter().map(|title| self.resolve(title, language)),
        )
        .await
    }
}

/// Builds the summary URL, percent-encoding the title as a path segment.
fn summary_url(language: &str, title: &str) -> Option<Url> {
    let mut url =
        Url::parse(&format!("https://{language}.wikipedia.org/api/rest_v1/page/summary/")).ok()?;
    url.path_segments_mut().ok()?.push(title);
    Some(url)
}

// ---------------------------------------------------------------------------
// Response shape
// ---------------------------------------------------------------------------

/// The subset of the summary response the engine cares about.
#[derive(Debug, Deserialize)]
struct PageSummary {
    /// Page classification, or an error type URI for failed lookups.
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    titles: Option<Titles>,
    #[serde(default)]
    namespace: Option<NamespaceInfo>,
    #[serde(default)]
    thumbnail: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Titles {
    canonical: String,
}

#[derive(Debug, Deserialize)]
struct NamespaceInfo {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    source: String,
}

/// Maps a decoded summary onto the engine's classification.
fn classify(summary: PageSummary) -> Resolution {
    if summary.kind.starts_with(ERROR_TYPE_PREFIX) {
        return Resolution::NotFound;
    }
    let Some(titles) = summary.titles else {
        return Resolution::NotFound;
    };

    let kind = match summary.kind.as_str() {
        "standard" => PageKind::Standard,
        "disambiguation" => PageKind::Disambiguation,
        _ => PageKind::Other,
    };
    // Namespace ids are MediaWiki-wide constants: 0 = main, 14 = category.
    let namespace = match summary.namespace.map(|n| n.id) {
        Some(0) | None => PageNamespace::Main,
        Some(14) => PageNamespace::Category,
        Some(_) => PageNamespace::Other,
    };

    Resolution::Found(ResolvedArticle {
        title: titles.canonical,
        kind,
        namespace,
        thumbnail: summary.thumbnail.map(|t| t.source).unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Resolution {
        classify(serde_json::from_str::<PageSummary>(json).expect("valid fixture"))
    }

    #[test]
    fn test_classify_standard_article() {
        let resolution = parse(
            r#"{
                "type": "standard",
                "titles": {"canonical": "Dog", "normalized": "Dog"},
                "namespace": {"id": 0, "text": ""},
                "thumbnail": {"source": "https://upload.wikimedia.org/dog.jpg"}
            }"#,
        );
        let article = resolution.found().unwrap();
        assert_eq!(article.title, "Dog");
        assert_eq!(article.kind, PageKind::Standard);
        assert_eq!(article.namespace, PageNamespace::Main);
        assert_eq!(article.thumbnail, "https://upload.wikimedia.org/dog.jpg");
    }

    #[test]
    fn test_classify_disambiguation_page() {
        let resolution = parse(
            r#"{
                "type": "disambiguation",
                "titles": {"canonical": "Mercury"},
                "namespace": {"id": 0}
            }"#,
        );
        assert_eq!(resolution.found().unwrap().kind, PageKind::Disambiguation);
    }

    #[test]
    fn test_classify_category_namespace() {
        let resolution = parse(
            r#"{
                "type": "no-extract",
                "titles": {"canonical": "Category:Mammals"},
                "namespace": {"id": 14}
            }"#,
        );
        let article = resolution.found().unwrap();
        assert_eq!(article.namespace, PageNamespace::Category);
        assert_eq!(article.kind, PageKind::Other);
    }

    #[test]
    fn test_classify_error_type_is_not_found() {
        let resolution = parse(
            r#"{"type": "https://mediawiki.org/wiki/HyperSwitch/errors/not_found"}"#,
        );
        assert_eq!(resolution, Resolution::NotFound);
    }

    #[test]
    fn test_classify_missing_thumbnail_is_empty_string() {
        let resolution = parse(
            r#"{"type": "standard", "titles": {"canonical": "Obscure_topic"}}"#,
        );
        assert_eq!(resolution.found().unwrap().thumbnail, "");
    }

    #[test]
    fn test_summary_url_encodes_title() {
        let url = summary_url("en", "Thomas Bayes/draft").unwrap();
        assert_eq!(
            url.as_str(),
            "https://en.wikipedia.org/api/rest_v1/page/summary/Thomas%20Bayes%2Fdraft"
        );
    }
}
