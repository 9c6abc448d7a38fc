//! Article resolver client for Wikirace.
//!
//! The resolver is the engine's one external dependency during gameplay: it
//! canonicalizes a raw article title (following redirects) and classifies
//! the page so the validation pipeline can enforce room rules. It is
//! treated as fallible and slow — every failure degrades to
//! [`Resolution::NotFound`], never to an error that could take a room down.
//!
//! # Key types
//!
//! - [`ArticleResolver`] — the trait the engine is generic over
//! - [`RestResolver`] — the production implementation (Wikipedia REST API)
//! - [`EchoResolver`] — offline implementation for development and tests
//! - [`is_supported_language`] — the wiki language table

#![allow(async_fn_in_trait)]

mod lang;
mod rest;

pub use lang::is_supported_language;
pub use rest::RestResolver;

/// How the wiki classifies a resolved page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// A regular article.
    Standard,
    /// A disambiguation page; rooms may disallow these.
    Disambiguation,
    /// Anything else the summary endpoint reports (no-extract and friends).
    Other,
}

/// The namespace a resolved page lives in. Only Main and Category pages are
/// ever playable; everything else is rejected by the click pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageNamespace {
    Main,
    Category,
    Other,
}

/// A successfully resolved article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArticle {
    /// The canonical title, redirects followed.
    pub title: String,
    pub kind: PageKind,
    pub namespace: PageNamespace,
    /// Thumbnail URL, or empty if the page has none.
    pub thumbnail: String,
}

/// The outcome of a resolution attempt. Network and decode failures are
/// folded into `NotFound` by implementations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(ResolvedArticle),
    NotFound,
}

impl Resolution {
    /// Returns the resolved article, if any.
    pub fn found(&self) -> Option<&ResolvedArticle> {
        match self {
            Self::Found(article) => Some(article),
            Self::NotFound => None,
        }
    }
}

/// Canonicalizes and classifies article titles.
///
/// Implementations must be shareable across connection handler tasks, hence
/// the `Send + Sync + 'static` bounds.
pub trait ArticleResolver: Send + Sync + 'static {
    /// Resolves a single raw title against the given wiki language.
    fn resolve(
        &self,
        title: &str,
        language: &str,
    ) -> impl std::future::Future<Output = Resolution> + Send;

    /// Resolves a batch of titles. The default goes one by one;
    /// implementations backed by a network service should overlap requests.
    fn resolve_many(
        &self,
        titles: &[String],
        language: &str,
    ) -> impl std::future::Future<Output = Vec<Resolution>> + Send {
        async move {
            let mut out = Vec::with_capacity(titles.len());
            for title in titles {
                out.push(self.resolve(title, language).await);
            }
            out
        }
    }
}

/// A resolver that accepts every non-empty title verbatim as a standard
/// main-namespace article. No network, no canonicalization — for offline
/// development and tests only.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoResolver;

impl ArticleResolver for EchoResolver {
    async fn resolve(&self, title: &str, _language: &str) -> Resolution {
        let title = title.trim();
        if title.is_empty() {
            return Resolution::NotFound;
        }
        Resolution::Found(ResolvedArticle {
            title: title.to_string(),
            kind: PageKind::Standard,
            namespace: PageNamespace::Main,
            thumbnail: String::new(),
        })
    }
}
