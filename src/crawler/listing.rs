//! Listing page extraction
//!
//! A listing page links to the day's articles. Only links whose path
//! contains `/news/<digits>/` count as article references; the digits are
//! the source's article id.

use crate::crawler::PageSelectors;
use scraper::Html;
use std::collections::HashSet;
use url::Url;

/// An article found on a listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleReference {
    pub article_id: String,
    /// Absolute URL of the article page
    pub url: String,
}

/// Extracts the article references on a listing page, in page order
///
/// Links are resolved against `base_url`; links to other hosts are
/// dropped. Repeated ids keep their first occurrence. An empty result is meaningful: the day has no further pages.
pub fn extract_references(
    html: &str,
    selectors: &PageSelectors,
    base_url: &Url,
) -> Vec<ArticleReference> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut references = Vec::new();

    for element in document.select(&selectors.listing_link) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };

        let Ok(url) = base_url.join(href.trim()) else {
            tracing::trace!("Skipping unparseable listing link: {}", href);
            continue;
        };

        if url.host_str() != base_url.host_str() {
            tracing::trace!("Skipping off-site listing link: {}", url);
            continue;
        }

        let Some(article_id) = selectors
            .news_path
            .captures(url.path())
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str().to_string())
        else {
            continue;
        };

        if seen.insert(article_id.clone()) {
            references.push(ArticleReference {
                article_id,
                url: url.to_string(),
            });
        }
    }

    references
}
