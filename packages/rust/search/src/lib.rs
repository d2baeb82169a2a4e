//! Competitor search.
//!
//! [`GoogleSearch`] scrapes a live results page through the browser.
//! [`FallbackSearch`] is a fixed list of topic-relevant articles.
//! [`SearchWithFallback`] asks the live provider first and switches to the
//! fallback only when the live query comes back empty after filtering.
//! Errors from the live provider are not masked.

mod fallback;
mod google;

use async_trait::async_trait;
use tracing::{info, warn};

use blogforge_shared::{Result, SearchResult};

pub use fallback::{FALLBACK_RESULTS, FallbackSearch};
pub use google::{EXCLUDED_HOSTS, GoogleSearch, is_excluded, parse_results};

/// Ranked `(title, url)` results for a query.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// At most `max_results` results, best first, excluded hosts removed.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>>;

    /// Provider name for tracing.
    fn name(&self) -> &str;
}

/// Live provider with a fallback source for empty result sets.
pub struct SearchWithFallback<L, F> {
    live: L,
    fallback: F,
}

impl<L, F> SearchWithFallback<L, F> {
    pub fn new(live: L, fallback: F) -> Self {
        Self { live, fallback }
    }
}

#[async_trait]
impl<L, F> SearchProvider for SearchWithFallback<L, F>
where
    L: SearchProvider,
    F: SearchProvider,
{
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        let live = self.live.search(query, max_results).await?;
        if !live.is_empty() {
            info!(provider = self.live.name(), results = live.len(), "search results");
            return Ok(live);
        }

        warn!(
            provider = self.live.name(),
            fallback = self.fallback.name(),
            "live search returned nothing, using fallback"
        );
        let fallback = self.fallback.search(query, max_results).await?;
        info!(provider = self.fallback.name(), results = fallback.len(), "search results");
        Ok(fallback)
    }

    fn name(&self) -> &str {
        self.live.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blogforge_shared::BlogforgeError;

    struct Fixed(Vec<SearchResult>);

    #[async_trait]
    impl SearchProvider for Fixed {
        async fn search(&self, _query: &str, max: usize) -> Result<Vec<SearchResult>> {
            Ok(self.0.iter().take(max).cloned().collect())
        }
        fn name(&self) -> &str {
            "fixed"
        }
    }

    struct Broken;

    #[async_trait]
    impl SearchProvider for Broken {
        async fn search(&self, _query: &str, _max: usize) -> Result<Vec<SearchResult>> {
            Err(BlogforgeError::render("https://search.example", "timeout"))
        }
        fn name(&self) -> &str {
            "broken"
        }
    }

    #[tokio::test]
    async fn live_results_win() {
        let live = Fixed(vec![SearchResult::new("Live", "https://live.example/a")]);
        let search = SearchWithFallback::new(live, FallbackSearch::default());
        let results = search.search("q", 2).await.unwrap();
        assert_eq!(results, vec![SearchResult::new("Live", "https://live.example/a")]);
    }

    #[tokio::test]
    async fn empty_live_uses_fallback_truncated() {
        let search = SearchWithFallback::new(Fixed(vec![]), FallbackSearch::default());
        let results = search.search("q", 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].url, FALLBACK_RESULTS[0].1);
        assert_eq!(results[1].url, FALLBACK_RESULTS[1].1);

        let results = search.search("q", 10).await.unwrap();
        assert_eq!(results.len(), FALLBACK_RESULTS.len());
    }

    #[tokio::test]
    async fn both_empty_yields_nothing() {
        let search = SearchWithFallback::new(Fixed(vec![]), FallbackSearch::empty());
        assert!(search.search("q", 2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn live_errors_are_not_masked() {
        let search = SearchWithFallback::new(Broken, FallbackSearch::default());
        let err = search.search("q", 2).await.unwrap_err();
        assert!(matches!(err, BlogforgeError::Render { .. }));
    }
}
