//! Fixed fallback results served when live search is blocked.

use async_trait::async_trait;

use blogforge_shared::{Result, SearchResult};

use crate::SearchProvider;

/// Topic-relevant articles for the source blog (AI chatbots, healthcare).
pub const FALLBACK_RESULTS: &[(&str, &str)] = &[
    (
        "How AI Chatbots Are Transforming Healthcare",
        "https://www.forbes.com/sites/forbestechcouncil/2024/01/10/how-ai-chatbots-are-transforming-healthcare/",
    ),
    (
        "The Ultimate Guide to AI Chatbots in 2024",
        "https://www.intercom.com/blog/ai-chatbot/",
    ),
    (
        "Choosing the Right AI Chatbot Platform",
        "https://www.drift.com/blog/ai-chatbot-platform/",
    ),
    (
        "AI in Healthcare: Applications and Benefits",
        "https://www.ibm.com/think/topics/artificial-intelligence-healthcare",
    ),
];

/// A fixed result list, independent of the query.
#[derive(Debug, Clone)]
pub struct FallbackSearch {
    results: Vec<SearchResult>,
}

impl FallbackSearch {
    pub fn new(results: Vec<SearchResult>) -> Self {
        Self { results }
    }

    /// A fallback that never returns anything.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

impl Default for FallbackSearch {
    fn default() -> Self {
        Self::new(
            FALLBACK_RESULTS
                .iter()
                .map(|(title, url)| SearchResult::new(*title, *url))
                .collect(),
        )
    }
}

#[async_trait]
impl SearchProvider for FallbackSearch {
    async fn search(&self, _query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        Ok(self.results.iter().take(max_results).cloned().collect())
    }

    fn name(&self) -> &str {
        "fallback"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_min_of_cap_and_list() {
        let fallback = FallbackSearch::default();
        for cap in 0..6 {
            let results = fallback.search("anything", cap).await.unwrap();
            assert_eq!(results.len(), cap.min(FALLBACK_RESULTS.len()));
        }
    }

    #[test]
    fn fallback_list_avoids_excluded_hosts() {
        assert!(
            FALLBACK_RESULTS
                .iter()
                .all(|(_, url)| !crate::is_excluded(url))
        );
    }
}
