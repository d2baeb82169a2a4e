//! Live search by rendering a Google results page.

use std::collections::HashSet;
use std::sync::LazyLock;

use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::{debug, instrument, warn};
use url::Url;

use blogforge_browser::{PageRenderer, WaitPolicy};
use blogforge_shared::{BlogforgeError, Result, SearchResult};

use crate::SearchProvider;

/// Hosts never used as competitors: social platforms, the search engine
/// itself, and general reference sites. Matched as substrings of the host.
pub const EXCLUDED_HOSTS: &[&str] = &[
    "youtube.com",
    "facebook.com",
    "twitter.com",
    "instagram.com",
    "linkedin.com",
    "reddit.com",
    "pinterest.com",
    "google.com",
    "wikipedia.org",
];

static RESULT_BLOCK: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div.g, div[data-sokoban-container]").expect("valid result selector")
});
static LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid link selector"));
static HEADING: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h3").expect("valid heading selector"));

/// Whether `url` points at an excluded host. Unparsable URLs count as excluded.
pub fn is_excluded(url: &str) -> bool {
    match Url::parse(url).ok().as_ref().and_then(Url::host_str) {
        Some(host) => EXCLUDED_HOSTS.iter().any(|pattern| host.contains(pattern)),
        None => true,
    }
}

/// Unwrap Google's `/url?q=<target>` redirect links.
fn resolve_href(href: &str) -> Option<String> {
    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href.to_string());
    }
    if href.starts_with("/url?") {
        let wrapped = Url::parse("https://www.google.com").ok()?.join(href).ok()?;
        return wrapped
            .query_pairs()
            .find(|(k, _)| k == "q")
            .map(|(_, v)| v.into_owned())
            .filter(|target| target.starts_with("http"));
    }
    None
}

/// Extract organic results from a results page in rank order.
///
/// Duplicate URLs keep their first position; excluded hosts are dropped.
pub fn parse_results(html: &str) -> Vec<SearchResult> {
    let doc = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut results = Vec::new();

    for block in doc.select(&RESULT_BLOCK) {
        let Some(url) = block
            .select(&LINK)
            .next()
            .and_then(|a| a.value().attr("href"))
            .and_then(resolve_href)
        else {
            continue;
        };
        let Some(title) = block
            .select(&HEADING)
            .next()
            .map(|h| h.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
        else {
            continue;
        };

        if is_excluded(&url) {
            debug!(%url, "excluded result");
            continue;
        }
        if seen.insert(url.clone()) {
            results.push(SearchResult { title, url });
        }
    }

    results
}

/// Google web search through the shared browser session.
pub struct GoogleSearch<'a> {
    renderer: &'a dyn PageRenderer,
    engine_url: String,
}

impl<'a> GoogleSearch<'a> {
    pub fn new(renderer: &'a dyn PageRenderer, engine_url: impl Into<String>) -> Self {
        Self {
            renderer,
            engine_url: engine_url.into(),
        }
    }

    fn query_url(&self, query: &str) -> Result<String> {
        Url::parse_with_params(&self.engine_url, &[("q", query), ("hl", "en")])
            .map(String::from)
            .map_err(|e| BlogforgeError::config(format!("invalid search url {}: {e}", self.engine_url)))
    }
}

#[async_trait]
impl SearchProvider for GoogleSearch<'_> {
    #[instrument(skip(self))]
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        let url = self.query_url(query)?;
        let page = self.renderer.render(&url, WaitPolicy::NetworkIdle).await?;

        let mut results = parse_results(&page.html);
        if results.is_empty() {
            let blocked = page.html.contains("unusual traffic") || page.final_url.contains("/sorry/");
            warn!(blocked, "no organic results on search page");
        }
        results.truncate(max_results);
        Ok(results)
    }

    fn name(&self) -> &str {
        "google"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blogforge_browser::StaticRenderer;

    fn load_fixture(name: &str) -> String {
        let path = format!("{}/../../../fixtures/html/{name}", env!("CARGO_MANIFEST_DIR"));
        std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing fixture: {path}"))
    }

    const ENGINE: &str = "https://www.google.com/search";

    fn query_url(q: &str) -> String {
        Url::parse_with_params(ENGINE, &[("q", q), ("hl", "en")])
            .unwrap()
            .to_string()
    }

    #[test]
    fn exclusion_matches_host_substrings() {
        assert!(is_excluded("https://www.youtube.com/watch?v=1"));
        assert!(is_excluded("https://en.m.wikipedia.org/wiki/Chatbot"));
        assert!(is_excluded("https://news.google.com/x"));
        assert!(is_excluded("not a url"));
        assert!(!is_excluded("https://clinicops.example/blog"));
        // Only the host is checked, not the path.
        assert!(!is_excluded("https://clinicops.example/youtube.com-tips"));
    }

    #[test]
    fn parses_fixture_in_rank_order() {
        let results = parse_results(&load_fixture("google_results.html"));
        let urls: Vec<&str> = results.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://www.healthtechweekly.example/ai-chatbots-patients",
                "https://clinicops.example/blog/front-desk-automation",
                "https://vendor.example/chatbot-buyers-guide",
            ]
        );
        assert_eq!(results[0].title, "How AI Chatbots Help Patients");
    }

    #[test]
    fn unwraps_redirect_links() {
        let html = r#"<div class="g"><a href="/url?q=https://target.example/post&amp;sa=U"><h3>Target</h3></a></div>"#;
        let results = parse_results(html);
        assert_eq!(results, vec![SearchResult::new("Target", "https://target.example/post")]);
    }

    #[tokio::test]
    async fn live_search_truncates_after_filtering() {
        let renderer = StaticRenderer::new().page(
            query_url("ai chatbots for clinics"),
            load_fixture("google_results.html"),
        );
        let search = GoogleSearch::new(&renderer, ENGINE);
        let results = search.search("ai chatbots for clinics", 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| !is_excluded(&r.url)));
    }

    #[tokio::test]
    async fn blocked_page_yields_no_results() {
        let renderer =
            StaticRenderer::new().page(query_url("anything"), load_fixture("google_blocked.html"));
        let search = GoogleSearch::new(&renderer, ENGINE);
        assert!(search.search("anything", 2).await.unwrap().is_empty());
    }
}
