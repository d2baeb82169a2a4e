//! End-to-end acquisition pipeline: index page → listing → article pages → store.

use std::time::Instant;

use tracing::{debug, info, instrument, warn};

use blogforge_browser::{PageRenderer, WaitPolicy};
use blogforge_crawler::{ContentExtractor, ListingDiscoverer};
use blogforge_shared::{
    AcquireConfig, Article, BlogforgeError, DEFAULT_AUTHOR, EMPTY_CONTENT, FAILED_CONTENT,
    ListingEntry, NewArticle, Result, ScrapeOutcome, parse_published_date,
};
use blogforge_storage::ArticleStore;

use crate::pacing::{Pacer, PacingStep};

/// Result of one acquisition run.
#[derive(Debug, Default)]
pub struct AcquisitionReport {
    /// Per-entry scrape results, in listing order.
    pub outcomes: Vec<ScrapeOutcome>,
    /// Stored articles (new or pre-existing), in listing order.
    pub articles: Vec<Article>,
    pub created: usize,
    /// Entries whose URL was already stored.
    pub reused: usize,
    /// Entries whose page failed to render.
    pub failed: usize,
    pub elapsed: std::time::Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase or stage.
    fn phase(&self, name: &str);
    /// Called before each item of a multi-item run.
    fn item(&self, label: &str, current: usize, total: usize);
    /// Called once when the run completes.
    fn finish(&self, summary: &str);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn item(&self, _label: &str, _current: usize, _total: usize) {}
    fn finish(&self, _summary: &str) {}
}

/// Acquire the newest `config.count` articles from the index page.
///
/// 1. Render the index and discover article cards
/// 2. Render each article, extract and normalize its content
/// 3. Store it unless the URL is already known
///
/// A page that fails to render is stored with [`FAILED_CONTENT`]; only
/// index or store failures abort the run.
#[instrument(skip_all, fields(index = %config.index_url, count = config.count))]
pub async fn acquire(
    renderer: &dyn PageRenderer,
    store: &dyn ArticleStore,
    pacer: &dyn Pacer,
    config: &AcquireConfig,
    progress: &dyn ProgressReporter,
) -> Result<AcquisitionReport> {
    let start = Instant::now();
    let mut report = AcquisitionReport::default();

    progress.phase("Discovering articles");
    let entries = ListingDiscoverer::new(renderer)
        .discover(&config.index_url)
        .await?;
    let entries: Vec<ListingEntry> = entries.into_iter().take(config.count).collect();
    info!(selected = entries.len(), "listing entries selected");

    let extractor = ContentExtractor::new(config.min_content_chars, config.min_paragraph_chars)
        .with_site_container(&config.content_selector)?;

    let total = entries.len();
    for (i, entry) in entries.iter().enumerate() {
        progress.item(&entry.title, i + 1, total);

        let outcome = scrape_entry(renderer, &extractor, entry).await;
        if outcome.is_failure() {
            report.failed += 1;
        }

        let (article, created) = store_outcome(store, &outcome).await?;
        if created {
            report.created += 1;
        } else {
            report.reused += 1;
        }
        report.articles.push(article);
        report.outcomes.push(outcome);

        if i + 1 < total {
            pacer.pause(PacingStep::BetweenAcquisitions).await;
        }
    }

    report.elapsed = start.elapsed();
    info!(
        created = report.created,
        reused = report.reused,
        failed = report.failed,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "acquisition complete"
    );
    progress.finish(&format!(
        "{} created, {} already stored, {} failed",
        report.created, report.reused, report.failed
    ));
    Ok(report)
}

/// Render and extract one listing entry. Never fails.
async fn scrape_entry(
    renderer: &dyn PageRenderer,
    extractor: &ContentExtractor,
    entry: &ListingEntry,
) -> ScrapeOutcome {
    let mut outcome = ScrapeOutcome {
        title: entry.title.clone(),
        url: entry.url.clone(),
        content: FAILED_CONTENT.to_string(),
        published_date: entry.date_string.as_deref().and_then(parse_published_date),
        author: entry
            .author
            .clone()
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_AUTHOR.to_string()),
        image_url: entry.image_url.clone(),
        excerpt: entry.excerpt.clone(),
        error: None,
    };

    let page = match renderer.render(&entry.url, WaitPolicy::DomReady).await {
        Ok(page) => page,
        Err(e) => {
            warn!(url = %entry.url, error = %e, "article page failed to load");
            outcome.error = Some(e.to_string());
            return outcome;
        }
    };

    let extracted = extractor.extract(&page.html);
    if outcome.title.trim().is_empty() {
        outcome.title = extracted.title.clone();
    }
    if extracted.image_url.is_some() {
        outcome.image_url = extracted.image_url.clone();
    }
    if extracted.excerpt.is_some() {
        outcome.excerpt = extracted.excerpt.clone();
    }

    if extracted.is_empty() {
        debug!(url = %entry.url, "no content extracted");
        outcome.content = EMPTY_CONTENT.to_string();
        return outcome;
    }

    match blogforge_markdown::normalize(&extracted.html, Some(&page.final_url)) {
        Ok(md) if !md.is_empty() => {
            debug!(url = %entry.url, words = md.word_count, source = ?extracted.source, "article extracted");
            outcome.content = md.markdown;
        }
        Ok(_) => outcome.content = EMPTY_CONTENT.to_string(),
        Err(e) => {
            warn!(url = %entry.url, error = %e, "markdown conversion failed");
            outcome.error = Some(e.to_string());
        }
    }
    outcome
}

/// Store `outcome` unless its URL is already known. Returns the stored
/// article and whether it was created.
async fn store_outcome(store: &dyn ArticleStore, outcome: &ScrapeOutcome) -> Result<(Article, bool)> {
    if let Some(existing) = store.find_by_url(&outcome.url).await? {
        debug!(url = %outcome.url, id = %existing.id, "already stored");
        return Ok((existing, false));
    }

    match store.create(NewArticle::from(outcome)).await {
        Ok(article) => Ok((article, true)),
        Err(BlogforgeError::Duplicate { url }) => store
            .find_by_url(&url)
            .await?
            .map(|a| (a, false))
            .ok_or_else(|| BlogforgeError::Storage(format!("duplicate url {url} vanished"))),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blogforge_browser::StaticRenderer;
    use blogforge_shared::{ArticleFilter, ArticleSort};
    use blogforge_storage::Storage;
    use uuid::Uuid;

    use crate::pacing::NoDelay;

    const INDEX: &str = "https://blog.example/blogs/";
    const CLINICS: &str = "https://blog.example/blogs/chatbots-for-clinics/";
    const LEADS: &str = "https://blog.example/blogs/measuring-lead-quality/";

    fn load_fixture(name: &str) -> String {
        let path = format!("{}/../../../fixtures/html/{name}", env!("CARGO_MANIFEST_DIR"));
        std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing fixture: {path}"))
    }

    async fn test_storage() -> Storage {
        let tmp = std::env::temp_dir().join(format!("bf_test_{}.db", Uuid::now_v7()));
        Storage::open(&tmp).await.expect("open test db")
    }

    fn config(count: usize) -> AcquireConfig {
        AcquireConfig {
            index_url: INDEX.into(),
            count,
            content_selector: "#content".into(),
            min_content_chars: 200,
            min_paragraph_chars: 50,
        }
    }

    fn renderer() -> StaticRenderer {
        StaticRenderer::new()
            .page(INDEX, load_fixture("blog_index.html"))
            .page(CLINICS, load_fixture("blog_article.html"))
            .fail(LEADS, "net::ERR_TIMED_OUT")
    }

    #[tokio::test]
    async fn acquires_and_records_failures() {
        let renderer = renderer();
        let store = test_storage().await;

        let report = acquire(&renderer, &store, &NoDelay, &config(2), &SilentProgress)
            .await
            .unwrap();

        assert_eq!(report.created, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.articles.len(), 2);

        let clinics = &report.articles[0];
        assert_eq!(clinics.url, CLINICS);
        assert_eq!(clinics.author, "Priya Raman");
        assert!(clinics.content.contains("## Why clinics adopt chatbots"));
        assert!(clinics.content.contains("- Book and reschedule appointments"));
        assert!(clinics.published_date.is_some());
        assert_eq!(
            clinics.image_url.as_deref(),
            Some("https://blog.example/img/clinic.png")
        );

        let leads = &report.articles[1];
        assert_eq!(leads.title, "Measuring Lead Quality");
        assert_eq!(leads.content, FAILED_CONTENT);
        assert_eq!(leads.author, "Unknown");
        assert!(report.outcomes[1].error.as_deref().unwrap().contains("ERR_TIMED_OUT"));

        let requests = renderer.requests();
        assert_eq!(requests[0], (INDEX.to_string(), WaitPolicy::NetworkIdle));
        assert_eq!(requests[1], (CLINICS.to_string(), WaitPolicy::DomReady));
        assert_eq!(requests.len(), 3);
    }

    #[tokio::test]
    async fn rerun_creates_no_duplicates() {
        let renderer = renderer();
        let store = test_storage().await;

        let first = acquire(&renderer, &store, &NoDelay, &config(2), &SilentProgress)
            .await
            .unwrap();
        let second = acquire(&renderer, &store, &NoDelay, &config(2), &SilentProgress)
            .await
            .unwrap();

        assert_eq!(second.created, 0);
        assert_eq!(second.reused, 2);
        assert_eq!(first.articles[0].id, second.articles[0].id);

        let all = store
            .find(ArticleFilter::default(), ArticleSort::ScrapedAsc, None)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn page_without_content_stores_sentinel() {
        let renderer = StaticRenderer::new()
            .page(INDEX, load_fixture("blog_index.html"))
            .page(
                CLINICS,
                "<html><head><title>Empty</title></head><body><p>Short.</p></body></html>",
            );
        let store = test_storage().await;

        let report = acquire(&renderer, &store, &NoDelay, &config(1), &SilentProgress)
            .await
            .unwrap();

        assert_eq!(report.failed, 0);
        assert_eq!(report.articles[0].content, EMPTY_CONTENT);
        assert_eq!(report.articles[0].title, "Chatbots for Clinics: A Practical Guide");
    }
}
