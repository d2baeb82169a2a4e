//! Article enhancement: search for competing articles, scrape them, and
//! have the text generator rewrite the original with references.
//!
//! Each article moves through [`Stage`]s in order. The first unrecovered
//! failure ends that article's enhancement without touching the stored
//! record; only individual competitor scrapes are allowed to fail quietly.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use blogforge_browser::{PageRenderer, WaitPolicy};
use blogforge_crawler::ContentExtractor;
use blogforge_markdown::normalize_text;
use blogforge_search::SearchProvider;
use blogforge_shared::{
    Article, ArticleFilter, ArticleId, ArticlePatch, ArticleSort, BlogforgeError, EnhanceConfig,
    Reference, Result, SearchResult,
};
use blogforge_storage::ArticleStore;

use crate::generation::TextGenerator;
use crate::pacing::{Pacer, PacingStep};
use crate::pipeline::{ProgressReporter, SilentProgress};
use crate::prompt::{Competitor, PromptBudgets, SYSTEM_PROMPT, build_user_prompt};

/// Enhancement stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Search,
    ScrapeCompetitors,
    Generate,
    Persist,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Fetch => "fetch",
            Self::Search => "search",
            Self::ScrapeCompetitors => "scrape-competitors",
            Self::Generate => "generate",
            Self::Persist => "persist",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Outcome of a batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub enhanced: Vec<ArticleId>,
    /// Articles that failed, with the error message.
    pub failed: Vec<(ArticleId, String)>,
    /// The run stopped early on request.
    pub cancelled: bool,
}

/// Runs the enhancement stages against injected collaborators.
pub struct Enhancer<'a> {
    store: &'a dyn ArticleStore,
    search: &'a dyn SearchProvider,
    renderer: &'a dyn PageRenderer,
    generator: &'a dyn TextGenerator,
    pacer: &'a dyn Pacer,
    progress: &'a dyn ProgressReporter,
    extractor: ContentExtractor,
    config: EnhanceConfig,
    cancel: Arc<AtomicBool>,
}

impl<'a> Enhancer<'a> {
    pub fn new(
        store: &'a dyn ArticleStore,
        search: &'a dyn SearchProvider,
        renderer: &'a dyn PageRenderer,
        generator: &'a dyn TextGenerator,
        pacer: &'a dyn Pacer,
        config: EnhanceConfig,
    ) -> Self {
        Self {
            store,
            search,
            renderer,
            generator,
            pacer,
            progress: &SilentProgress,
            extractor: ContentExtractor::new(config.min_content_chars, config.min_paragraph_chars),
            config,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_progress(mut self, progress: &'a dyn ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// Share an external cancel flag, e.g. one set from a signal handler.
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Flag checked before each batch item.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    fn enter(&self, id: &ArticleId, stage: Stage) {
        info!(%id, %stage, "enhancement stage");
        self.progress.phase(&stage.to_string());
    }

    /// Enhance a single article and return the updated record.
    #[instrument(skip_all, fields(%id))]
    pub async fn enhance_article(&self, id: &ArticleId) -> Result<Article> {
        self.enter(id, Stage::Fetch);
        let article = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| BlogforgeError::NotFound { id: id.to_string() })?;

        self.enter(id, Stage::Search);
        let results = self
            .search
            .search(&article.title, self.config.max_results)
            .await?;
        if results.is_empty() {
            return Err(BlogforgeError::no_competitors(
                id.to_string(),
                "search returned no results",
            ));
        }
        self.pacer.pause(PacingStep::AfterSearch).await;

        self.enter(id, Stage::ScrapeCompetitors);
        let competitors = self.scrape_competitors(&results).await;
        if competitors.is_empty() {
            return Err(BlogforgeError::no_competitors(
                id.to_string(),
                format!("none of {} competitor pages had usable content", results.len()),
            ));
        }

        self.enter(id, Stage::Generate);
        let budgets = PromptBudgets {
            original: self.config.original_budget,
            competitor: self.config.competitor_budget,
        };
        let prompt = build_user_prompt(&article, &competitors, budgets);
        let updated_content = self
            .generator
            .generate(SYSTEM_PROMPT, &prompt)
            .await
            .map_err(|e| match e {
                BlogforgeError::GenerationFailed(_) => e,
                other => BlogforgeError::GenerationFailed(other.to_string()),
            })?;
        if updated_content.trim().is_empty() {
            return Err(BlogforgeError::GenerationFailed(
                "generator returned empty output".into(),
            ));
        }

        self.enter(id, Stage::Persist);
        let now = Utc::now();
        let references = competitors
            .into_iter()
            .map(|c| Reference {
                title: c.title,
                url: c.url,
                scraped_at: now,
            })
            .collect::<Vec<_>>();
        let patch = ArticlePatch {
            updated_content: Some(updated_content),
            references: Some(references),
            is_updated: Some(true),
            updated_at: Some(now),
            ..Default::default()
        };
        let updated = self
            .store
            .update_by_id(id, patch)
            .await?
            .ok_or_else(|| BlogforgeError::PersistFailed { id: id.to_string() })?;

        self.enter(id, Stage::Done);
        info!(
            %id,
            references = updated.references.len(),
            model = self.generator.model(),
            "article enhanced"
        );
        Ok(updated)
    }

    /// Render each result in rank order, keeping pages with enough text.
    async fn scrape_competitors(&self, results: &[SearchResult]) -> Vec<Competitor> {
        let mut competitors = Vec::new();

        for (i, result) in results.iter().enumerate() {
            if i > 0 {
                self.pacer.pause(PacingStep::BetweenCompetitors).await;
            }

            let page = match self.renderer.render(&result.url, WaitPolicy::NetworkIdle).await {
                Ok(page) => page,
                Err(e) => {
                    warn!(url = %result.url, error = %e, "competitor scrape failed, skipping");
                    continue;
                }
            };

            let extracted = self.extractor.extract(&page.html);
            let content = normalize_text(&extracted.text);
            let chars = content.chars().count();
            if chars <= self.config.min_content_chars {
                warn!(url = %result.url, chars, "competitor content too short, skipping");
                continue;
            }

            debug!(url = %result.url, chars, source = ?extracted.source, "competitor scraped");
            competitors.push(Competitor {
                title: result.title.clone(),
                url: result.url.clone(),
                content,
            });
        }

        competitors
    }

    /// Enhance every article not yet updated, newest first.
    ///
    /// Failures are logged and collected; the batch always continues.
    #[instrument(skip(self), fields(limit = self.config.batch_limit))]
    pub async fn enhance_all(&self) -> Result<BatchReport> {
        let pending = self
            .store
            .find(
                ArticleFilter {
                    is_updated: Some(false),
                },
                ArticleSort::PublishedDesc,
                Some(self.config.batch_limit),
            )
            .await?;

        info!(pending = pending.len(), "starting batch enhancement");
        let mut report = BatchReport::default();
        let total = pending.len();

        for (i, article) in pending.iter().enumerate() {
            if self.cancel.load(Ordering::SeqCst) {
                warn!(remaining = total - i, "batch cancelled");
                report.cancelled = true;
                break;
            }

            self.progress.item(&article.title, i + 1, total);
            match self.enhance_article(&article.id).await {
                Ok(updated) => report.enhanced.push(updated.id),
                Err(e) => {
                    warn!(id = %article.id, error = %e, "enhancement failed, continuing");
                    report.failed.push((article.id.clone(), e.to_string()));
                }
            }

            if i + 1 < total {
                self.pacer.pause(PacingStep::BetweenArticles).await;
            }
        }

        info!(
            enhanced = report.enhanced.len(),
            failed = report.failed.len(),
            cancelled = report.cancelled,
            "batch complete"
        );
        self.progress.finish(&format!(
            "{} enhanced, {} failed",
            report.enhanced.len(),
            report.failed.len()
        ));
        Ok(report)
    }
}
