//! Core domain types for blogforge articles.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default author recorded when the listing does not name one.
pub const DEFAULT_AUTHOR: &str = "Unknown";

/// Content stored when an article page could not be rendered.
pub const FAILED_CONTENT: &str = "Failed to load content";

/// Content stored when a page rendered but yielded no usable text.
pub const EMPTY_CONTENT: &str = "No content found";

// ---------------------------------------------------------------------------
// ArticleId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for article identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArticleId(pub Uuid);

impl ArticleId {
    /// Generate a new time-sortable article identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ArticleId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ArticleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ArticleId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Article
// ---------------------------------------------------------------------------

/// A competitor source consulted during enhancement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    pub title: String,
    pub url: String,
    pub scraped_at: DateTime<Utc>,
}

/// A stored blog article. `url` is unique across the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: ArticleId,
    pub title: String,
    pub url: String,
    /// Normalized markdown of the original article.
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<DateTime<Utc>>,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    pub is_updated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_content: Option<String>,
    /// Competitor sources in rank order; position is the citation number.
    #[serde(default)]
    pub references: Vec<Reference>,
    pub scraped_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Article {
    /// Build a fresh, not-yet-enhanced article from a creation request.
    pub fn from_new(new: NewArticle) -> Self {
        Self {
            id: ArticleId::new(),
            title: new.title,
            url: new.url,
            content: new.content,
            published_date: new.published_date,
            author: new.author.unwrap_or_else(|| DEFAULT_AUTHOR.to_string()),
            image_url: new.image_url,
            excerpt: new.excerpt,
            is_updated: false,
            updated_content: None,
            references: Vec::new(),
            scraped_at: Utc::now(),
            updated_at: None,
        }
    }

    /// Apply a partial update in place.
    pub fn apply(&mut self, patch: ArticlePatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(content) = patch.content {
            self.content = content;
        }
        if let Some(updated_content) = patch.updated_content {
            self.updated_content = Some(updated_content);
        }
        if let Some(references) = patch.references {
            self.references = references;
        }
        if let Some(is_updated) = patch.is_updated {
            self.is_updated = is_updated;
        }
        if let Some(updated_at) = patch.updated_at {
            self.updated_at = Some(updated_at);
        }
    }

    /// Whether the enhancement fields agree with the `is_updated` flag.
    pub fn enhancement_is_consistent(&self) -> bool {
        let has_enhancement = self
            .updated_content
            .as_deref()
            .is_some_and(|c| !c.trim().is_empty())
            && !self.references.is_empty();
        !self.is_updated || has_enhancement
    }
}

/// Input for creating an article.
#[derive(Debug, Clone, Default)]
pub struct NewArticle {
    pub title: String,
    pub url: String,
    pub content: String,
    pub published_date: Option<DateTime<Utc>>,
    /// `None` stores [`DEFAULT_AUTHOR`].
    pub author: Option<String>,
    pub image_url: Option<String>,
    pub excerpt: Option<String>,
}

/// Partial update for an article; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ArticlePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub updated_content: Option<String>,
    pub references: Option<Vec<Reference>>,
    pub is_updated: Option<bool>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Filter for article queries.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArticleFilter {
    pub is_updated: Option<bool>,
}

/// Sort order for article queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ArticleSort {
    /// Newest publication first; undated articles last.
    #[default]
    PublishedDesc,
    /// Order of acquisition.
    ScrapedAsc,
}

// ---------------------------------------------------------------------------
// Pipeline records
// ---------------------------------------------------------------------------

/// A ranked search hit. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
}

impl SearchResult {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
        }
    }
}

/// One card on the source site's index page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingEntry {
    pub title: String,
    pub url: String,
    pub date_string: Option<String>,
    pub author: Option<String>,
    pub image_url: Option<String>,
    pub excerpt: Option<String>,
}

/// Result of acquiring a single article page.
///
/// A failed render keeps `title` and `url`, stores [`FAILED_CONTENT`] and
/// sets `error` instead of aborting the batch.
#[derive(Debug, Clone)]
pub struct ScrapeOutcome {
    pub title: String,
    pub url: String,
    pub content: String,
    pub published_date: Option<DateTime<Utc>>,
    pub author: String,
    pub image_url: Option<String>,
    pub excerpt: Option<String>,
    pub error: Option<String>,
}

impl ScrapeOutcome {
    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

impl From<&ScrapeOutcome> for NewArticle {
    fn from(outcome: &ScrapeOutcome) -> Self {
        Self {
            title: outcome.title.clone(),
            url: outcome.url.clone(),
            content: outcome.content.clone(),
            published_date: outcome.published_date,
            author: Some(outcome.author.clone()),
            image_url: outcome.image_url.clone(),
            excerpt: outcome.excerpt.clone(),
        }
    }
}

/// Parse a listing date such as `2025-03-04T10:00:00Z`, `2025-03-04`
/// or `March 4, 2025`. Unrecognized strings yield `None`.
pub fn parse_published_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%d", "%B %d, %Y", "%b %d, %Y", "%d %B %Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}
