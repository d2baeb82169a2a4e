//! Main-content extraction.
//!
//! A [`ContentExtractor`] runs an ordered list of [`CandidateExtractor`]s over
//! a rendered document and keeps the candidate with the most text. Ties go to
//! the candidate listed first. When even the winner is too short to be real
//! content, long paragraphs are stitched together instead.
//!
//! An optional site container (e.g. `#content` on the source blog) is tried
//! before the contest; when it matches, it wins outright.

mod candidates;
mod metadata;

use std::sync::LazyLock;

use scraper::{Html, Selector};
use tracing::debug;

use blogforge_shared::Result;

pub use candidates::{Candidate, CandidateExtractor, SelectorCandidate, pick_longest};
pub use metadata::{extract_excerpt, extract_image, extract_title};

/// Generic containers, most specific structure first.
pub const DEFAULT_CASCADE: &[&str] = &[
    "article",
    r#"[role="main"]"#,
    ".article-content",
    ".post-content",
    ".entry-content",
    ".content",
    "main",
    ".article-body",
    ".post-body",
];

/// Elements removed before any text is measured.
static NOISE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        "script, style, nav, header, footer, aside, .advertisement, .ad, .sidebar, .comments",
    )
    .expect("valid noise selector")
});

static PARAGRAPH: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p").expect("valid paragraph selector"));

// ---------------------------------------------------------------------------
// ExtractedContent
// ---------------------------------------------------------------------------

/// Which rule produced the content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSource {
    /// The site-specific container.
    Site(String),
    /// A generic cascade selector.
    Cascade(String),
    /// Stitched long paragraphs.
    Paragraphs,
}

/// The main content of a page.
#[derive(Debug, Clone)]
pub struct ExtractedContent {
    pub title: String,
    /// Content markup, ready for markdown conversion.
    pub html: String,
    /// Plain text of the content, used for length checks.
    pub text: String,
    pub image_url: Option<String>,
    pub excerpt: Option<String>,
    pub source: ContentSource,
}

impl ExtractedContent {
    /// Character count of the trimmed text.
    pub fn text_len(&self) -> usize {
        self.text.trim().chars().count()
    }

    /// Nothing usable was found.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

// ---------------------------------------------------------------------------
// ContentExtractor
// ---------------------------------------------------------------------------

/// Selector cascade with a max-length reducer and a paragraph fallback.
pub struct ContentExtractor {
    site: Option<Box<dyn CandidateExtractor>>,
    cascade: Vec<Box<dyn CandidateExtractor>>,
    min_content_chars: usize,
    min_paragraph_chars: usize,
}

impl ContentExtractor {
    /// Extractor with the default cascade and the given thresholds.
    pub fn new(min_content_chars: usize, min_paragraph_chars: usize) -> Self {
        let cascade = DEFAULT_CASCADE
            .iter()
            .filter_map(|css| SelectorCandidate::new(css).ok())
            .map(|c| Box::new(c) as Box<dyn CandidateExtractor>)
            .collect();
        Self {
            site: None,
            cascade,
            min_content_chars,
            min_paragraph_chars,
        }
    }

    /// Try `css` before the generic cascade.
    pub fn with_site_container(mut self, css: &str) -> Result<Self> {
        self.site = Some(Box::new(SelectorCandidate::new(css)?));
        Ok(self)
    }

    /// Replace the generic cascade.
    pub fn with_cascade(mut self, cascade: Vec<Box<dyn CandidateExtractor>>) -> Self {
        self.cascade = cascade;
        self
    }

    /// Extract title, content and card metadata from rendered HTML.
    pub fn extract(&self, html: &str) -> ExtractedContent {
        let mut doc = Html::parse_document(html);

        let title = extract_title(&doc);
        let image_url = extract_image(&doc);
        let excerpt = extract_excerpt(&doc);

        strip_noise(&mut doc);

        let (html, text, source) = self.select_content(&doc);
        debug!(?source, chars = text.trim().chars().count(), "content selected");

        ExtractedContent {
            title,
            html,
            text,
            image_url,
            excerpt,
            source,
        }
    }

    fn select_content(&self, doc: &Html) -> (String, String, ContentSource) {
        if let Some(site) = &self.site {
            if let Some(candidate) = site.extract(doc).filter(|c| c.text_len() > 0) {
                return (
                    candidate.html,
                    candidate.text,
                    ContentSource::Site(candidate.source),
                );
            }
        }

        let candidates = self.cascade.iter().map(|c| c.extract(doc));
        if let Some(best) = pick_longest(candidates) {
            if best.text_len() >= self.min_content_chars {
                return (best.html, best.text, ContentSource::Cascade(best.source));
            }
            debug!(
                selector = %best.source,
                chars = best.text_len(),
                "best candidate too short, stitching paragraphs"
            );
        }

        let (html, text) = long_paragraphs(doc, self.min_paragraph_chars);
        (html, text, ContentSource::Paragraphs)
    }
}

impl Default for ContentExtractor {
    fn default() -> Self {
        Self::new(200, 50)
    }
}

/// Remove scripts, navigation, ads and comment sections from the tree.
pub fn strip_noise(doc: &mut Html) {
    let ids: Vec<_> = doc.select(&NOISE).map(|el| el.id()).collect();
    for id in ids {
        if let Some(mut node) = doc.tree.get_mut(id) {
            node.detach();
        }
    }
}

/// Paragraphs longer than `min_chars`, joined by blank lines.
fn long_paragraphs(doc: &Html, min_chars: usize) -> (String, String) {
    let paragraphs: Vec<_> = doc
        .select(&PARAGRAPH)
        .filter_map(|p| {
            let text = p.text().collect::<String>().trim().to_string();
            (text.chars().count() > min_chars).then(|| (p.html(), text))
        })
        .collect();

    let html = paragraphs
        .iter()
        .map(|(html, _)| html.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    let text = paragraphs
        .iter()
        .map(|(_, text)| text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    (html, text)
}
