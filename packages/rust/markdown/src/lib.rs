//! HTML-to-Markdown normalization and plain-text cleanup.
//!
//! [`normalize`] converts extracted article markup to Markdown with a fixed
//! convention (ATX headings, fenced code, `-` bullets) using the `htmd`
//! crate, then runs the cleanup passes. [`normalize_text`] is the cheaper
//! path for competitor pages, where only the words matter.

mod cleanup;

use std::sync::LazyLock;

use htmd::options::{BulletListMarker, CodeBlockStyle, HeadingStyle, Options};
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, instrument};
use url::Url;

use blogforge_shared::{BlogforgeError, Result};

pub use cleanup::normalize_text;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Result of normalizing an HTML fragment.
#[derive(Debug, Clone)]
pub struct NormalizedMarkdown {
    /// Cleaned Markdown, ending in a single newline (empty input yields "").
    pub markdown: String,
    /// Approximate word count, excluding code blocks.
    pub word_count: usize,
}

impl NormalizedMarkdown {
    pub fn is_empty(&self) -> bool {
        self.markdown.trim().is_empty()
    }
}

// ---------------------------------------------------------------------------
// Converter
// ---------------------------------------------------------------------------

/// Convert extracted content HTML to Markdown.
///
/// Relative links resolve against `base_url` when given.
#[instrument(skip(html), fields(html_len = html.len()))]
pub fn normalize(html: &str, base_url: Option<&str>) -> Result<NormalizedMarkdown> {
    let html = preprocess_tables(html);

    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(vec!["script", "style", "nav", "iframe", "noscript", "svg"])
        .options(Options {
            heading_style: HeadingStyle::Atx,
            code_block_style: CodeBlockStyle::Fenced,
            bullet_list_marker: BulletListMarker::Dash,
            ..Default::default()
        })
        .build();

    let raw_markdown = converter
        .convert(&html)
        .map_err(|e| BlogforgeError::Conversion(format!("htmd conversion failed: {e}")))?;

    debug!(raw_len = raw_markdown.len(), "htmd conversion complete");

    let base = base_url.and_then(|u| Url::parse(u).ok());
    let cleaned = cleanup::run_pipeline(&raw_markdown, base.as_ref());
    let markdown = if cleaned.trim().is_empty() {
        String::new()
    } else {
        cleaned
    };

    let word_count = count_words(&markdown);
    debug!(word_count, final_len = markdown.len(), "normalization complete");

    Ok(NormalizedMarkdown {
        markdown,
        word_count,
    })
}

// ---------------------------------------------------------------------------
// Table pre-processing
// ---------------------------------------------------------------------------

static TABLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table").expect("valid selector"));
static TR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").expect("valid selector"));
static TH: LazyLock<Selector> = LazyLock::new(|| Selector::parse("th").expect("valid selector"));
static TD: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").expect("valid selector"));

/// Rewrite `<table>` elements as Markdown tables before htmd runs.
///
/// `htmd` 0.1 has no table support.
fn preprocess_tables(html: &str) -> String {
    let doc = Html::parse_fragment(html);
    doc.select(&TABLE).fold(html.to_string(), |acc, table| {
        acc.replacen(&table.html(), &pipe_table(&table), 1)
    })
}

/// Cell texts of one `<tr>`, preferring `<th>` cells.
fn table_row(tr: scraper::ElementRef) -> Option<Vec<String>> {
    let text = |cell: scraper::ElementRef| {
        cell.text()
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .replace('|', "\\|")
    };
    let headers: Vec<String> = tr.select(&TH).map(text).collect();
    if !headers.is_empty() {
        return Some(headers);
    }
    let cells: Vec<String> = tr.select(&TD).map(text).collect();
    (!cells.is_empty()).then_some(cells)
}

fn pipe_table(table: &scraper::ElementRef) -> String {
    let rows: Vec<Vec<String>> = table.select(&TR).filter_map(table_row).collect();
    let Some(width) = rows.iter().map(Vec::len).max() else {
        return String::new();
    };

    let line = |cells: &[String]| {
        let padded = (0..width).map(|i| cells.get(i).map_or("", String::as_str));
        format!("| {} |", padded.collect::<Vec<_>>().join(" | "))
    };

    // A header-less table promotes its first row.
    let separator = vec!["---".to_string(); width];
    let mut lines = vec![line(rows[0].as_slice()), line(separator.as_slice())];
    lines.extend(rows[1..].iter().map(|cells| line(cells.as_slice())));

    format!("\n\n{}\n\n", lines.join("\n"))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Count words in Markdown (excluding fenced code).
fn count_words(md: &str) -> usize {
    static CODE_BLOCK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?s)```.*?```").expect("valid regex"));

    CODE_BLOCK_RE
        .replace_all(md, "")
        .split_whitespace()
        .filter(|w| !w.starts_with('#') || w.len() > 2)
        .count()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn load_fixture(name: &str) -> String {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../../fixtures")
            .join(name);
        std::fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {name}: {e}"))
    }

    #[test]
    fn headings_are_atx() {
        let md = normalize("<h2>Section</h2><p>Body text.</p>", None).unwrap();
        assert!(md.markdown.contains("## Section"));
        assert!(!md.markdown.contains("-----"));
    }

    #[test]
    fn bullets_use_hyphens() {
        let md = normalize("<ul><li>One</li><li>Two</li></ul>", None).unwrap();
        assert!(md.markdown.contains("- One"), "got: {}", md.markdown);
        assert!(md.markdown.contains("- Two"));
        assert!(!md.markdown.contains("* One"));
    }

    #[test]
    fn code_blocks_are_fenced() {
        let html = r#"<pre><code class="language-rust">fn main() {
    println!("hello");
}</code></pre>"#;
        let md = normalize(html, None).unwrap();
        assert!(md.markdown.contains("```"));
        assert!(md.markdown.contains("println!"));
        assert!(!md.markdown.contains("```language-"));
    }

    #[test]
    fn emphasis_survives() {
        let md = normalize("<p>A <strong>bold</strong> and <em>quiet</em> claim.</p>", None).unwrap();
        assert!(md.markdown.contains("**bold**"));
        assert!(md.markdown.contains("quiet"));
        assert!(!md.markdown.contains("<em>"));
    }

    #[test]
    fn tables_are_converted() {
        let html = r#"<table>
            <thead><tr><th>Plan</th><th>Price</th></tr></thead>
            <tbody><tr><td>Basic</td><td>$10</td></tr></tbody>
        </table>"#;
        let md = normalize(html, None).unwrap();
        assert!(md.markdown.contains("| Plan | Price |"));
        assert!(md.markdown.contains("| Basic | $10 |"));
    }

    #[test]
    fn relative_links_resolve_against_base() {
        let md = normalize(
            r#"<p>See <a href="/blogs/other/">the other post</a>.</p>"#,
            Some("https://blog.example/blogs/first/"),
        )
        .unwrap();
        assert!(md.markdown.contains("(https://blog.example/blogs/other/)"));
    }

    #[test]
    fn empty_input_is_empty() {
        let md = normalize("<div>   </div>", None).unwrap();
        assert!(md.is_empty());
        assert_eq!(md.word_count, 0);
    }

    #[test]
    fn article_fixture_normalizes() {
        let html = load_fixture("html/blog_article.html");
        let doc = Html::parse_document(&html);
        let sel = Selector::parse("#content").unwrap();
        let content = doc.select(&sel).next().unwrap().inner_html();

        let md = normalize(&content, Some("https://blog.example/blogs/chatbots-for-clinics/")).unwrap();
        assert!(md.markdown.contains("## Why clinics adopt chatbots"));
        assert!(md.markdown.contains("- Book and reschedule appointments"));
        assert!(md.markdown.contains("**surprising**"));
        assert!(md.markdown.contains("https://blog.example/blogs/why-live-chat/"));
        assert!(!md.markdown.contains("\n\n\n"));
        assert!(md.markdown.ends_with('\n'));
        assert!(md.word_count > 20);
    }

    #[test]
    fn word_count_excludes_code_blocks() {
        let html = r#"<p>One two three.</p>
            <pre><code>lots of code words that should not be counted</code></pre>"#;
        let md = normalize(html, None).unwrap();
        assert!(md.word_count < 6, "word_count={}", md.word_count);
    }
}
