//! Title, lead image and excerpt lookups.

use std::sync::LazyLock;

use scraper::{Html, Selector};

/// Title returned when every lookup comes up empty.
pub const UNTITLED: &str = "Untitled";

fn sel(css: &str) -> Selector {
    Selector::parse(css).expect("valid metadata selector")
}

static H1: LazyLock<Selector> = LazyLock::new(|| sel("h1"));
static TITLE: LazyLock<Selector> = LazyLock::new(|| sel("title"));
static OG_TITLE: LazyLock<Selector> = LazyLock::new(|| sel(r#"meta[property="og:title"]"#));
static IMAGES: LazyLock<[Selector; 2]> =
    LazyLock::new(|| [sel(".entry-image img"), sel("article img")]);
static EXCERPTS: LazyLock<[Selector; 2]> =
    LazyLock::new(|| [sel(".entry-excerpt"), sel("article > p")]);

fn first_text(doc: &Html, selector: &Selector) -> Option<String> {
    doc.select(selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
}

/// First heading, then `<title>`, then `og:title`, then [`UNTITLED`].
pub fn extract_title(doc: &Html) -> String {
    first_text(doc, &H1)
        .or_else(|| first_text(doc, &TITLE))
        .or_else(|| {
            doc.select(&OG_TITLE)
                .next()
                .and_then(|el| el.value().attr("content"))
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
        })
        .unwrap_or_else(|| UNTITLED.to_string())
}

/// `src` of the featured image, if any.
pub fn extract_image(doc: &Html) -> Option<String> {
    IMAGES.iter().find_map(|selector| {
        doc.select(selector)
            .next()
            .and_then(|img| img.value().attr("src"))
            .map(str::trim)
            .filter(|src| !src.is_empty())
            .map(str::to_string)
    })
}

/// Article summary, if the page carries one.
pub fn extract_excerpt(doc: &Html) -> Option<String> {
    EXCERPTS.iter().find_map(|selector| first_text(doc, selector))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_cascade_order() {
        let doc = Html::parse_document(
            r#"<html><head><title>Doc Title</title><meta property="og:title" content="OG"></head>
               <body><h1>  Heading  </h1></body></html>"#,
        );
        assert_eq!(extract_title(&doc), "Heading");

        let doc = Html::parse_document(
            r#"<html><head><title>Doc Title</title></head><body><h1> </h1></body></html>"#,
        );
        assert_eq!(extract_title(&doc), "Doc Title");

        let doc = Html::parse_document(
            r#"<html><head><meta property="og:title" content="OG"></head><body></body></html>"#,
        );
        assert_eq!(extract_title(&doc), "OG");
    }

    #[test]
    fn image_and_excerpt() {
        let doc = Html::parse_document(
            r#"<article><img src="/b.png"><p>First paragraph.</p></article>
               <div class="entry-image"><img src="/a.png"></div>"#,
        );
        assert_eq!(extract_image(&doc).as_deref(), Some("/a.png"));
        assert_eq!(extract_excerpt(&doc).as_deref(), Some("First paragraph."));

        let doc = Html::parse_document("<div>nothing</div>");
        assert!(extract_image(&doc).is_none());
        assert!(extract_excerpt(&doc).is_none());
    }
}
