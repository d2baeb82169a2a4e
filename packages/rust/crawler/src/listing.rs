//! Blog index discovery.
//!
//! Reads article cards off the source blog's index page in document order.
//! The discoverer never caps the list; callers decide how many to take.

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument};
use url::Url;

use blogforge_browser::{PageRenderer, WaitPolicy};
use blogforge_shared::{BlogforgeError, ListingEntry, Result};

/// CSS selectors describing one article card.
#[derive(Debug, Clone)]
pub struct ListingSelectors {
    pub card: Selector,
    pub link: Selector,
    pub date: Selector,
    pub author: Selector,
    pub image: Selector,
    pub excerpt: Selector,
}

impl ListingSelectors {
    /// Build from raw CSS, rejecting anything unparsable.
    pub fn parse(
        card: &str,
        link: &str,
        date: &str,
        author: &str,
        image: &str,
        excerpt: &str,
    ) -> Result<Self> {
        let p = |css: &str| {
            Selector::parse(css)
                .map_err(|e| BlogforgeError::parse(format!("invalid selector {css:?}: {e}")))
        };
        Ok(Self {
            card: p(card)?,
            link: p(link)?,
            date: p(date)?,
            author: p(author)?,
            image: p(image)?,
            excerpt: p(excerpt)?,
        })
    }
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self::parse(
            "article.entry-card",
            "h2.entry-title > a",
            ".meta-date time",
            ".meta-author .ct-meta-element-author",
            "img",
            ".entry-excerpt",
        )
        .expect("default listing selectors are valid")
    }
}

/// Finds article links on an index page.
pub struct ListingDiscoverer<'a> {
    renderer: &'a dyn PageRenderer,
    selectors: ListingSelectors,
}

impl<'a> ListingDiscoverer<'a> {
    pub fn new(renderer: &'a dyn PageRenderer) -> Self {
        Self {
            renderer,
            selectors: ListingSelectors::default(),
        }
    }

    pub fn with_selectors(mut self, selectors: ListingSelectors) -> Self {
        self.selectors = selectors;
        self
    }

    /// Render `index_url` and return every card that links somewhere.
    #[instrument(skip(self))]
    pub async fn discover(&self, index_url: &str) -> Result<Vec<ListingEntry>> {
        let base = Url::parse(index_url)
            .map_err(|e| BlogforgeError::validation(format!("invalid index url {index_url}: {e}")))?;

        let page = self.renderer.render(index_url, WaitPolicy::NetworkIdle).await?;
        let entries = parse_listing(&page.html, &base, &self.selectors);

        info!(found = entries.len(), "listing discovered");
        Ok(entries)
    }
}

/// Parse article cards from index HTML. Relative links resolve against `base`.
pub fn parse_listing(html: &str, base: &Url, selectors: &ListingSelectors) -> Vec<ListingEntry> {
    let doc = Html::parse_document(html);
    let mut entries = Vec::new();

    for card in doc.select(&selectors.card) {
        let link = card.select(&selectors.link).next();

        let Some(url) = link
            .and_then(|a| a.value().attr("href"))
            .map(str::trim)
            .filter(|href| !href.is_empty())
            .and_then(|href| base.join(href).ok())
        else {
            debug!("skipping card without a link");
            continue;
        };

        let title = link.map(element_text).unwrap_or_default();

        let date_string = card.select(&selectors.date).next().and_then(|time| {
            time.value()
                .attr("datetime")
                .map(str::to_string)
                .or_else(|| Some(element_text(time)))
                .filter(|d| !d.is_empty())
        });

        let image_url = card.select(&selectors.image).next().and_then(|img| {
            img.value()
                .attr("src")
                .or_else(|| img.value().attr("data-src"))
                .filter(|src| !src.is_empty())
                .map(|src| base.join(src).map(String::from).unwrap_or_else(|_| src.to_string()))
        });

        entries.push(ListingEntry {
            title,
            url: url.to_string(),
            date_string,
            author: first_text(card, &selectors.author),
            image_url,
            excerpt: first_text(card, &selectors.excerpt),
        });
    }

    entries
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn first_text(card: ElementRef<'_>, selector: &Selector) -> Option<String> {
    card.select(selector)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use blogforge_browser::StaticRenderer;

    const INDEX: &str = r#"<html><body>
        <article class="entry-card">
          <a href="/blogs/first/"><img src="/img/first.png"></a>
          <h2 class="entry-title"><a href="/blogs/first/"> First Post </a></h2>
          <span class="meta-date"><time datetime="2025-03-04T10:00:00+00:00">March 4, 2025</time></span>
          <span class="meta-author"><span class="ct-meta-element-author">Dana</span></span>
          <div class="entry-excerpt"><p>Opening lines.</p></div>
        </article>
        <article class="entry-card">
          <h2 class="entry-title"><a>No link here</a></h2>
        </article>
        <article class="entry-card">
          <h2 class="entry-title"><a href="https://other.example/second">Second</a></h2>
        </article>
    </body></html>"#;

    fn base() -> Url {
        Url::parse("https://blog.example/blogs/").expect("url")
    }

    #[test]
    fn parses_cards_in_document_order() {
        let entries = parse_listing(INDEX, &base(), &ListingSelectors::default());
        assert_eq!(entries.len(), 2);

        let first = &entries[0];
        assert_eq!(first.title, "First Post");
        assert_eq!(first.url, "https://blog.example/blogs/first/");
        assert_eq!(first.date_string.as_deref(), Some("2025-03-04T10:00:00+00:00"));
        assert_eq!(first.author.as_deref(), Some("Dana"));
        assert_eq!(
            first.image_url.as_deref(),
            Some("https://blog.example/img/first.png")
        );
        assert_eq!(first.excerpt.as_deref(), Some("Opening lines."));

        let second = &entries[1];
        assert_eq!(second.url, "https://other.example/second");
        assert!(second.author.is_none());
        assert!(second.image_url.is_none());
    }

    #[test]
    fn cards_without_url_are_dropped() {
        let entries = parse_listing(INDEX, &base(), &ListingSelectors::default());
        assert!(entries.iter().all(|e| e.title != "No link here"));
    }

    #[tokio::test]
    async fn discover_renders_with_network_idle() {
        let renderer = StaticRenderer::new().page("https://blog.example/blogs/", INDEX);
        let discoverer = ListingDiscoverer::new(&renderer);
        let entries = discoverer
            .discover("https://blog.example/blogs/")
            .await
            .expect("discover");
        assert_eq!(entries.len(), 2);
        assert_eq!(renderer.requests()[0].1, WaitPolicy::NetworkIdle);
    }

    #[tokio::test]
    async fn discover_with_custom_selectors() {
        let html = r#"<html><body>
            <li class="post"><a class="permalink" href="/notes/one/">One</a>
              <em class="when">2025-01-02</em><b class="by">Lee</b>
              <img src="/img/one.png"><p class="lede">Short lede.</p></li>
            <li class="post"><span>no link</span></li>
        </body></html>"#;
        let renderer = StaticRenderer::new().page("https://notes.example/", html);
        let selectors = ListingSelectors::parse(
            "li.post",
            "a.permalink",
            "em.when",
            "b.by",
            "img",
            "p.lede",
        )
        .expect("selectors");

        let entries = ListingDiscoverer::new(&renderer)
            .with_selectors(selectors)
            .discover("https://notes.example/")
            .await
            .expect("discover");

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "One");
        assert_eq!(entries[0].url, "https://notes.example/notes/one/");
        assert_eq!(entries[0].author.as_deref(), Some("Lee"));
        assert_eq!(entries[0].excerpt.as_deref(), Some("Short lede."));
    }

    #[tokio::test]
    async fn discover_surfaces_render_failure() {
        let renderer = StaticRenderer::new().fail("https://blog.example/blogs/", "timeout");
        let err = ListingDiscoverer::new(&renderer)
            .discover("https://blog.example/blogs/")
            .await
            .unwrap_err();
        assert!(matches!(err, BlogforgeError::Render { .. }));
    }
}
