//! Content extraction and listing discovery.
//!
//! This crate provides:
//! - [`ContentExtractor`]: selector cascade with a max-length tie-break
//! - [`ListingDiscoverer`]: article cards from a blog index page

pub mod extract;
pub mod listing;

pub use extract::{
    Candidate, CandidateExtractor, ContentExtractor, ContentSource, DEFAULT_CASCADE,
    ExtractedContent, SelectorCandidate, pick_longest, strip_noise,
};
pub use listing::{ListingDiscoverer, ListingSelectors, parse_listing};

#[cfg(test)]
mod tests {
    use super::*;

    fn load_fixture(name: &str) -> String {
        let path = format!("{}/../../../fixtures/html/{name}", env!("CARGO_MANIFEST_DIR"));
        std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing fixture: {path}"))
    }

    #[test]
    fn blog_article_uses_site_container() {
        let html = load_fixture("blog_article.html");
        let extractor = ContentExtractor::default()
            .with_site_container("#content")
            .expect("selector");
        let content = extractor.extract(&html);

        assert_eq!(content.title, "Chatbots for Clinics: A Practical Guide");
        assert_eq!(content.source, ContentSource::Site("#content".into()));
        assert!(content.html.contains("Why clinics adopt chatbots"));
        assert!(!content.html.contains("Subscribe to our newsletter"));
        assert_eq!(
            content.image_url.as_deref(),
            Some("https://blog.example/img/clinic.png")
        );
    }

    #[test]
    fn competitor_page_picks_largest_container() {
        let html = load_fixture("competitor.html");
        let content = ContentExtractor::default().extract(&html);

        assert_eq!(content.title, "How AI Chatbots Help Patients");
        assert_eq!(content.source, ContentSource::Cascade(".post-content".into()));
        assert!(content.text_len() > 200);
        assert!(!content.text.contains("Related posts"));
        assert!(!content.text.contains("trackPageView"));
    }

    #[test]
    fn index_fixture_parses() {
        let html = load_fixture("blog_index.html");
        let base = url::Url::parse("https://blog.example/blogs/").expect("url");
        let entries = parse_listing(&html, &base, &ListingSelectors::default());
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].title, "Chatbots for Clinics: A Practical Guide");
    }
}
