//! Candidate extractors and the max-length reducer.

use scraper::{Html, Selector};

use blogforge_shared::{BlogforgeError, Result};

/// A possible main-content region.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Rule that produced this candidate (for tracing).
    pub source: String,
    pub html: String,
    pub text: String,
}

impl Candidate {
    /// Character count of the trimmed text.
    pub fn text_len(&self) -> usize {
        self.text.trim().chars().count()
    }
}

/// A pure `(document) -> candidate` rule.
///
/// Rules are evaluated in order by [`super::ContentExtractor`]; returning
/// `None` means the rule does not apply to this document.
pub trait CandidateExtractor: Send + Sync {
    fn extract(&self, doc: &Html) -> Option<Candidate>;

    /// Human-readable rule name for tracing.
    fn name(&self) -> &str;
}

/// All elements matching a CSS selector, concatenated in document order.
pub struct SelectorCandidate {
    css: String,
    selector: Selector,
}

impl SelectorCandidate {
    pub fn new(css: &str) -> Result<Self> {
        let selector = Selector::parse(css)
            .map_err(|e| BlogforgeError::parse(format!("invalid selector {css:?}: {e}")))?;
        Ok(Self {
            css: css.to_string(),
            selector,
        })
    }
}

impl CandidateExtractor for SelectorCandidate {
    fn extract(&self, doc: &Html) -> Option<Candidate> {
        let mut matched = false;
        let mut html = String::new();
        let mut text = String::new();

        for el in doc.select(&self.selector) {
            matched = true;
            html.push_str(&el.inner_html());
            text.extend(el.text());
        }

        matched.then(|| Candidate {
            source: self.css.clone(),
            html,
            text,
        })
    }

    fn name(&self) -> &str {
        &self.css
    }
}

/// Keep the candidate with the strictly greatest text length.
/// Among equal lengths the earliest candidate is kept.
pub fn pick_longest(candidates: impl IntoIterator<Item = Option<Candidate>>) -> Option<Candidate> {
    candidates
        .into_iter()
        .flatten()
        .fold(None, |best: Option<Candidate>, next| match best {
            Some(best) if next.text_len() <= best.text_len() => Some(best),
            _ => Some(next),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(source: &str, text: &str) -> Option<Candidate> {
        Some(Candidate {
            source: source.into(),
            html: String::new(),
            text: text.into(),
        })
    }

    #[test]
    fn reducer_prefers_strictly_longer() {
        let best = pick_longest([candidate("a", "abc"), None, candidate("b", "abcd")]);
        assert_eq!(best.map(|c| c.source), Some("b".into()));
    }

    #[test]
    fn reducer_breaks_ties_by_position() {
        let best = pick_longest([candidate("a", "abcd"), candidate("b", "wxyz")]);
        assert_eq!(best.map(|c| c.source), Some("a".into()));
    }

    #[test]
    fn reducer_measures_trimmed_text() {
        let best = pick_longest([candidate("a", "abc"), candidate("b", "   ab   ")]);
        assert_eq!(best.map(|c| c.source), Some("a".into()));
    }

    #[test]
    fn reducer_on_nothing() {
        assert!(pick_longest([None, None]).is_none());
    }

    #[test]
    fn selector_candidate_concatenates_matches() {
        let doc = Html::parse_document(
            r#"<div class="post-body">one</div><p>x</p><div class="post-body">two</div>"#,
        );
        let rule = SelectorCandidate::new(".post-body").expect("selector");
        let c = rule.extract(&doc).expect("match");
        assert_eq!(c.text, "onetwo");
        assert_eq!(rule.name(), ".post-body");

        let rule = SelectorCandidate::new("article").expect("selector");
        assert!(rule.extract(&doc).is_none());
    }
}
