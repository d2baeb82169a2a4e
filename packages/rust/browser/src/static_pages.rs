//! In-memory renderer serving fixed HTML by URL.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use blogforge_shared::{BlogforgeError, Result};

use crate::{PageRenderer, RenderedPage, WaitPolicy};

/// Serves pre-rendered pages from memory. Unknown URLs and URLs registered
/// with [`StaticRenderer::fail`] produce a render error.
#[derive(Default)]
pub struct StaticRenderer {
    pages: HashMap<String, std::result::Result<String, String>>,
    requests: Mutex<Vec<(String, WaitPolicy)>>,
}

impl StaticRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `html` for `url`.
    pub fn page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), Ok(html.into()));
        self
    }

    /// Fail every render of `url` with `cause`.
    pub fn fail(mut self, url: impl Into<String>, cause: impl Into<String>) -> Self {
        self.pages.insert(url.into(), Err(cause.into()));
        self
    }

    /// Every render request seen so far, in order.
    pub fn requests(&self) -> Vec<(String, WaitPolicy)> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PageRenderer for StaticRenderer {
    async fn render(&self, url: &str, wait: WaitPolicy) -> Result<RenderedPage> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push((url.to_string(), wait));
        }

        match self.pages.get(url) {
            Some(Ok(html)) => Ok(RenderedPage {
                url: url.to_string(),
                final_url: url.to_string(),
                html: html.clone(),
            }),
            Some(Err(cause)) => Err(BlogforgeError::render(url, cause)),
            None => Err(BlogforgeError::render(url, "net::ERR_NAME_NOT_RESOLVED")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn serves_registered_pages_and_records_requests() {
        let renderer = StaticRenderer::new()
            .page("https://a.example/", "<p>a</p>")
            .fail("https://b.example/", "timeout");

        let page = renderer
            .render("https://a.example/", WaitPolicy::DomReady)
            .await
            .expect("render a");
        assert_eq!(page.html, "<p>a</p>");

        let err = renderer
            .render("https://b.example/", WaitPolicy::NetworkIdle)
            .await
            .unwrap_err();
        assert!(matches!(err, BlogforgeError::Render { .. }));

        assert!(
            renderer
                .render("https://c.example/", WaitPolicy::DomReady)
                .await
                .is_err()
        );
        assert_eq!(renderer.requests().len(), 3);
        assert_eq!(renderer.requests()[1].1, WaitPolicy::NetworkIdle);
    }
}
