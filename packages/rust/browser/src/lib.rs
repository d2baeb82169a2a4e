//! Page rendering for blogforge.
//!
//! [`PageRenderer`] is the only way the pipeline reaches the live web.
//! [`BrowserSession`] drives a headless Chromium over CDP; [`StaticRenderer`]
//! serves pre-rendered HTML from memory for offline runs and tests.

pub mod session;
pub mod static_pages;

use async_trait::async_trait;

use blogforge_shared::Result;

pub use session::BrowserSession;
pub use static_pages::StaticRenderer;

/// When a navigation counts as finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPolicy {
    /// Wait for the full load plus a settle period for late network traffic.
    NetworkIdle,
    /// Return as soon as the DOM is parsed.
    DomReady,
}

impl std::fmt::Display for WaitPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NetworkIdle => write!(f, "network-idle"),
            Self::DomReady => write!(f, "dom-ready"),
        }
    }
}

/// Rendered DOM of a page.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// URL that was requested.
    pub url: String,
    /// URL after redirects, when the browser reports one.
    pub final_url: String,
    /// Serialized document HTML.
    pub html: String,
}

/// Loads a URL and returns its rendered HTML.
///
/// Failures surface as [`blogforge_shared::BlogforgeError::Render`]; callers
/// decide whether that aborts the item or the batch.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, url: &str, wait: WaitPolicy) -> Result<RenderedPage>;
}
