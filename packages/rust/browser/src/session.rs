//! Headless Chromium session driven over CDP.
//!
//! One browser process serves every `render` call for the lifetime of the
//! session. Each render gets a fresh tab which is closed afterwards, even on
//! failure. [`BrowserSession::close`] shuts the process down and is safe to
//! call more than once.

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use blogforge_shared::{BlogforgeError, RenderConfig, Result};

use crate::{PageRenderer, RenderedPage, WaitPolicy};

/// Resolves once the DOM has been parsed.
const DOM_READY_SCRIPT: &str = r#"
    new Promise((resolve) => {
        if (document.readyState === 'complete' || document.readyState === 'interactive') {
            resolve(document.readyState);
        } else {
            document.addEventListener('DOMContentLoaded', () => resolve(document.readyState));
        }
    })
"#;

struct Running {
    browser: Browser,
    handler: JoinHandle<()>,
}

/// A reusable headless browser.
pub struct BrowserSession {
    running: Mutex<Option<Running>>,
    config: RenderConfig,
}

impl BrowserSession {
    /// Launch the browser process.
    #[instrument(skip_all, fields(headless = config.headless))]
    pub async fn open(config: RenderConfig) -> Result<Self> {
        let (width, height) = config.viewport;

        let mut builder = BrowserConfig::builder()
            .viewport(Some(Viewport {
                width,
                height,
                ..Default::default()
            }))
            .window_size(width, height)
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg("--no-first-run")
            .arg("--no-sandbox")
            .arg("--lang=en-US");

        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(ref path) = config.chrome_path {
            builder = builder.chrome_executable(path);
        }

        let browser_config = builder
            .build()
            .map_err(|e| BlogforgeError::config(format!("invalid browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| BlogforgeError::render("about:blank", format!("browser launch failed: {e}")))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        info!(width, height, "browser session opened");

        Ok(Self {
            running: Mutex::new(Some(Running { browser, handler })),
            config,
        })
    }

    /// Whether the browser process is still owned by this session.
    pub async fn is_open(&self) -> bool {
        self.running.lock().await.is_some()
    }

    /// Shut the browser down. Later calls are no-ops.
    pub async fn close(&self) {
        let Some(Running {
            mut browser,
            handler,
        }) = self.running.lock().await.take()
        else {
            debug!("browser session already closed");
            return;
        };

        if let Err(e) = browser.close().await {
            warn!(error = %e, "browser did not close cleanly");
        }
        if let Err(e) = browser.wait().await {
            debug!(error = %e, "failed waiting for browser exit");
        }
        handler.abort();

        info!("browser session closed");
    }

    async fn render_in(&self, page: &Page, url: &str, wait: WaitPolicy) -> Result<RenderedPage> {
        page.execute(SetUserAgentOverrideParams::new(
            self.config.user_agent.clone(),
        ))
        .await
        .map_err(|e| BlogforgeError::render(url, e))?;

        let navigation = async {
            match wait {
                WaitPolicy::DomReady => {
                    let params = NavigateParams::builder()
                        .url(url)
                        .build()
                        .map_err(|e| BlogforgeError::render(url, e))?;
                    let response = page
                        .execute(params)
                        .await
                        .map_err(|e| BlogforgeError::render(url, e))?;
                    if let Some(error_text) = response.result.error_text.clone() {
                        return Err(BlogforgeError::render(url, error_text));
                    }
                    // The readiness check must run against the new document,
                    // not the about:blank the tab was opened on.
                    page.wait_for_navigation()
                        .await
                        .map_err(|e| BlogforgeError::render(url, e))?;
                    page.evaluate(DOM_READY_SCRIPT.to_string())
                        .await
                        .map_err(|e| BlogforgeError::render(url, e))?;
                }
                WaitPolicy::NetworkIdle => {
                    page.goto(url)
                        .await
                        .map_err(|e| BlogforgeError::render(url, e))?;
                    tokio::time::sleep(self.config.settle).await;
                }
            }
            Ok::<(), BlogforgeError>(())
        };

        tokio::time::timeout(self.config.timeout, navigation)
            .await
            .map_err(|_| {
                BlogforgeError::render(
                    url,
                    format!("navigation timed out after {}ms", self.config.timeout.as_millis()),
                )
            })??;

        let final_url = page
            .url()
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| url.to_string());
        let html = page
            .content()
            .await
            .map_err(|e| BlogforgeError::render(url, e))?;

        Ok(RenderedPage {
            url: url.to_string(),
            final_url,
            html,
        })
    }
}

#[async_trait]
impl PageRenderer for BrowserSession {
    #[instrument(skip(self, wait), fields(%wait))]
    async fn render(&self, url: &str, wait: WaitPolicy) -> Result<RenderedPage> {
        let running = self.running.lock().await;
        let running = running
            .as_ref()
            .ok_or_else(|| BlogforgeError::render(url, "browser session is closed"))?;

        let page = running
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| BlogforgeError::render(url, e))?;

        let started = std::time::Instant::now();
        let result = self.render_in(&page, url, wait).await;
        if let Err(e) = page.close().await {
            debug!(error = %e, "failed to close tab");
        }

        match &result {
            Ok(rendered) => debug!(
                bytes = rendered.html.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "page rendered"
            ),
            Err(e) => warn!(error = %e, "render failed"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires a local Chrome/Chromium"]
    async fn renders_and_closes_idempotently() {
        let session = BrowserSession::open(RenderConfig::default())
            .await
            .expect("launch");
        let page = session
            .render("data:text/html,<h1>hi</h1>", WaitPolicy::DomReady)
            .await
            .expect("render");
        assert!(page.html.contains("<h1>hi</h1>"));

        let second = session
            .render("data:text/html,<h2>second</h2>", WaitPolicy::DomReady)
            .await
            .expect("render second");
        assert!(second.html.contains("<h2>second</h2>"));
        assert!(!second.html.contains("<h1>hi</h1>"));

        session.close().await;
        session.close().await;
        assert!(!session.is_open().await);

        let err = session
            .render("data:text/html,<p>x</p>", WaitPolicy::DomReady)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("closed"));
    }
}
