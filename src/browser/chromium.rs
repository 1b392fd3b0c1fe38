// Headless Chromium sessions via chromiumoxide. Every `open()` launches its own
// browser process and closing the session tears that process down.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;

use super::{BrowserDriver, BrowserError, BrowserSession, LaunchOptions};

const MASK_WEBDRIVER: &str =
    "Object.defineProperty(navigator, 'webdriver', {get: () => undefined})";

pub struct ChromiumDriver {
    options: LaunchOptions,
}

impl ChromiumDriver {
    pub fn new(options: LaunchOptions) -> Self {
        Self { options }
    }

    fn config(&self) -> Result<BrowserConfig, BrowserError> {
        let (width, height) = self.options.window_size;
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(width, height)
            .args([
                "--disable-gpu",
                "--disable-dev-shm-usage",
                "--disable-blink-features=AutomationControlled",
                "--exclude-switches=enable-automation",
                "--no-first-run",
            ])
            .arg(format!("--user-agent={}", self.options.user_agent));
        if let Some(path) = &self.options.executable {
            builder = builder.chrome_executable(path);
        }
        builder
            .build()
            .map_err(|e| BrowserError::Launch(format!("browser config: {e}")))
    }
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    async fn open(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        let (browser, mut handler) = Browser::launch(self.config()?)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        // The handler drives the CDP connection and must be polled for the session's lifetime.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    let msg = e.to_string();
                    if msg.contains("connection closed") || msg.contains("websocket closed") {
                        break;
                    }
                    tracing::debug!("CDP handler error (continuing): {msg}");
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler_task.abort();
                return Err(BrowserError::Launch(format!("failed to open tab: {e}")));
            }
        };

        // Registered once so every document the tab loads starts masked.
        if let Err(e) = page
            .evaluate_on_new_document(AddScriptToEvaluateOnNewDocumentParams::new(MASK_WEBDRIVER))
            .await
        {
            tracing::debug!("Could not mask webdriver flag: {e}");
        }

        tracing::debug!("Launched headless Chromium session");
        Ok(Box::new(ChromiumSession {
            browser,
            page,
            handler_task,
        }))
    }
}

pub struct ChromiumSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
}

impl ChromiumSession {
    async fn eval<T: DeserializeOwned>(&self, script: String) -> Result<T, BrowserError> {
        self.page
            .evaluate(script)
            .await
            .map_err(|e| BrowserError::Protocol(format!("script failed: {e}")))?
            .into_value::<T>()
            .map_err(|e| BrowserError::Protocol(format!("unexpected script result: {e}")))
    }
}

/// JSON-encode a value for embedding in a script.
fn js(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), BrowserError> {
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(BrowserError::Navigation(format!("{url}: {e}"))),
            Err(_) => {
                return Err(BrowserError::Timeout(format!(
                    "{url} did not load within {}s",
                    timeout.as_secs()
                )));
            }
        }
        let _ = tokio::time::timeout(timeout, self.page.wait_for_navigation()).await;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, BrowserError> {
        self.page
            .url()
            .await
            .map(|u| u.unwrap_or_default())
            .map_err(|e| BrowserError::Protocol(e.to_string()))
    }

    async fn title(&self) -> Result<String, BrowserError> {
        self.page
            .get_title()
            .await
            .map(|t| t.unwrap_or_default())
            .map_err(|e| BrowserError::Protocol(e.to_string()))
    }

    async fn body_text(&self) -> Result<String, BrowserError> {
        self.eval("document.body ? document.body.innerText : ''".to_string())
            .await
    }

    async fn count(&self, selector: &str) -> Result<usize, BrowserError> {
        self.eval(format!(
            "document.querySelectorAll({}).length",
            js(selector)
        ))
        .await
    }

    async fn text(&self, selector: &str) -> Result<Option<String>, BrowserError> {
        self.eval(format!(
            "(() => {{ const el = document.querySelector({}); return el ? el.innerText.trim() : null; }})()",
            js(selector)
        ))
        .await
    }

    async fn inner_html(&self, selector: &str) -> Result<Option<String>, BrowserError> {
        self.eval(format!(
            "(() => {{ const el = document.querySelector({}); return el ? el.innerHTML : null; }})()",
            js(selector)
        ))
        .await
    }

    async fn attributes(&self, selector: &str, attr: &str) -> Result<Vec<String>, BrowserError> {
        // `href` is read as a property so relative links come back absolute.
        self.eval(format!(
            "Array.from(document.querySelectorAll({sel})).map(el => {attr} === 'href' && el.href ? el.href : el.getAttribute({attr})).filter(v => v)",
            sel = js(selector),
            attr = js(attr)
        ))
        .await
    }

    async fn is_checked(&self, selector: &str) -> Result<Option<bool>, BrowserError> {
        self.eval(format!(
            "(() => {{ const el = document.querySelector({}); return el ? !!el.checked : null; }})()",
            js(selector)
        ))
        .await
    }

    async fn fill(&mut self, selector: &str, value: &str) -> Result<bool, BrowserError> {
        let Ok(element) = self.page.find_element(selector).await else {
            return Ok(false);
        };
        element
            .click()
            .await
            .map_err(|e| BrowserError::Protocol(format!("focus {selector}: {e}")))?;
        // Clear any prefilled value (sites restore the last location) before typing.
        let _: bool = self
            .eval(format!(
                "(() => {{ const el = document.querySelector({}); if (!el) return false; el.value = ''; return true; }})()",
                js(selector)
            ))
            .await?;
        element
            .type_str(value)
            .await
            .map_err(|e| BrowserError::Protocol(format!("type into {selector}: {e}")))?;
        Ok(true)
    }

    async fn click(&mut self, selector: &str) -> Result<bool, BrowserError> {
        self.eval(format!(
            "(() => {{ const el = document.querySelector({}); if (!el) return false; el.scrollIntoView({{block: 'center'}}); el.click(); return true; }})()",
            js(selector)
        ))
        .await
    }

    async fn click_containing(
        &mut self,
        selector: &str,
        needle: &str,
    ) -> Result<bool, BrowserError> {
        self.eval(format!(
            "(() => {{ const needle = {}.toLowerCase(); const el = Array.from(document.querySelectorAll({})).find(e => (e.innerText || '').toLowerCase().includes(needle)); if (!el) return false; el.scrollIntoView({{block: 'center'}}); el.click(); return true; }})()",
            js(needle),
            js(selector)
        ))
        .await
    }

    async fn close(self: Box<Self>) -> Result<(), BrowserError> {
        let ChromiumSession {
            mut browser,
            page,
            handler_task,
        } = *self;
        let _ = page.close().await;
        let result = browser
            .close()
            .await
            .map(|_| ())
            .map_err(|e| BrowserError::Protocol(format!("close failed: {e}")));
        let _ = browser.wait().await;
        handler_task.abort();
        result
    }
}
