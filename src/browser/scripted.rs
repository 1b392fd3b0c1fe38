// In-memory browser for tests: fixed HTML pages, CSS selectors evaluated with
// `scraper`, and clicks scripted as navigations.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};

use super::{BrowserDriver, BrowserError, BrowserSession};
use crate::sanitize::collapse_whitespace;

#[derive(Default)]
pub struct ScriptedSite {
    pages: HashMap<String, String>,
    /// (page url, selector) -> url navigated to when the selector is clicked.
    clicks: HashMap<(String, String), String>,
    failures: HashMap<String, BrowserError>,
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub fills: Mutex<Vec<(String, String)>>,
    pub visits: Mutex<Vec<String>>,
}

impl ScriptedSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, html: impl Into<String>) -> Self {
        self.pages.insert(url.to_string(), html.into());
        self
    }

    pub fn on_click(mut self, page: &str, selector: &str, target: &str) -> Self {
        self.clicks
            .insert((page.to_string(), selector.to_string()), target.to_string());
        self
    }

    pub fn failing(mut self, url: &str, error: BrowserError) -> Self {
        self.failures.insert(url.to_string(), error);
        self
    }

    pub fn visited(&self) -> Vec<String> {
        self.visits.lock().unwrap().clone()
    }
}

pub struct ScriptedDriver {
    pub site: Arc<ScriptedSite>,
}

impl ScriptedDriver {
    pub fn new(site: ScriptedSite) -> Self {
        Self {
            site: Arc::new(site),
        }
    }
}

#[async_trait]
impl BrowserDriver for ScriptedDriver {
    async fn open(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        self.site.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedSession {
            site: Arc::clone(&self.site),
            current: Mutex::new(Loaded {
                url: "about:blank".to_string(),
                html: String::new(),
            }),
        }))
    }
}

struct Loaded {
    url: String,
    html: String,
}

pub struct ScriptedSession {
    site: Arc<ScriptedSite>,
    current: Mutex<Loaded>,
}

impl ScriptedSession {
    fn load(&self, url: &str) -> Result<(), BrowserError> {
        self.site.visits.lock().unwrap().push(url.to_string());
        if let Some(err) = self.site.failures.get(url) {
            return Err(err.clone());
        }
        let html = self
            .site
            .pages
            .get(url)
            .cloned()
            .ok_or_else(|| BrowserError::Navigation(format!("404 {url}")))?;
        *self.current.lock().unwrap() = Loaded {
            url: url.to_string(),
            html,
        };
        Ok(())
    }

    /// Run `f` over every element matching `selector` in the current page.
    fn select<T>(
        &self,
        selector: &str,
        f: impl Fn(scraper::ElementRef<'_>) -> Option<T>,
    ) -> Result<Vec<T>, BrowserError> {
        let selector = Selector::parse(selector)
            .map_err(|e| BrowserError::Protocol(format!("bad selector {selector}: {e}")))?;
        let doc = Html::parse_document(&self.current.lock().unwrap().html);
        Ok(doc.select(&selector).filter_map(f).collect())
    }

    fn text_of(el: scraper::ElementRef<'_>) -> String {
        collapse_whitespace(&el.text().collect::<String>())
    }

    fn click_target(&self, selector: &str) -> Option<String> {
        self.site
            .clicks
            .get(&(self.current.lock().unwrap().url.clone(), selector.to_string()))
            .cloned()
    }
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    async fn goto(&self, url: &str, _timeout: Duration) -> Result<(), BrowserError> {
        self.load(url)
    }

    async fn current_url(&self) -> Result<String, BrowserError> {
        Ok(self.current.lock().unwrap().url.clone())
    }

    async fn title(&self) -> Result<String, BrowserError> {
        Ok(self
            .select("title", |el| Some(Self::text_of(el)))?
            .into_iter()
            .next()
            .unwrap_or_default())
    }

    async fn body_text(&self) -> Result<String, BrowserError> {
        Ok(self
            .select("body", |el| Some(el.text().collect::<Vec<_>>().join("\n")))?
            .into_iter()
            .next()
            .unwrap_or_default())
    }

    async fn count(&self, selector: &str) -> Result<usize, BrowserError> {
        Ok(self.select(selector, |_| Some(()))?.len())
    }

    async fn text(&self, selector: &str) -> Result<Option<String>, BrowserError> {
        Ok(self
            .select(selector, |el| Some(Self::text_of(el)))?
            .into_iter()
            .next())
    }

    async fn inner_html(&self, selector: &str) -> Result<Option<String>, BrowserError> {
        Ok(self.select(selector, |el| Some(el.inner_html()))?.into_iter().next())
    }

    async fn attributes(&self, selector: &str, attr: &str) -> Result<Vec<String>, BrowserError> {
        self.select(selector, |el| el.value().attr(attr).map(str::to_string))
    }

    async fn is_checked(&self, selector: &str) -> Result<Option<bool>, BrowserError> {
        Ok(self
            .select(selector, |el| Some(el.value().attr("checked").is_some()))?
            .into_iter()
            .next())
    }

    async fn fill(&mut self, selector: &str, value: &str) -> Result<bool, BrowserError> {
        if self.select(selector, |_| Some(()))?.is_empty() {
            return Ok(false);
        }
        self.site
            .fills
            .lock()
            .unwrap()
            .push((selector.to_string(), value.to_string()));
        Ok(true)
    }

    async fn click(&mut self, selector: &str) -> Result<bool, BrowserError> {
        if self.select(selector, |_| Some(()))?.is_empty() {
            return Ok(false);
        }
        if let Some(target) = self.click_target(selector) {
            self.load(&target)?;
        }
        Ok(true)
    }

    async fn click_containing(
        &mut self,
        selector: &str,
        needle: &str,
    ) -> Result<bool, BrowserError> {
        let needle = needle.to_lowercase();
        let found = self.select(selector, |el| {
            Self::text_of(el).to_lowercase().contains(&needle).then_some(())
        })?;
        if found.is_empty() {
            return Ok(false);
        }
        if let Some(target) = self.click_target(selector) {
            self.load(&target)?;
        }
        Ok(true)
    }

    async fn close(self: Box<Self>) -> Result<(), BrowserError> {
        self.site.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
