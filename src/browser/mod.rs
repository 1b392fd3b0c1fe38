// Browser automation capability. The engine sits behind `BrowserDriver` and
// `BrowserSession`; Chromium is compiled in by the `chromium` feature.

#[cfg(feature = "chromium")]
pub mod chromium;
#[cfg(test)]
pub mod scripted;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

#[derive(Debug, Clone, thiserror::Error)]
pub enum BrowserError {
    #[error("browser not available: {0}")]
    Unavailable(String),

    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("browser protocol error: {0}")]
    Protocol(String),
}

/// Launch options shared by every session a driver opens.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub user_agent: String,
    pub executable: Option<String>,
    pub window_size: (u32, u32),
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            user_agent: crate::config::DEFAULT_USER_AGENT.to_string(),
            executable: None,
            window_size: (1920, 1080),
        }
    }
}

/// Opens exclusive browser sessions, one per search.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn open(&self) -> Result<Box<dyn BrowserSession>, BrowserError>;
}

/// A single browser tab owned by one search. Selector arguments are CSS selectors;
/// lookups that match nothing return `None`, `false` or an empty list, not errors.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Load `url`, failing with `Timeout` once `timeout` elapses.
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), BrowserError>;

    async fn current_url(&self) -> Result<String, BrowserError>;

    async fn title(&self) -> Result<String, BrowserError>;

    /// Visible text of the whole document body.
    async fn body_text(&self) -> Result<String, BrowserError>;

    async fn count(&self, selector: &str) -> Result<usize, BrowserError>;

    /// Trimmed visible text of the first match.
    async fn text(&self, selector: &str) -> Result<Option<String>, BrowserError>;

    async fn inner_html(&self, selector: &str) -> Result<Option<String>, BrowserError>;

    /// `attr` of every match that carries it, in document order.
    async fn attributes(&self, selector: &str, attr: &str) -> Result<Vec<String>, BrowserError>;

    async fn is_checked(&self, selector: &str) -> Result<Option<bool>, BrowserError>;

    /// Type `value` into the first match. `false` if nothing matched.
    async fn fill(&mut self, selector: &str, value: &str) -> Result<bool, BrowserError>;

    async fn click(&mut self, selector: &str) -> Result<bool, BrowserError>;

    /// Click the first match whose text contains `needle` (case-insensitive).
    async fn click_containing(&mut self, selector: &str, needle: &str)
    -> Result<bool, BrowserError>;

    async fn close(self: Box<Self>) -> Result<(), BrowserError>;
}

/// Driver used when no browser engine is compiled in.
#[cfg(any(test, not(feature = "chromium")))]
pub struct UnavailableDriver;

#[cfg(any(test, not(feature = "chromium")))]
#[async_trait]
impl BrowserDriver for UnavailableDriver {
    async fn open(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        Err(BrowserError::Unavailable(
            "built without the `chromium` feature".to_string(),
        ))
    }
}

/// The best driver this build supports.
pub fn default_driver(options: LaunchOptions) -> Arc<dyn BrowserDriver> {
    #[cfg(feature = "chromium")]
    {
        Arc::new(chromium::ChromiumDriver::new(options))
    }
    #[cfg(not(feature = "chromium"))]
    {
        let _ = options;
        tracing::warn!("Browser automation disabled; primary source searches will fail");
        Arc::new(UnavailableDriver)
    }
}
