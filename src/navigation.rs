// Drives a browser session through a job board: page loads, search form,
// optional filter, "show more" pagination and link collection.

use std::sync::LazyLock;

use regex::Regex;

use crate::browser::{BrowserError, BrowserSession};
use crate::config::RetrievalSettings;
use crate::error::RetrievalError;
use crate::normalize::{dedup_links, resolve_link};
use crate::retry::{RetryPolicy, poll_until, retry};

/// Markers of anti-bot interstitials.
const CHALLENGE_TITLES: [&str; 3] = ["just a moment", "attention required", "access denied"];
const CHALLENGE_SELECTOR: &str = "input[name='cf-turnstile-response'], #challenge-form, iframe[src*='challenges.cloudflare.com']";

/// "Risk Manager job in New York (7)" / "12 jobs in London (12)"
static JOB_COUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bjobs?\s+in\b[^\n()]*\((\d+)\)").expect("valid job count pattern")
});

/// Where a results listing keeps its cards and how it loads more.
#[derive(Debug, Clone, Copy)]
pub struct ListingPlan {
    /// Job-card link selectors, best first. The first one that matches is used.
    pub cards: &'static [&'static str],
    pub load_more: &'static str,
    /// Button texts that mean "load more", tried in order.
    pub load_more_texts: &'static [&'static str],
    /// Text shown once the listing is exhausted.
    pub end_marker: &'static str,
    /// Texts shown when the search matched nothing.
    pub empty_markers: &'static [&'static str],
}

/// A facet that narrows results: a control that opens it and the option to tick.
#[derive(Debug, Clone)]
pub struct FilterStep {
    pub opener: &'static str,
    pub opener_text: &'static str,
    pub option: String,
}

pub struct Navigator<'a> {
    session: &'a mut dyn BrowserSession,
    settings: &'a RetrievalSettings,
}

impl<'a> Navigator<'a> {
    pub fn new(session: &'a mut dyn BrowserSession, settings: &'a RetrievalSettings) -> Self {
        Self { session, settings }
    }

    pub fn session(&self) -> &dyn BrowserSession {
        &*self.session
    }

    pub fn settings(&self) -> &RetrievalSettings {
        self.settings
    }

    fn element_wait(&self) -> RetryPolicy {
        RetryPolicy::polling(self.settings.element_timeout, self.settings.poll_interval)
    }

    /// Load `url`, retrying once on navigation errors, then clear any challenge page.
    /// A load that exceeds the page timeout is terminal.
    pub async fn open_page(&self, url: &str) -> Result<(), RetrievalError> {
        let policy = RetryPolicy::backoff(2, self.settings.poll_interval);
        let timeout = self.settings.page_load_timeout;
        let session = &*self.session;
        retry(
            &policy,
            |_| session.goto(url, timeout),
            |e| matches!(e, BrowserError::Navigation(_)),
        )
        .await?;
        self.await_challenge().await
    }

    pub async fn is_challenge(&self) -> bool {
        let title = self.session.title().await.unwrap_or_default().to_lowercase();
        if CHALLENGE_TITLES.iter().any(|t| title.contains(t)) {
            return true;
        }
        self.session
            .count(CHALLENGE_SELECTOR)
            .await
            .is_ok_and(|n| n > 0)
    }

    /// Give an interstitial the element timeout to clear on its own.
    pub async fn await_challenge(&self) -> Result<(), RetrievalError> {
        if !self.is_challenge().await {
            return Ok(());
        }
        tracing::warn!("Anti-bot challenge detected, waiting for it to clear");
        let cleared = poll_until(&self.element_wait(), || async move {
            (!self.is_challenge().await).then_some(())
        })
        .await;
        match cleared {
            Some(()) => {
                tracing::info!("Challenge cleared");
                Ok(())
            }
            None => {
                let url = self.session.current_url().await.unwrap_or_default();
                Err(RetrievalError::Blocked(format!("challenge did not clear on {url}")))
            }
        }
    }

    /// First selector, in priority order, that matches within the element timeout.
    pub async fn wait_for_any(&self, selectors: &[&'static str]) -> Option<&'static str> {
        poll_until(&self.element_wait(), || self.first_present(selectors)).await
    }

    /// First selector that matches right now, without waiting.
    pub async fn first_present(&self, selectors: &[&'static str]) -> Option<&'static str> {
        for &selector in selectors {
            if self.session.count(selector).await.is_ok_and(|n| n > 0) {
                return Some(selector);
            }
        }
        None
    }

    pub async fn fill_field(
        &mut self,
        field: &str,
        selectors: &[&'static str],
        value: &str,
    ) -> Result<(), RetrievalError> {
        let Some(selector) = self.wait_for_any(selectors).await else {
            return Err(RetrievalError::Parse(format!("no {field} input found")));
        };
        if !self.session.fill(selector, value).await? {
            return Err(RetrievalError::Parse(format!("{field} input vanished")));
        }
        tracing::debug!("Filled {field} via '{selector}'");
        Ok(())
    }

    pub async fn submit(&mut self, selectors: &[&'static str]) -> Result<(), RetrievalError> {
        let Some(selector) = self.wait_for_any(selectors).await else {
            return Err(RetrievalError::Parse("no search button found".to_string()));
        };
        if !self.session.click(selector).await? {
            return Err(RetrievalError::Parse("search button vanished".to_string()));
        }
        Ok(())
    }

    /// Wait for the first job cards. Absent cards mean either an empty result set
    /// (the site says so) or a page that never finished loading.
    pub async fn wait_for_results(
        &self,
        plan: &ListingPlan,
    ) -> Result<&'static str, RetrievalError> {
        if let Some(selector) = self.wait_for_any(plan.cards).await {
            return Ok(selector);
        }
        self.await_challenge().await?;

        let body = self.session.body_text().await.unwrap_or_default();
        let lowered = body.to_lowercase();
        let empty = plan
            .empty_markers
            .iter()
            .any(|m| lowered.contains(&m.to_lowercase()))
            || expected_count(&body) == Some(0);
        if empty {
            return Err(RetrievalError::NoResults(String::new()));
        }
        Err(RetrievalError::Timeout(
            "results listing did not appear".to_string(),
        ))
    }

    /// Re-open the current listing sorted by relevance. Best effort.
    pub async fn prefer_relevance(&self) {
        let Ok(current) = self.session.current_url().await else {
            return;
        };
        if current.contains("sort=") || !current.starts_with("http") {
            return;
        }
        let separator = if current.contains('?') { '&' } else { '?' };
        let sorted = format!("{current}{separator}sort=relevance");
        tracing::debug!("Switching listing to relevance order: {sorted}");
        if let Err(e) = self.open_page(&sorted).await {
            tracing::warn!("Could not sort by relevance: {e}");
            if let Err(e) = self.open_page(&current).await {
                tracing::warn!("Could not return to listing: {e}");
            }
        }
    }

    /// Apply a filter. Any missing control skips the filter; never an error.
    pub async fn apply_filter(&mut self, step: &FilterStep, plan: &ListingPlan) -> bool {
        match self.try_filter(step, plan).await {
            Ok(()) => true,
            Err(reason) => {
                tracing::warn!("Skipping filter '{}': {reason}", step.option);
                false
            }
        }
    }

    async fn try_filter(&mut self, step: &FilterStep, plan: &ListingPlan) -> Result<(), String> {
        let opened = self
            .session
            .click_containing(step.opener, step.opener_text)
            .await
            .map_err(|e| e.to_string())?;
        if !opened {
            return Err(format!("no '{}' control", step.opener_text));
        }

        let option = step.option.as_str();
        let this = &*self;
        let present = poll_until(&self.element_wait(), || async move {
            this.session
                .count(option)
                .await
                .is_ok_and(|n| n > 0)
                .then_some(())
        })
        .await;
        if present.is_none() {
            return Err(format!("option '{option}' not found"));
        }

        if self.session.is_checked(option).await.map_err(|e| e.to_string())? == Some(true) {
            return Ok(());
        }

        let before_url = self.session.current_url().await.unwrap_or_default();
        let before_links = self.listing_links(plan).await;
        if !self.session.click(option).await.map_err(|e| e.to_string())? {
            return Err(format!("option '{option}' vanished"));
        }

        // The filter only counts once the listing itself has changed.
        let this = &*self;
        let (before_url, before_links) = (before_url.as_str(), &before_links);
        let reloaded = poll_until(&self.element_wait(), || async move {
            let url = this.session.current_url().await.unwrap_or_default();
            let changed = url != before_url || this.listing_links(plan).await != *before_links;
            changed.then_some(())
        })
        .await;
        if reloaded.is_none() {
            return Err(format!("listing did not change after selecting '{option}'"));
        }
        self.wait_for_results(plan)
            .await
            .map(|_| ())
            .map_err(|e| format!("results did not reload: {e}"))
    }

    /// Links under the best card selector present right now.
    async fn listing_links(&self, plan: &ListingPlan) -> Vec<String> {
        match self.first_present(plan.cards).await {
            Some(selector) => self.read_links(selector).await,
            None => Vec::new(),
        }
    }

    /// Detail links currently on the listing, absolute and de-duplicated.
    pub async fn read_links(&self, card_selector: &str) -> Vec<String> {
        let base = self.session.current_url().await.ok();
        let hrefs = self
            .session
            .attributes(card_selector, "href")
            .await
            .unwrap_or_default();
        dedup_links(
            hrefs
                .iter()
                .filter_map(|href| resolve_link(base.as_deref(), href)),
        )
    }

    /// Job count advertised in the listing header, if any.
    pub async fn advertised_count(&self) -> Option<usize> {
        let body = self.session.body_text().await.ok()?;
        expected_count(&body)
    }

    /// Click "show more" until `target` links are visible, the listing ends, a click
    /// adds nothing, or the attempt budget runs out. The result never exceeds `cap`.
    pub async fn collect_links(
        &mut self,
        plan: &ListingPlan,
        card_selector: &'static str,
        target: usize,
        cap: Option<usize>,
    ) -> Vec<String> {
        let goal = cap.map_or(target, |c| c.min(target));
        let mut links = self.read_links(card_selector).await;

        for attempt in 1..=self.settings.max_pagination_attempts {
            if links.len() >= goal {
                break;
            }
            let body = self.session.body_text().await.unwrap_or_default();
            if body.contains(plan.end_marker) {
                tracing::debug!("Listing exhausted after {} links", links.len());
                break;
            }

            let mut clicked = false;
            for text in plan.load_more_texts {
                if self
                    .session
                    .click_containing(plan.load_more, text)
                    .await
                    .unwrap_or(false)
                {
                    clicked = true;
                    break;
                }
            }
            if !clicked {
                tracing::debug!("No load-more control after {} links", links.len());
                break;
            }

            let before = links.len();
            let this = &*self;
            let grown = poll_until(&self.element_wait(), || async move {
                let current = this.read_links(card_selector).await;
                (current.len() > before).then_some(current)
            })
            .await;
            match grown {
                Some(current) => {
                    tracing::debug!(
                        "Pagination {attempt}: {} -> {} links",
                        before,
                        current.len()
                    );
                    links = current;
                }
                None => {
                    tracing::warn!("Pagination stalled at {before} links");
                    break;
                }
            }
        }

        if let Some(cap) = cap {
            links.truncate(cap);
        }
        links
    }
}

/// Parse the advertised result count out of listing text.
pub fn expected_count(text: &str) -> Option<usize> {
    JOB_COUNT
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
