// Field extraction from a loaded job-detail page. A field that cannot be found stays
// `None` and never stops the others from being read.

use scraper::{Html, Selector};

use crate::browser::BrowserSession;
use crate::config::RetrievalSettings;
use crate::normalize::RawJob;
use crate::retry::{RetryPolicy, poll_until};
use crate::sanitize::text_len;

/// Selector chains for one site's detail page, best first.
#[derive(Debug, Clone, Copy)]
pub struct DetailSelectors {
    pub title: &'static [&'static str],
    pub company: &'static [&'static str],
    pub location: &'static [&'static str],
    pub description: &'static [&'static str],
}

/// Read every field from the page currently loaded in `session`.
///
/// The title gets the element timeout to appear. The description is polled until its
/// text reaches `description_min_chars` or the description timeout passes, then the
/// longest candidate present is taken, possibly truncated.
pub async fn extract_detail(
    session: &dyn BrowserSession,
    selectors: &DetailSelectors,
    settings: &RetrievalSettings,
    link: &str,
) -> RawJob {
    let title_wait = RetryPolicy::polling(settings.element_timeout, settings.poll_interval);
    let title = poll_until(&title_wait, || first_text(session, selectors.title)).await;
    if title.is_none() {
        tracing::debug!("No title on {link}");
    }

    let company = first_text(session, selectors.company).await;
    let location = first_text(session, selectors.location).await;
    let description = wait_for_description(session, selectors.description, settings).await;
    if description.is_none() {
        tracing::debug!("No description on {link}");
    }

    RawJob {
        title,
        company,
        location,
        link: Some(link.to_string()),
        description,
    }
}

/// First non-empty text along a selector chain.
async fn first_text(session: &dyn BrowserSession, chain: &[&str]) -> Option<String> {
    for selector in chain {
        match session.text(selector).await {
            Ok(Some(text)) if !text.trim().is_empty() => return Some(text),
            Ok(_) => {}
            Err(e) => tracing::debug!("Reading '{selector}' failed: {e}"),
        }
    }
    None
}

/// Longest description HTML along the chain, with its visible length.
async fn best_description(session: &dyn BrowserSession, chain: &[&str]) -> Option<(String, usize)> {
    let mut best: Option<(String, usize)> = None;
    for selector in chain {
        let Ok(Some(html)) = session.inner_html(selector).await else {
            continue;
        };
        let len = text_len(&html);
        if len > 0 && best.as_ref().is_none_or(|(_, b)| len > *b) {
            best = Some((html, len));
        }
    }
    best
}

async fn wait_for_description(
    session: &dyn BrowserSession,
    chain: &[&str],
    settings: &RetrievalSettings,
) -> Option<String> {
    let wait = RetryPolicy::polling(settings.description_timeout, settings.poll_interval);
    let min = settings.description_min_chars;
    let complete = poll_until(&wait, || async move {
        best_description(session, chain)
            .await
            .filter(|(_, len)| *len >= min)
    })
    .await;

    match complete {
        Some((html, _)) => Some(html),
        None => {
            let partial = best_description(session, chain).await;
            if let Some((_, len)) = &partial {
                tracing::info!("Description stayed at {len} chars, keeping it as is");
            }
            partial.map(|(html, _)| html)
        }
    }
}

/// Description HTML from a fetched document, for sources that read pages over HTTP.
/// The longest match along the chain wins.
pub fn description_from_document(html: &str, chain: &[&str]) -> Option<String> {
    let doc = Html::parse_document(html);
    chain
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .filter_map(|selector| doc.select(&selector).next().map(|el| el.inner_html()))
        .map(|html| {
            let len = text_len(&html);
            (html, len)
        })
        .filter(|(_, len)| *len > 0)
        .max_by_key(|(_, len)| *len)
        .map(|(html, _)| html)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::BrowserDriver;
    use crate::browser::scripted::{ScriptedDriver, ScriptedSite};

    const SELECTORS: DetailSelectors = DetailSelectors {
        title: &["h1.job-title", "h1"],
        company: &["a.company", "span.company"],
        location: &["span.loc"],
        description: &["div.description", "article"],
    };

    async fn extract_from(html: &str) -> RawJob {
        let site = ScriptedSite::new().page("https://s.test/job/1", html.to_string());
        let driver = ScriptedDriver::new(site);
        let session = driver.open().await.unwrap();
        session
            .goto("https://s.test/job/1", std::time::Duration::from_secs(1))
            .await
            .unwrap();
        extract_detail(
            session.as_ref(),
            &SELECTORS,
            &RetrievalSettings::fast(),
            "https://s.test/job/1",
        )
        .await
    }

    #[tokio::test]
    async fn falls_back_per_field() {
        let raw = extract_from(
            r#"<html><body>
                <h1>Credit Risk Analyst</h1>
                <span class="company">Northwind</span>
                <article><p>Model credit exposure across the loan book and report to the CRO weekly.</p></article>
            </body></html>"#,
        )
        .await;
        assert_eq!(raw.title.as_deref(), Some("Credit Risk Analyst"));
        assert_eq!(raw.company.as_deref(), Some("Northwind"));
        assert_eq!(raw.location, None);
        assert!(raw.description.unwrap().contains("credit exposure"));
        assert_eq!(raw.link.as_deref(), Some("https://s.test/job/1"));
    }

    #[tokio::test]
    async fn short_description_is_kept_after_timeout() {
        let raw = extract_from(
            r#"<html><body><h1 class="job-title">Quant</h1><span class="loc">London</span>
               <div class="description"><p>Short text.</p></div></body></html>"#,
        )
        .await;
        assert_eq!(raw.title.as_deref(), Some("Quant"));
        assert_eq!(raw.location.as_deref(), Some("London"));
        assert_eq!(raw.description.as_deref(), Some("<p>Short text.</p>"));
    }

    #[tokio::test]
    async fn empty_page_yields_only_the_link() {
        let raw = extract_from("<html><body><div></div></body></html>").await;
        assert_eq!(
            raw,
            RawJob {
                link: Some("https://s.test/job/1".to_string()),
                ..RawJob::default()
            }
        );
    }

    #[test]
    fn document_description_prefers_longest_match() {
        let html = r#"<html><body>
            <section id="summary"><p>Brief</p></section>
            <section id="job"><p>The full posting with responsibilities and requirements.</p></section>
        </body></html>"#;
        let found = description_from_document(html, &["#summary", "#job", "#missing"]).unwrap();
        assert!(found.contains("full posting"));
        assert_eq!(description_from_document(html, &["#missing"]), None);
    }
}
