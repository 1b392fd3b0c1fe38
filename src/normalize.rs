// Canonical job-record shaping shared by every source.

use std::collections::HashSet;

use url::Url;

use crate::models::job::{
    COMPANY_PLACEHOLDER, JobRecord, JobSource, NO_LINK, NOT_FOUND, is_missing,
};
use crate::sanitize::{decode_text, sanitize_html, text_len};

/// Fields as a source found them, before any cleanup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawJob {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub link: Option<String>,
    /// Raw HTML (or plain text) of the description.
    pub description: Option<String>,
}

/// Build the canonical record: entity-decoded single-line text fields, absolute link,
/// sanitized description, sentinels for anything missing.
pub fn normalize(raw: RawJob, source: JobSource, base_url: Option<&str>) -> JobRecord {
    JobRecord {
        title: text_field(raw.title.as_deref()),
        company: text_field(raw.company.as_deref()),
        location: text_field(raw.location.as_deref()),
        link: raw
            .link
            .as_deref()
            .and_then(|href| resolve_link(base_url, href))
            .unwrap_or_else(|| NO_LINK.to_string()),
        description: description_field(raw.description.as_deref()),
        source,
    }
}

fn text_field(value: Option<&str>) -> String {
    value
        .map(decode_text)
        .filter(|v| !is_missing(v))
        .unwrap_or_else(|| NOT_FOUND.to_string())
}

fn description_field(value: Option<&str>) -> String {
    value
        .map(sanitize_html)
        .filter(|html| text_len(html) > 0 && !is_missing(html))
        .unwrap_or_else(|| NOT_FOUND.to_string())
}

/// Absolute http(s) URL for `href`, resolved against `base` when relative.
pub fn resolve_link(base: Option<&str>, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href == NO_LINK {
        return None;
    }
    let url = match Url::parse(href) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse(base?).ok()?.join(href).ok()?
        }
        Err(_) => return None,
    };
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}

/// Drop repeated links, keeping first-seen order.
pub fn dedup_links(links: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    links
        .into_iter()
        .filter(|link| seen.insert(link.clone()))
        .collect()
}

/// Swap a missing company for the display placeholder.
pub fn with_company_placeholder(mut job: JobRecord) -> JobRecord {
    if is_missing(&job.company) {
        job.company = COMPANY_PLACEHOLDER.to_string();
    }
    job
}

/// Keep whichever description has more visible text; ties keep `current`.
pub fn longer_description(current: String, candidate: Option<String>) -> String {
    match candidate {
        Some(candidate) if text_len(&candidate) > text_len(&current) => candidate,
        _ => current,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_sentinels_for_missing_fields() {
        let job = normalize(RawJob::default(), JobSource::ApiSource, None);
        assert_eq!(job.title, NOT_FOUND);
        assert_eq!(job.company, NOT_FOUND);
        assert_eq!(job.location, NOT_FOUND);
        assert_eq!(job.description, NOT_FOUND);
        assert_eq!(job.link, NO_LINK);
        assert!(!job.is_complete());
    }

    #[test]
    fn cleans_text_and_description() {
        let raw = RawJob {
            title: Some("  Senior  Risk &amp; Control\nManager ".to_string()),
            company: Some("Acme".to_string()),
            location: Some("New York, NY".to_string()),
            link: Some("/job/123?src=search".to_string()),
            description: Some(
                r#"<div><span>Lead</span> the <b>team</b><script>x()</script></div>"#.to_string(),
            ),
        };
        let job = normalize(raw, JobSource::PrimarySite, Some("https://www.example.com/jobs"));
        assert_eq!(job.title, "Senior Risk & Control Manager");
        assert_eq!(job.link, "https://www.example.com/job/123?src=search");
        assert_eq!(job.description, "Lead the <b>team</b>");
        assert!(job.is_complete());
    }

    #[test]
    fn markup_only_description_is_missing() {
        let raw = RawJob {
            description: Some("<div><script>track()</script><br></div>".to_string()),
            ..RawJob::default()
        };
        let job = normalize(raw, JobSource::PrimarySite, None);
        assert_eq!(job.description, NOT_FOUND);
    }

    #[test]
    fn rejects_non_http_links() {
        assert_eq!(resolve_link(None, "javascript:void(0)"), None);
        assert_eq!(resolve_link(None, "#"), None);
        assert_eq!(resolve_link(None, "/relative"), None);
        assert_eq!(
            resolve_link(None, "https://jobs.example.com/a"),
            Some("https://jobs.example.com/a".to_string())
        );
    }

    #[test]
    fn dedup_keeps_discovery_order() {
        let links = ["b", "a", "b", "c", "a"].map(String::from);
        assert_eq!(dedup_links(links), vec!["b", "a", "c"]);
    }

    #[test]
    fn longer_description_wins() {
        let short = "<p>Short</p>".to_string();
        let long = "<p>A much longer description</p>".to_string();
        assert_eq!(longer_description(short.clone(), Some(long.clone())), long);
        assert_eq!(longer_description(long.clone(), Some(short)), long);
        assert_eq!(longer_description(long.clone(), None), long);
    }

    #[test]
    fn placeholder_replaces_missing_company() {
        let job = normalize(RawJob::default(), JobSource::PrimarySite, None);
        assert_eq!(with_company_placeholder(job).company, COMPANY_PLACEHOLDER);
    }
}
