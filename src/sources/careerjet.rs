use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;

use crate::config::RetrievalSettings;
use crate::error::RetrievalError;
use crate::extract::description_from_document;
use crate::models::job::{JobRecord, JobSource, NO_LINK, is_missing};
use crate::models::search::{Region, SearchRequest, Seniority};
use crate::normalize::{RawJob, longer_description, normalize};
use crate::retry::{RetryPolicy, retry};
use crate::sanitize::{sanitize_html, text_len};
use crate::sources::SourceAdapter;

/// Provider maximum per request.
const MAX_PAGE_SIZE: usize = 20;

/// Where a job's own page keeps the full description.
const DETAIL_DESCRIPTION: &[&str] = &[
    "section.content",
    "div.content",
    "#job-description",
    "article",
];

/// API endpoint and locale per region. Regions without a local endpoint use the US one.
pub fn endpoint(region: Region) -> (&'static str, &'static str) {
    match region {
        Region::Uk => ("http://public-api.careerjet.co.uk/search", "en_GB"),
        Region::Ca => ("http://public-api.careerjet.ca/search", "en_CA"),
        Region::Au => ("http://public-api.careerjet.com.au/search", "en_AU"),
        Region::Us | Region::Sg | Region::De | Region::Hk => {
            ("http://public-api.careerjet.com/search", "en_US")
        }
    }
}

/// Keyword appended to the query to approximate a seniority band.
pub fn seniority_keyword(seniority: Seniority) -> &'static str {
    match seniority {
        Seniority::Intern => "internship",
        Seniority::Junior | Seniority::Analyst => "entry level",
        Seniority::Associate | Seniority::Avp => "experienced",
        Seniority::Vp => "manager",
        Seniority::Svp | Seniority::Director | Seniority::Md | Seniority::Csuite => "executive",
    }
}

/// Careerjet public search API.
pub struct Careerjet {
    settings: RetrievalSettings,
    client: reqwest::Client,
    endpoint_override: Option<String>,
}

#[async_trait]
impl SourceAdapter for Careerjet {
    fn source(&self) -> JobSource {
        JobSource::ApiSource
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<JobRecord>, RetrievalError> {
        let (default_url, locale) = endpoint(request.region);
        let url = self.endpoint_override.as_deref().unwrap_or(default_url);
        let params = self.query(request, locale);
        tracing::info!("Querying Careerjet {url} ({locale})");

        let policy = RetryPolicy::backoff(3, self.settings.api_retry_delay);
        let envelope = retry(
            &policy,
            |_| self.fetch_envelope(url, &params),
            RetrievalError::is_retryable,
        )
        .await?;

        let raw_jobs = parse_envelope(&envelope, &request.location)?;
        tracing::info!("Careerjet returned {} jobs", raw_jobs.len());

        let mut jobs = Vec::new();
        for (i, raw) in raw_jobs.into_iter().take(request.max_jobs).enumerate() {
            let mut job = normalize(raw, JobSource::ApiSource, None);
            if self.settings.fetch_full_descriptions && job.link != NO_LINK {
                if i > 0 {
                    tokio::time::sleep(self.settings.detail_fetch_delay).await;
                }
                let full = self.fetch_full_description(&job.link).await;
                job.description = if is_missing(&job.description) {
                    full.unwrap_or(job.description)
                } else {
                    longer_description(job.description, full)
                };
            }
            jobs.push(job);
        }
        Ok(jobs)
    }
}

impl Careerjet {
    pub fn new(settings: RetrievalSettings) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(settings.http_timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client ({e}), using defaults");
                reqwest::Client::new()
            });
        Self {
            settings,
            client,
            endpoint_override: None,
        }
    }

    /// Send every request to `url` instead of the regional endpoint.
    pub fn with_endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint_override = Some(url.into());
        self
    }

    fn query(&self, request: &SearchRequest, locale: &str) -> Vec<(&'static str, String)> {
        let keywords = match request.seniority {
            Some(s) => format!("{} {}", request.title, seniority_keyword(s)),
            None => request.title.clone(),
        };
        vec![
            ("keywords", keywords),
            ("location", request.location.clone()),
            ("affid", self.settings.careerjet_affid.clone()),
            ("user_ip", "127.0.0.1".to_string()),
            ("user_agent", self.settings.user_agent.clone()),
            ("locale_code", locale.to_string()),
            ("pagesize", request.max_jobs.min(MAX_PAGE_SIZE).to_string()),
            ("page", "1".to_string()),
            ("sort", "relevance".to_string()),
        ]
    }

    async fn fetch_envelope(
        &self,
        url: &str,
        params: &[(&'static str, String)],
    ) -> Result<Value, RetrievalError> {
        let resp = self.client.get(url).query(params).send().await?;

        let status = resp.status();
        if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(RetrievalError::Blocked(format!("Careerjet returned {status}")));
        }
        if status.is_server_error() {
            return Err(RetrievalError::Network(format!("Careerjet returned {status}")));
        }
        if !status.is_success() {
            return Err(RetrievalError::Rejected(format!("Careerjet returned {status}")));
        }

        resp.json()
            .await
            .map_err(|e| RetrievalError::Parse(format!("Failed to parse Careerjet response: {e}")))
    }

    /// Sanitized description from the job's own page, if it could be read.
    async fn fetch_full_description(&self, link: &str) -> Option<String> {
        let resp = match self.client.get(link).send().await {
            Ok(resp) if resp.status().is_success() => resp,
            Ok(resp) => {
                tracing::debug!("Detail page {link} returned {}", resp.status());
                return None;
            }
            Err(e) => {
                tracing::debug!("Detail page {link} failed: {e}");
                return None;
            }
        };
        let html = resp.text().await.ok()?;
        let description = sanitize_html(&description_from_document(&html, DETAIL_DESCRIPTION)?);
        (text_len(&description) > 0).then_some(description)
    }
}

/// Interpret the response envelope: results, an ambiguous location, or a provider error.
fn parse_envelope(data: &Value, request_location: &str) -> Result<Vec<RawJob>, RetrievalError> {
    let kind = data.get("type").and_then(|v| v.as_str()).unwrap_or("");
    match kind {
        "JOBS" => {
            let jobs = data
                .get("jobs")
                .and_then(|v| v.as_array())
                .map(Vec::as_slice)
                .unwrap_or_default();
            if jobs.is_empty() {
                return Err(RetrievalError::NoResults(String::new()));
            }
            Ok(jobs
                .iter()
                .map(|job| parse_job(job, request_location))
                .collect())
        }
        "LOCATIONS" => Err(RetrievalError::NoResults(
            "the location is ambiguous, try a more specific one".to_string(),
        )),
        "ERROR" => {
            let text = ["error", "message"]
                .iter()
                .find_map(|k| data.get(*k).and_then(|v| v.as_str()))
                .unwrap_or("unspecified error");
            Err(RetrievalError::Provider(text.to_string()))
        }
        "" => Err(RetrievalError::Parse(
            "Careerjet response has no type".to_string(),
        )),
        other => Err(RetrievalError::Parse(format!(
            "unexpected Careerjet response type '{other}'"
        ))),
    }
}

fn parse_job(job: &Value, request_location: &str) -> RawJob {
    let field = |key: &str| {
        job.get(key)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    RawJob {
        title: field("title"),
        company: field("company"),
        location: field("locations").or_else(|| {
            (!request_location.trim().is_empty()).then(|| request_location.to_string())
        }),
        link: field("url"),
        description: field("description"),
    }
}
