use std::sync::Arc;

use async_trait::async_trait;

use crate::browser::{BrowserDriver, BrowserSession};
use crate::config::RetrievalSettings;
use crate::error::RetrievalError;
use crate::extract::{DetailSelectors, extract_detail};
use crate::models::job::{JobRecord, JobSource};
use crate::models::search::{Region, SearchRequest, Seniority};
use crate::navigation::{FilterStep, ListingPlan, Navigator};
use crate::normalize::normalize;
use crate::sources::SourceAdapter;

const TITLE_INPUTS: &[&str] = &[
    "input[placeholder='Job title, keyword or company']",
    "input[name='q']",
    "input[type='search']",
];
const LOCATION_INPUTS: &[&str] = &["input[placeholder='Location']", "input[name='location']"];
const SUBMIT_BUTTONS: &[&str] = &["button[type='submit']", "form button"];

const LISTING: ListingPlan = ListingPlan {
    cards: &["a.font-subtitle-3-medium.job-title", "a.job-title"],
    load_more: "button",
    load_more_texts: &["Show more", "Load more"],
    end_marker: "No more jobs!",
    empty_markers: &["No jobs found", "We couldn't find any jobs"],
};

const DETAIL: DetailSelectors = DetailSelectors {
    title: &["h1.font-heading-3", "h1"],
    company: &["a.companyInfo", "span.companyInfo"],
    location: &["span.loc", ".job-location"],
    description: &["div.inner-content", "div.job-description", "article"],
};

const SENIORITY_FILTER: &str = "efc-filter-button button";
const SENIORITY_LABEL: &str = "Seniority";

/// Localized homepage for a region.
pub fn homepage(region: Region) -> &'static str {
    match region {
        Region::Us | Region::Ca => "https://www.efinancialcareers.com/",
        Region::Uk => "https://www.efinancialcareers.co.uk/",
        Region::Au => "https://www.efinancialcareers.com.au/",
        Region::Sg => "https://www.efinancialcareers.sg/",
        Region::De => "https://www.efinancialcareers.de/",
        Region::Hk => "https://www.efinancialcareers.hk/",
    }
}

/// The site's value for each seniority band, used in the filter checkbox id.
pub fn seniority_code(seniority: Seniority) -> &'static str {
    match seniority {
        Seniority::Intern => "INTERN_GRADUATE",
        Seniority::Junior => "JUNIOR",
        Seniority::Analyst => "ANALYST",
        Seniority::Associate => "ASSOCIATE_MID_LEVEL",
        Seniority::Avp => "AVP_SENIOR",
        Seniority::Vp => "VP_PRINCIPAL",
        Seniority::Svp => "SVP_HEAD_OF",
        Seniority::Director => "DIRECTOR",
        Seniority::Md => "MANAGING_DIRECTOR",
        Seniority::Csuite => "C_SUITE",
    }
}

/// eFinancialCareers, driven through a headless browser.
pub struct EFinancialCareers {
    settings: RetrievalSettings,
    driver: Arc<dyn BrowserDriver>,
}

#[async_trait]
impl SourceAdapter for EFinancialCareers {
    fn source(&self) -> JobSource {
        JobSource::PrimarySite
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<JobRecord>, RetrievalError> {
        let mut session = self.driver.open().await?;
        let result = self.run(session.as_mut(), request).await;
        if let Err(e) = session.close().await {
            tracing::warn!("Failed to close browser session: {e}");
        }
        result
    }
}

impl EFinancialCareers {
    pub fn new(settings: RetrievalSettings, driver: Arc<dyn BrowserDriver>) -> Self {
        Self { settings, driver }
    }

    async fn run(
        &self,
        session: &mut dyn BrowserSession,
        request: &SearchRequest,
    ) -> Result<Vec<JobRecord>, RetrievalError> {
        let mut nav = Navigator::new(session, &self.settings);

        let home = homepage(request.region);
        tracing::info!("Opening {home}");
        nav.open_page(home).await?;

        nav.fill_field("title", TITLE_INPUTS, &request.title).await?;
        nav.fill_field("location", LOCATION_INPUTS, &request.location).await?;
        nav.submit(SUBMIT_BUTTONS).await?;
        nav.wait_for_results(&LISTING).await?;

        nav.prefer_relevance().await;

        if let Some(seniority) = request.seniority {
            let step = FilterStep {
                opener: SENIORITY_FILTER,
                opener_text: SENIORITY_LABEL,
                option: format!("#seniority{}", seniority_code(seniority)),
            };
            if nav.apply_filter(&step, &LISTING).await {
                tracing::info!("Applied seniority filter '{}'", seniority.as_str());
            }
        }
        let card_selector = nav.wait_for_results(&LISTING).await?;

        let advertised = nav.advertised_count().await;
        if let Some(count) = advertised {
            tracing::info!("Listing advertises {count} jobs");
        }
        let target = request.max_jobs + self.settings.pagination_buffer;
        let links = nav
            .collect_links(&LISTING, card_selector, target, advertised)
            .await;
        if links.is_empty() {
            return Err(RetrievalError::Parse(
                "job cards carry no usable links".to_string(),
            ));
        }
        tracing::info!("Collected {} job links", links.len());

        let mut jobs = Vec::new();
        for (i, link) in links.iter().enumerate() {
            if jobs.len() >= request.max_jobs {
                break;
            }
            if i > 0 {
                tokio::time::sleep(self.settings.detail_fetch_delay).await;
            }

            match nav.open_page(link).await {
                Ok(()) => {}
                Err(RetrievalError::Blocked(detail)) if jobs.is_empty() => {
                    return Err(RetrievalError::Blocked(detail));
                }
                Err(RetrievalError::Blocked(detail)) => {
                    tracing::warn!("Blocked after {} jobs, returning them: {detail}", jobs.len());
                    break;
                }
                Err(e) => {
                    tracing::warn!("Skipping {link}: {e}");
                    continue;
                }
            }

            let raw = extract_detail(nav.session(), &DETAIL, nav.settings(), link).await;
            let job = normalize(raw, JobSource::PrimarySite, Some(link));
            if job.is_complete() {
                tracing::debug!("Extracted '{}' at {}", job.title, job.company);
                jobs.push(job);
            } else {
                tracing::warn!("Skipping incomplete job {link}");
            }
        }

        tracing::info!("Retrieved {} jobs from {}", jobs.len(), JobSource::PrimarySite);
        Ok(jobs)
    }
}
