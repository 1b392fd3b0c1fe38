use serde::{Deserialize, Serialize};

use crate::models::job::JobSource;

pub const MAX_JOBS_LIMIT: usize = 50;
pub const DEFAULT_MAX_JOBS: usize = 50;

/// Clamp a requested job count into `1..=50`.
///
/// Out-of-range values fall back to the default instead of being rejected.
pub fn clamp_max_jobs(requested: i64) -> usize {
    if (1..=MAX_JOBS_LIMIT as i64).contains(&requested) {
        requested as usize
    } else {
        DEFAULT_MAX_JOBS
    }
}

/// Parse free-form caller input for the job count. Unparseable input yields the default.
pub fn parse_max_jobs(raw: Option<&str>) -> usize {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .map(clamp_max_jobs)
        .unwrap_or(DEFAULT_MAX_JOBS)
}

/// Career-level band a search can be narrowed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Seniority {
    Intern,
    Junior,
    Analyst,
    Associate,
    Avp,
    Vp,
    Svp,
    Director,
    Md,
    Csuite,
}

impl Seniority {
    pub const ALL: [Seniority; 10] = [
        Seniority::Intern,
        Seniority::Junior,
        Seniority::Analyst,
        Seniority::Associate,
        Seniority::Avp,
        Seniority::Vp,
        Seniority::Svp,
        Seniority::Director,
        Seniority::Md,
        Seniority::Csuite,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Seniority::Intern => "intern",
            Seniority::Junior => "junior",
            Seniority::Analyst => "analyst",
            Seniority::Associate => "associate",
            Seniority::Avp => "avp",
            Seniority::Vp => "vp",
            Seniority::Svp => "svp",
            Seniority::Director => "director",
            Seniority::Md => "md",
            Seniority::Csuite => "csuite",
        }
    }

    /// Empty or unrecognised input means "no filter".
    pub fn parse(raw: &str) -> Option<Self> {
        let key = raw.trim().to_ascii_lowercase();
        if key.is_empty() {
            return None;
        }
        let found = Self::ALL.into_iter().find(|s| s.as_str() == key);
        if found.is_none() {
            tracing::debug!("Ignoring unknown seniority '{raw}'");
        }
        found
    }
}

/// Which localized site/endpoint the adapters target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Region {
    #[default]
    Us,
    Uk,
    Ca,
    Au,
    Sg,
    De,
    Hk,
}

impl Region {
    pub fn code(&self) -> &'static str {
        match self {
            Region::Us => "US",
            Region::Uk => "UK",
            Region::Ca => "CA",
            Region::Au => "AU",
            Region::Sg => "SG",
            Region::De => "DE",
            Region::Hk => "HK",
        }
    }

    /// Unknown codes fall back to the US site.
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        match raw.map(|r| r.trim().to_ascii_uppercase()).as_deref() {
            Some("UK" | "GB") => Region::Uk,
            Some("CA") => Region::Ca,
            Some("AU") => Region::Au,
            Some("SG") => Region::Sg,
            Some("DE") => Region::De,
            Some("HK") => Region::Hk,
            _ => Region::Us,
        }
    }
}

/// Raw search parameters as a caller submits them (query string, CLI flags).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    pub title: String,
    pub location: String,
    pub max_jobs: Option<String>,
    pub seniority: Option<String>,
    pub region: Option<String>,
    pub source: Option<String>,
}

/// Validated, immutable search criteria.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchRequest {
    pub title: String,
    pub location: String,
    pub max_jobs: usize,
    pub seniority: Option<Seniority>,
    pub region: Region,
    pub source: JobSource,
}

#[cfg(test)]
impl SearchRequest {
    pub fn new(title: impl Into<String>, location: impl Into<String>, max_jobs: i64) -> Self {
        Self {
            title: title.into().trim().to_string(),
            location: location.into().trim().to_string(),
            max_jobs: clamp_max_jobs(max_jobs),
            seniority: None,
            region: Region::default(),
            source: JobSource::default(),
        }
    }

    pub fn with_seniority(mut self, seniority: Option<Seniority>) -> Self {
        self.seniority = seniority;
        self
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.region = region;
        self
    }

    pub fn with_source(mut self, source: JobSource) -> Self {
        self.source = source;
        self
    }
}

impl From<SearchParams> for SearchRequest {
    fn from(params: SearchParams) -> Self {
        let max_jobs = parse_max_jobs(params.max_jobs.as_deref());
        SearchRequest {
            title: params.title.trim().to_string(),
            location: params.location.trim().to_string(),
            max_jobs,
            seniority: params.seniority.as_deref().and_then(Seniority::parse),
            region: Region::parse_or_default(params.region.as_deref()),
            source: JobSource::parse_or_default(params.source.as_deref()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_keeps_values_in_range() {
        for x in 1..=50 {
            assert_eq!(clamp_max_jobs(x), x as usize);
        }
    }

    #[test]
    fn clamp_defaults_out_of_range() {
        for x in [-3, 0, 51, 1000, i64::MIN, i64::MAX] {
            assert_eq!(clamp_max_jobs(x), 50, "input {x}");
        }
    }

    #[test]
    fn clamp_is_idempotent() {
        for x in [-3, 0, 1, 7, 50, 51, 99] {
            let once = clamp_max_jobs(x);
            assert_eq!(clamp_max_jobs(once as i64), once);
        }
    }

    #[test]
    fn unparseable_max_jobs_uses_default() {
        assert_eq!(parse_max_jobs(Some("ten")), 50);
        assert_eq!(parse_max_jobs(Some("")), 50);
        assert_eq!(parse_max_jobs(None), 50);
        assert_eq!(parse_max_jobs(Some(" 12 ")), 12);
        assert_eq!(parse_max_jobs(Some("-3")), 50);
    }

    #[test]
    fn params_convert_with_defaults() {
        let request = SearchRequest::from(SearchParams {
            title: " Risk Manager ".to_string(),
            location: "New York".to_string(),
            max_jobs: Some("5".to_string()),
            seniority: Some("VP".to_string()),
            region: Some("gb".to_string()),
            source: Some("monster".to_string()),
        });
        assert_eq!(request.title, "Risk Manager");
        assert_eq!(request.max_jobs, 5);
        assert_eq!(request.seniority, Some(Seniority::Vp));
        assert_eq!(request.region, Region::Uk);
        assert_eq!(request.source, JobSource::PrimarySite);
    }

    #[test]
    fn unknown_seniority_means_no_filter() {
        assert_eq!(Seniority::parse("wizard"), None);
        assert_eq!(Seniority::parse(""), None);
        assert_eq!(Seniority::parse("director"), Some(Seniority::Director));
    }
}
