use serde::{Deserialize, Serialize};

use crate::sanitize::html_to_text;

/// Placeholder for a field that could not be extracted.
pub const NOT_FOUND: &str = "[Not Found]";

/// Link used when a posting has no usable URL.
pub const NO_LINK: &str = "#";

/// Shown in place of a missing company name.
pub const COMPANY_PLACEHOLDER: &str = "Company not listed";

/// External provider a record was retrieved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobSource {
    /// Browser-driven job board (eFinancialCareers).
    #[default]
    PrimarySite,
    /// JSON search API (Careerjet).
    ApiSource,
}

impl JobSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobSource::PrimarySite => "efinancialcareers",
            JobSource::ApiSource => "careerjet",
        }
    }

    /// Parse a caller-supplied source name. Unknown or empty names map to the default source.
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::default();
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "careerjet" | "api" | "api_source" => JobSource::ApiSource,
            "efinancialcareers" | "efc" | "primary" | "primary_site" => JobSource::PrimarySite,
            other => {
                if !other.is_empty() {
                    tracing::debug!("Unknown source '{other}', using default");
                }
                Self::default()
            }
        }
    }
}

impl std::fmt::Display for JobSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One retrieved posting in canonical shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub title: String,
    pub company: String,
    pub location: String,
    pub link: String,
    /// Sanitized HTML restricted to the description allow-list.
    pub description: String,
    pub source: JobSource,
}

impl JobRecord {
    /// True when title, location and description all hold real values.
    /// The company field is deliberately not part of this check.
    pub fn is_complete(&self) -> bool {
        ![&self.title, &self.location, &self.description]
            .iter()
            .any(|field| is_missing(field))
    }

    /// Description rendered as plain text, list items as bullets.
    pub fn plain_description(&self) -> String {
        html_to_text(&self.description)
    }
}

/// True for empty values and the extraction sentinel.
pub fn is_missing(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value == NOT_FOUND
}
