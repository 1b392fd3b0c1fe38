use serde::{Deserialize, Serialize};

use crate::models::job::JobRecord;

/// Why a search could not produce a job list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// An external page or response never became ready in time.
    Timeout,
    /// Anti-bot interstitial or challenge detected.
    Blocked,
    /// Connection, DNS or HTTP-layer failure.
    NetworkError,
    /// Expected page structure or response shape not found.
    ParseError,
    /// The search ran but the provider reports no matches.
    NoResults,
    Unknown,
}

impl ErrorKind {
    /// Non-technical notice shown to the user, with a suggested remedy.
    pub fn user_message(&self) -> &'static str {
        match self {
            ErrorKind::Timeout => {
                "The job site is taking longer than usual to respond. Please try again with fewer results (5-10 jobs) or try a different location."
            }
            ErrorKind::Blocked => {
                "The job site is temporarily refusing automated searches. Please wait a few minutes and try again, or switch to a different job source."
            }
            ErrorKind::NetworkError => {
                "We couldn't reach the job site right now. Please check back in a few minutes and try again."
            }
            ErrorKind::ParseError => {
                "The job site has changed its layout and we couldn't read the results. Please try a different job source while we look into it."
            }
            ErrorKind::NoResults => {
                "No jobs matched your search. Try different keywords, a broader location, or remove the seniority filter."
            }
            ErrorKind::Unknown => {
                "We're experiencing technical difficulties. Please try again in a few minutes."
            }
        }
    }
}

/// Uniform, display-safe substitute for a failed search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    #[serde(rename = "error_kind")]
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorRecord {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Record carrying only the canned notice for `kind`.
    pub fn notice(kind: ErrorKind) -> Self {
        Self::new(kind, kind.user_message())
    }
}

/// Result of one orchestrated search: a job list, or exactly one error record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SearchOutcome {
    /// The search ran. An empty list means every candidate was incomplete.
    Jobs { jobs: Vec<JobRecord> },
    /// The search could not run, or the provider reported no matches.
    Error {
        #[serde(serialize_with = "serialize_single")]
        errors: ErrorRecord,
    },
}

impl SearchOutcome {
    pub fn jobs(jobs: Vec<JobRecord>) -> Self {
        SearchOutcome::Jobs { jobs }
    }

    pub fn error(record: ErrorRecord) -> Self {
        SearchOutcome::Error { errors: record }
    }

    pub fn job_list(&self) -> &[JobRecord] {
        match self {
            SearchOutcome::Jobs { jobs } => jobs,
            SearchOutcome::Error { .. } => &[],
        }
    }

    pub fn error_record(&self) -> Option<&ErrorRecord> {
        match self {
            SearchOutcome::Jobs { .. } => None,
            SearchOutcome::Error { errors } => Some(errors),
        }
    }

    pub fn is_no_results(&self) -> bool {
        self.error_record()
            .is_some_and(|e| e.kind == ErrorKind::NoResults)
    }

    /// Terminal rendering: numbered postings with plain-text descriptions, or the error notice.
    pub fn to_text(&self) -> String {
        if let Some(record) = self.error_record() {
            return record.message.clone();
        }
        let jobs = self.job_list();
        if jobs.is_empty() {
            return "No complete job postings were found.".to_string();
        }
        jobs.iter()
            .enumerate()
            .map(|(i, job)| {
                format!(
                    "{}. {} at {}\n   {}\n   {}\n\n{}\n",
                    i + 1,
                    job.title,
                    job.company,
                    job.location,
                    job.link,
                    job.plain_description()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Keeps the wire shape an array while the type holds exactly one record.
fn serialize_single<S>(record: &ErrorRecord, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_seq(std::iter::once(record))
}
