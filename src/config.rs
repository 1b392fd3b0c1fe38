use std::time::Duration;

use clap::Parser;

use crate::browser::LaunchOptions;
use crate::models::search::SearchParams;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/137.0.0.0 Safari/537.36";

#[derive(Parser, Debug, Clone)]
#[command(name = "jobsearch", about = "Multi-source job search service")]
pub struct Config {
    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    pub log_json: bool,

    /// Seconds to wait for a page load
    #[arg(long, env = "PAGE_LOAD_TIMEOUT_SECS", default_value = "60")]
    pub page_load_timeout_secs: u64,

    /// Seconds to wait for an element to appear
    #[arg(long, env = "ELEMENT_TIMEOUT_SECS", default_value = "15")]
    pub element_timeout_secs: u64,

    /// Interval between readiness checks, in milliseconds
    #[arg(long, env = "POLL_INTERVAL_MS", default_value = "500")]
    pub poll_interval_ms: u64,

    /// Description length (characters) considered fully rendered
    #[arg(long, env = "DESCRIPTION_MIN_CHARS", default_value = "500")]
    pub description_min_chars: usize,

    /// Seconds to wait for a description to reach its minimum length
    #[arg(long, env = "DESCRIPTION_TIMEOUT_SECS", default_value = "15")]
    pub description_timeout_secs: u64,

    /// Maximum "show more" clicks per search
    #[arg(long, env = "MAX_PAGINATION_ATTEMPTS", default_value = "5")]
    pub max_pagination_attempts: u32,

    /// Extra links gathered beyond max_jobs to absorb invalid postings
    #[arg(long, env = "PAGINATION_BUFFER", default_value = "10")]
    pub pagination_buffer: usize,

    /// HTTP request timeout in seconds
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value = "30")]
    pub http_timeout_secs: u64,

    /// Base delay before retrying a failed API request, in milliseconds
    #[arg(long, env = "API_RETRY_DELAY_MS", default_value = "500")]
    pub api_retry_delay_ms: u64,

    /// Pause between detail-page fetches, in milliseconds
    #[arg(long, env = "DETAIL_FETCH_DELAY_MS", default_value = "1000")]
    pub detail_fetch_delay_ms: u64,

    /// Fetch each API result's own page for a longer description
    #[arg(long, env = "FETCH_FULL_DESCRIPTIONS", default_value = "true")]
    pub fetch_full_descriptions: bool,

    /// Careerjet affiliate id
    #[arg(long, env = "CAREERJET_AFFID", default_value = "")]
    pub careerjet_affid: String,

    /// User agent for browser sessions and HTTP requests
    #[arg(long, env = "USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Chromium executable; autodetected when unset
    #[arg(long, env = "CHROME_PATH")]
    pub chrome_path: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(clap::Subcommand, Debug, Clone)]
pub enum Command {
    /// Start the web server (default when no subcommand given)
    Serve {
        /// Listen address
        #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8080")]
        listen_addr: String,
    },
    /// Run one search and print the outcome as JSON
    Search {
        #[arg(long)]
        title: String,

        #[arg(long, default_value = "")]
        location: String,

        /// 1-50; anything else means 50
        #[arg(long, allow_hyphen_values = true)]
        max_jobs: Option<String>,

        /// intern, junior, analyst, associate, avp, vp, svp, director, md, csuite
        #[arg(long)]
        seniority: Option<String>,

        /// US, UK, CA, AU, SG, DE, HK
        #[arg(long)]
        region: Option<String>,

        /// efinancialcareers or careerjet
        #[arg(long)]
        source: Option<String>,

        /// Print a plain-text listing instead of JSON
        #[arg(long)]
        text: bool,
    },
}

impl Command {
    /// Search parameters for the `search` subcommand.
    pub fn search_params(&self) -> Option<SearchParams> {
        match self {
            Command::Search {
                title,
                location,
                max_jobs,
                seniority,
                region,
                source,
                ..
            } => Some(SearchParams {
                title: title.clone(),
                location: location.clone(),
                max_jobs: max_jobs.clone(),
                seniority: seniority.clone(),
                region: region.clone(),
                source: source.clone(),
            }),
            Command::Serve { .. } => None,
        }
    }
}

impl Config {
    /// Resolve the command, defaulting to Serve if none specified.
    pub fn resolved_command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve {
            listen_addr: std::env::var("LISTEN_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
        })
    }

    pub fn retrieval_settings(&self) -> RetrievalSettings {
        RetrievalSettings {
            page_load_timeout: Duration::from_secs(self.page_load_timeout_secs),
            element_timeout: Duration::from_secs(self.element_timeout_secs),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            description_min_chars: self.description_min_chars,
            description_timeout: Duration::from_secs(self.description_timeout_secs),
            max_pagination_attempts: self.max_pagination_attempts,
            pagination_buffer: self.pagination_buffer,
            http_timeout: Duration::from_secs(self.http_timeout_secs),
            api_retry_delay: Duration::from_millis(self.api_retry_delay_ms),
            detail_fetch_delay: Duration::from_millis(self.detail_fetch_delay_ms),
            fetch_full_descriptions: self.fetch_full_descriptions,
            careerjet_affid: self.careerjet_affid.clone(),
            user_agent: self.user_agent.clone(),
        }
    }

    pub fn launch_options(&self) -> LaunchOptions {
        LaunchOptions {
            user_agent: self.user_agent.clone(),
            executable: self.chrome_path.clone(),
            ..LaunchOptions::default()
        }
    }
}

/// Timeouts, budgets and provider identity consumed by the retrieval core.
#[derive(Debug, Clone)]
pub struct RetrievalSettings {
    pub page_load_timeout: Duration,
    pub element_timeout: Duration,
    pub poll_interval: Duration,
    pub description_min_chars: usize,
    pub description_timeout: Duration,
    pub max_pagination_attempts: u32,
    pub pagination_buffer: usize,
    pub http_timeout: Duration,
    pub api_retry_delay: Duration,
    pub detail_fetch_delay: Duration,
    pub fetch_full_descriptions: bool,
    pub careerjet_affid: String,
    pub user_agent: String,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            page_load_timeout: Duration::from_secs(60),
            element_timeout: Duration::from_secs(15),
            poll_interval: Duration::from_millis(500),
            description_min_chars: 500,
            description_timeout: Duration::from_secs(15),
            max_pagination_attempts: 5,
            pagination_buffer: 10,
            http_timeout: Duration::from_secs(30),
            api_retry_delay: Duration::from_millis(500),
            detail_fetch_delay: Duration::from_secs(1),
            fetch_full_descriptions: true,
            careerjet_affid: String::new(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[cfg(test)]
impl RetrievalSettings {
    /// Millisecond-scale waits so scripted sessions finish instantly.
    pub fn fast() -> Self {
        Self {
            page_load_timeout: Duration::from_millis(50),
            element_timeout: Duration::from_millis(20),
            poll_interval: Duration::from_millis(1),
            description_min_chars: 40,
            description_timeout: Duration::from_millis(10),
            detail_fetch_delay: Duration::from_millis(1),
            http_timeout: Duration::from_secs(5),
            api_retry_delay: Duration::from_millis(1),
            ..Self::default()
        }
    }
}
