//! Wikipedia-backed measurement source.
//!
//! Pulls the raw wikitext of an article through the MediaWiki API and reads
//! the `radius` and `circumference` fields out of its infobox.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info, warn};

use pizzapi_core::Measurement;

use super::retry::RetryPolicy;
use super::{FetchError, MeasurementSource};

/// Default MediaWiki API endpoint.
pub const DEFAULT_API_URL: &str = "https://en.wikipedia.org/w/api.php";

const DEFAULT_USER_AGENT: &str = "PizzaPiCalculator/1.0 (educational project)";

/// Settings for [`WikipediaSource`].
#[derive(Debug, Clone)]
pub struct WikipediaConfig {
    pub api_url: String,
    pub timeout: Duration,
    pub user_agent: String,
    pub retry: RetryPolicy,
}

impl Default for WikipediaConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(10),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

impl WikipediaConfig {
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Measurement source reading Wikipedia infoboxes.
#[derive(Debug, Clone)]
pub struct WikipediaSource {
    client: Client,
    api_url: String,
    retry: RetryPolicy,
}

impl WikipediaSource {
    pub fn new(config: WikipediaConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url,
            retry: config.retry,
        })
    }

    async fn fetch_once(&self, name: &str) -> Result<Measurement, FetchError> {
        let content = self.fetch_wikitext(name).await?;
        parse_measurement(name, &content)
    }

    async fn fetch_wikitext(&self, title: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("action", "query"),
                ("prop", "revisions"),
                ("rvprop", "content"),
                ("rvslots", "main"),
                ("titles", title),
                ("format", "json"),
                ("formatversion", "2"),
            ])
            .send()
            .await
            .map_err(|e| request_error(title, e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(title.to_string()));
        }
        if status.is_server_error() {
            return Err(FetchError::Http {
                name: title.to_string(),
                reason: format!("HTTP {status}"),
            });
        }
        if !status.is_success() {
            return Err(FetchError::Malformed {
                name: title.to_string(),
                reason: format!("HTTP {status}"),
            });
        }

        let body: QueryResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(title.to_string())
            } else {
                FetchError::Malformed {
                    name: title.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        body.into_content()
            .ok_or_else(|| FetchError::NotFound(title.to_string()))
    }
}

fn request_error(title: &str, err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout(title.to_string())
    } else {
        FetchError::Http {
            name: title.to_string(),
            reason: err.to_string(),
        }
    }
}

#[async_trait]
impl MeasurementSource for WikipediaSource {
    async fn fetch(&self, name: &str) -> Result<Measurement, FetchError> {
        info!(object = %name, "fetching measurement");
        let mut retries = 0;

        loop {
            match self.fetch_once(name).await {
                Err(e) if e.is_transient() && self.retry.should_retry(retries) => {
                    retries += 1;
                    let delay = self.retry.delay_for_retry(retries);
                    warn!(object = %name, error = %e, retry = retries, ?delay, "transient fetch failure, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    warn!(object = %name, error = %e, "fetch failed");
                    return Err(e);
                }
                Ok(m) => {
                    debug!(object = %name, radius_km = m.radius_km, circumference_km = m.circumference_km, "fetched measurement");
                    return Ok(m);
                }
            }
        }
    }
}

// -- MediaWiki response (formatversion=2) --

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    query: Option<QueryBody>,
}

#[derive(Debug, Deserialize)]
struct QueryBody {
    #[serde(default)]
    pages: Vec<Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    revisions: Vec<Revision>,
}

#[derive(Debug, Deserialize)]
struct Revision {
    #[serde(default)]
    slots: Option<Slots>,
}

#[derive(Debug, Deserialize)]
struct Slots {
    main: Option<Slot>,
}

#[derive(Debug, Deserialize)]
struct Slot {
    #[serde(default)]
    content: String,
}

impl QueryResponse {
    /// Wikitext of the first page, if it exists and has content.
    fn into_content(self) -> Option<String> {
        let page = self.query?.pages.into_iter().next()?;
        if page.missing {
            return None;
        }
        let content = page.revisions.into_iter().next()?.slots?.main?.content;
        (!content.is_empty()).then_some(content)
    }
}

// -- Wikitext parsing --

fn infobox_patterns(field: &str) -> Vec<Regex> {
    let prefix = format!(r"(?is)\|\s*[a-z_]*{field}\s*=\s*(?:\n\s*)?");
    [r"\{\{val\s*\|\s*([0-9.,]+)", r"\{\{convert\s*\|\s*([0-9.,]+)", r"([0-9.,]+)\s*(?:&nbsp;)?\s*km"]
        .iter()
        .filter_map(|tail| Regex::new(&format!("{prefix}{tail}")).ok())
        .collect()
}

static RADIUS_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| infobox_patterns("radius"));

static CIRCUMFERENCE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    let mut patterns = infobox_patterns("circumference");
    patterns.extend(
        Regex::new(r"(?is)\|\s*circumference\s*=\s*\{\{unbulleted list[^}]*\n\s*\|\s*\{\{val\s*\|\s*([0-9.,]+)").ok(),
    );
    patterns
});

/// First pattern whose capture parses as a number; thousands separators are
/// ignored.
fn first_number(patterns: &[Regex], content: &str) -> Option<f64> {
    patterns.iter().find_map(|re| {
        re.captures(content)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().replace(',', "").parse::<f64>().ok())
    })
}

pub(crate) fn parse_radius(content: &str) -> Option<f64> {
    first_number(&RADIUS_PATTERNS, content)
}

pub(crate) fn parse_circumference(content: &str) -> Option<f64> {
    first_number(&CIRCUMFERENCE_PATTERNS, content)
}

/// Read a measurement out of article wikitext.
///
/// A missing circumference is a miss: there is no fallback to `2πR`, which
/// would make the estimate circular.
pub fn parse_measurement(name: &str, content: &str) -> Result<Measurement, FetchError> {
    let radius = parse_radius(content).ok_or_else(|| FetchError::MissingRadius(name.to_string()))?;
    let circumference =
        parse_circumference(content).ok_or_else(|| FetchError::MissingCircumference(name.to_string()))?;

    Ok(Measurement::new(name, radius, circumference))
}
