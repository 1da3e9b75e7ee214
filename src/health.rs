//! The portal health-page contract and the HTTP client that fetches it.
//!
//! Every deployed portal serves `/health?format=json`, which is the authoritative
//! record of the buckets and Elasticsearch endpoint it was configured with. Bucket
//! derivation prefers this page over templated names whenever a portal URL is known.

use crate::HealthMediator;
use async_trait::async_trait;
use serde::Deserialize;
use snafu::{ResultExt, Snafu};

type Result<T> = std::result::Result<T, Error>;

/// The error type for this module.
#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("Failed to build HTTP client: {}", source))]
    BuildClient { source: reqwest::Error },

    #[snafu(display("Failed to decode health page from {}: {}", url, source))]
    DecodeHealthPage { url: String, source: reqwest::Error },

    #[snafu(display("Failed to fetch health page from {}: {}", url, source))]
    FetchHealthPage { url: String, source: reqwest::Error },

    #[snafu(display("Health page request to {} returned an error status: {}", url, source))]
    HealthPageStatus { url: String, source: reqwest::Error },
}

impl From<Error> for crate::Error {
    fn from(e: Error) -> Self {
        crate::Error::new(e)
    }
}

/// The portion of a portal's health page this crate consumes. The four core
/// bucket keys are required, as portals have always published them; the rest
/// arrived later and are optional. Unknown keys are ignored.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct HealthPage {
    #[serde(default)]
    pub beanstalk_env: Option<String>,
    #[serde(default)]
    pub elasticsearch: Option<String>,
    pub system_bucket: String,
    pub processed_file_bucket: String,
    pub file_upload_bucket: String,
    pub blob_bucket: String,
    #[serde(default)]
    pub metadata_bundles_bucket: Option<String>,
    #[serde(default)]
    pub tibanna_cwls_bucket: Option<String>,
    #[serde(default)]
    pub tibanna_output_bucket: Option<String>,
    #[serde(default)]
    pub s3_encrypt_key_id: Option<String>,
}

/// Fetches health pages over plain HTTPS with `reqwest`. No retries; a portal
/// that cannot serve its health page is treated as misconfigured.
pub struct HttpHealthMediator {
    client: reqwest::Client,
}

impl HttpHealthMediator {
    pub fn new() -> crate::Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context(self::BuildClient)?;
        Ok(HttpHealthMediator { client })
    }
}

#[async_trait]
impl HealthMediator for HttpHealthMediator {
    async fn fetch_health_page(&self, portal_url: &str) -> crate::Result<HealthPage> {
        let url = format!("{}/health?format=json", portal_url.trim_end_matches('/'));
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .context(self::FetchHealthPage { url: url.as_str() })?
            .error_for_status()
            .context(self::HealthPageStatus { url: url.as_str() })?;
        let page = resp
            .json()
            .await
            .context(self::DecodeHealthPage { url: url.as_str() })?;
        Ok(page)
    }
}
