pub mod embedded;
pub mod html;
pub mod predictions;

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::debug;

use crate::config::{ExtractorKind, USER_AGENT};
use crate::error::Result;
use crate::types::ExtractedRecord;

pub use embedded::EmbeddedJsonExtractor;
pub use html::HtmlExtractor;

/// Turns one day's results page into raw match records.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn fetch(&self, date: NaiveDate) -> Result<Vec<ExtractedRecord>>;
}

/// Thin wrapper over `reqwest::Client` with a browser User-Agent and request timeout.
#[derive(Clone)]
pub struct PageClient {
    client: reqwest::Client,
}

impl PageClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    /// Body of `url`. Network errors and non-2xx statuses are both `FetchFailure`.
    pub async fn get_text(&self, url: &str) -> Result<String> {
        debug!("Fetching {url}");
        let resp = self.client.get(url).send().await?.error_for_status()?;
        Ok(resp.text().await?)
    }
}

/// `{base}/soccer/2025-08-23`
pub fn results_url(base_url: &str, date: NaiveDate) -> String {
    format!("{}/soccer/{}", base_url, date.format("%Y-%m-%d"))
}

pub fn build_extractor(
    kind: ExtractorKind,
    client: PageClient,
    base_url: &str,
) -> Result<Box<dyn Extractor>> {
    Ok(match kind {
        ExtractorKind::Html => Box::new(HtmlExtractor::new(client, base_url)?),
        ExtractorKind::Json => Box::new(EmbeddedJsonExtractor::new(client, base_url)?),
    })
}
