use reqwest::blocking::Client;
use std::time::Duration;
use tracing::{debug, info};

use super::record::{Page, RawRecord};
use super::Fetch;
use crate::error::{Result, SyncError};

pub const API_URL: &str = "https://datamall2.mytransport.sg/ltaodataservice/CarParkAvailabilityv2";

/// DataMall returns at most this many rows per request.
pub const PAGE_SIZE: usize = 500;

/// Only rows published under this agency belong to the mall feed.
pub const AGENCY: &str = "LTA";

const TIMEOUT: Duration = Duration::from_secs(30);

/// One page of the upstream feed, addressed by row offset.
pub trait PageSource {
    fn page(&self, skip: usize) -> Result<Vec<RawRecord>>;
}

/// Walk every page until a short one, then keep only this feed's agency.
///
/// Any failing page fails the whole fetch; no partial result is returned.
pub fn fetch_all(source: &impl PageSource) -> Result<Vec<RawRecord>> {
    let mut rows = Vec::new();
    let mut skip = 0;
    let mut pages = 0;

    loop {
        let batch = source.page(skip)?;
        let len = batch.len();
        pages += 1;
        debug!(skip, rows = len, "fetched page");
        rows.extend(batch);

        if len < PAGE_SIZE {
            break;
        }
        skip += PAGE_SIZE;
    }

    let total = rows.len();
    rows.retain(|r| r.is_agency(AGENCY));
    info!(pages, total, kept = rows.len(), "fetched feed");
    Ok(rows)
}

/// Parse one response body into its records.
pub fn parse_page(body: &str, origin: &str) -> Result<Vec<RawRecord>> {
    let page: Page = serde_json::from_str(body).map_err(|source| SyncError::MalformedPayload {
        origin: origin.to_string(),
        source,
    })?;
    Ok(page.value)
}

pub struct FeedClient {
    client: Client,
    url: String,
    api_key: String,
}

impl FeedClient {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent("carpark-sync")
            .timeout(TIMEOUT)
            .build()
            .map_err(SyncError::HttpClient)?;
        Ok(Self {
            client,
            url: url.into(),
            api_key: api_key.into(),
        })
    }

    fn page_url(&self, skip: usize) -> String {
        if skip == 0 {
            self.url.clone()
        } else {
            format!("{}?$skip={}", self.url, skip)
        }
    }
}

impl PageSource for FeedClient {
    fn page(&self, skip: usize) -> Result<Vec<RawRecord>> {
        let url = self.page_url(skip);
        let response = self
            .client
            .get(&url)
            .header("AccountKey", &self.api_key)
            .header("accept", "application/json")
            .send()
            .map_err(|source| SyncError::FetchRequest {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::FetchStatus {
                url,
                status: status.as_u16(),
            });
        }

        let body = response.text().map_err(|source| SyncError::FetchRequest {
            url: url.clone(),
            source,
        })?;
        parse_page(&body, &url)
    }
}

impl Fetch for FeedClient {
    fn fetch(&self) -> Result<Vec<RawRecord>> {
        fetch_all(self)
    }
}
