use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info};

use crate::classify::ingest_programs;
use crate::config::Endpoints;
use crate::error::{FeedParseError, NetworkError, Result};
use crate::models::{EventItem, FeedItem, Stats, UserId};
use crate::parser::parse_feed;

#[derive(Debug, Deserialize)]
struct HackathonsResponse {
    data: Vec<EventItem>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StatsResponse {
    Wrapped { data: Stats },
    Bare(Stats),
}

/// One GET per call, no retries, nothing cached between calls.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    endpoints: Endpoints,
}

impl Fetcher {
    pub fn new(endpoints: Endpoints) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("hackdeck/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self { client, endpoints })
    }

    async fn get(&self, url: &str, query: &[(&str, String)]) -> Result<reqwest::Response> {
        info!(%url, "fetching");
        let response = self.client.get(url).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::Status(status.as_u16()).into());
        }
        Ok(response)
    }

    /// Body of a successful response as text.
    pub async fn fetch_text(&self, url: &str) -> Result<String> {
        Ok(self.get(url, &[]).await?.text().await?)
    }

    async fn fetch_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T> {
        let bytes = self.get(url, query).await?.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|err| FeedParseError::Json(err).into())
    }

    pub async fn fetch_hackathons(&self) -> Result<Vec<EventItem>> {
        let response: HackathonsResponse = self.fetch_json(&self.endpoints.hackathons, &[]).await?;
        debug!(count = response.data.len(), "hackathons decoded");
        Ok(response.data)
    }

    /// Coding stats for `user`, optionally counted from `since`.
    pub async fn fetch_stats(&self, user: &UserId, since: Option<NaiveDate>) -> Result<Stats> {
        let url = self.endpoints.stats_url(user.as_str());
        let query: Vec<(&str, String)> = since
            .map(|date| ("start_date", date.format("%Y-%m-%d").to_string()))
            .into_iter()
            .collect();
        let stats = match self.fetch_json::<StatsResponse>(&url, &query).await? {
            StatsResponse::Wrapped { data } => data,
            StatsResponse::Bare(stats) => stats,
        };
        debug!(username = %stats.username, languages = stats.languages.len(), "stats decoded");
        Ok(stats)
    }

    /// Fetches the program feed and normalizes it, fixing `is_passed` at `now`.
    pub async fn fetch_programs(&self, now: DateTime<Utc>) -> Result<Vec<FeedItem>> {
        let body = self.get(&self.endpoints.programs, &[]).await?.bytes().await?;
        let raw = parse_feed(&body)?;
        let items = ingest_programs(raw, now)?;
        debug!(count = items.len(), "programs ingested");
        Ok(items)
    }
}
