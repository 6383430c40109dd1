use crate::config::FleetwatchConfig;
use crate::model::{EntitySummary, SummaryStats};
use std::fmt;
use tracing::debug;

/// Snapshot fetch errors
#[derive(Debug, Clone, PartialEq)]
pub enum FetchError {
    /// Network/connection failure or non-success HTTP status
    Transport(String),
    /// Well-delivered but malformed payload
    Decode(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Transport(e) => write!(f, "snapshot transport failure: {}", e),
            FetchError::Decode(e) => write!(f, "snapshot payload malformed: {}", e),
        }
    }
}

impl std::error::Error for FetchError {}

/// Pulls the periodic top-N summary set.
///
/// No internal retry: any failure means "no update this tick" to the
/// caller, and the next poll tick retries implicitly.
pub struct SnapshotClient {
    http: reqwest::Client,
    top_metrics_url: String,
    summary_stats_url: String,
}

impl SnapshotClient {
    pub fn new(config: &FleetwatchConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            top_metrics_url: config.api.endpoint_url("metrics/top10"),
            summary_stats_url: format!(
                "{}?limit={}",
                config.api.endpoint_url("summary-stats"),
                config.poll.top_n_limit
            ),
        }
    }

    /// Fetch the ranked top-N summary set, server order preserved
    pub async fn fetch_top_metrics(&self) -> Result<Vec<EntitySummary>, FetchError> {
        self.fetch_json(&self.top_metrics_url).await
    }

    /// Fetch the position-free summary rows
    pub async fn fetch_summary_stats(&self) -> Result<Vec<SummaryStats>, FetchError> {
        self.fetch_json(&self.summary_stats_url).await
    }

    async fn fetch_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<T, FetchError> {
        debug!(url = %url, "Fetching snapshot");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?
            .error_for_status()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        serde_json::from_str(&body).map_err(|e| FetchError::Decode(e.to_string()))
    }
}
