//! HTTP client for the live aircraft-state feed.

use crate::types::StateVector;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("feed returned error status: {status}")]
    ServerError { status: StatusCode },
}

/// Geographic rectangle defined by its south-west and north-east corners.
#[derive(Debug, Clone, Copy)]
pub struct BoundingBox {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl BoundingBox {
    /// Roughly ten miles in each direction around O'Hare.
    pub const OHARE: Self = Self {
        south: 41.8386,
        west: -88.0848,
        north: 42.1186,
        east: -87.7248,
    };

    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self {
            south,
            west,
            north,
            east,
        }
    }

    fn query_params(&self) -> [(&'static str, f64); 4] {
        [
            ("lamin", self.south),
            ("lomin", self.west),
            ("lamax", self.north),
            ("lomax", self.east),
        ]
    }
}

/// Configuration for the state-feed client.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub base_url: String,
    /// Request timeout; a timed-out fetch is a plain request failure
    pub timeout: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: "https://opensky-network.org/api".to_string(),
            timeout: Duration::from_secs(15),
        }
    }
}

/// Client for the aircraft-state feed.
pub struct StateFeed {
    client: Client,
    config: FeedConfig,
}

/// Wire shape of the feed response: each state is a positional array.
#[derive(Debug, Deserialize)]
struct StatesResponse {
    #[serde(default)]
    states: Option<Vec<Vec<serde_json::Value>>>,
}

impl StateFeed {
    pub fn new(config: FeedConfig) -> Result<Self, FeedError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    /// Fetch current aircraft states inside the bounding box. An absent or
    /// empty `states` list is a benign empty result, not an error.
    pub async fn fetch_states(&self, bbox: BoundingBox) -> Result<Vec<StateVector>, FeedError> {
        let url = format!("{}/states/all", self.config.base_url);
        tracing::debug!("fetching states: {} {:?}", url, bbox);

        let response = self
            .client
            .get(&url)
            .query(&bbox.query_params())
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let body: StatesResponse = response.json().await?;
                let rows = body.states.unwrap_or_default();
                let states: Vec<StateVector> = rows
                    .iter()
                    .filter_map(|row| StateVector::from_row(row))
                    .collect();
                tracing::debug!("decoded {} of {} state rows", states.len(), rows.len());
                Ok(states)
            }
            status => Err(FeedError::ServerError { status }),
        }
    }
}
