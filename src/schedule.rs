//! Schedule-API client: the single integration point for flight-schedule
//! lookups.
//!
//! Wraps the external API with two gates, checked in order:
//!
//! 1. a hard monthly call ceiling, persisted across restarts by
//!    [`QuotaStore`];
//! 2. a short-term per-identifier response cache, held in memory for the
//!    life of the process.
//!
//! A fetch that fails (transport error, non-2xx, timeout) yields `None` and
//! touches neither the cache nor the quota. The quota itself is charged by
//! the orchestrator through [`ScheduleClient::charge`] once it has confirmed
//! the response held usable data, not by `fetch`.

use crate::airports::{AirportDirectory, AirportInfo};
use crate::quota::{QuotaError, QuotaStore};
use crate::types::{AircraftSize, AirportRef, FlightDetail, FlightsResponse, RouteEnd};
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Countries whose airports are displayed as the city alone, without the
/// country name appended.
const HOME_DISPLAY_COUNTRIES: [&str; 2] = [
    "United States of America",
    "United Kingdom of Great Britain and Northern Ireland",
];

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("API key is not a valid header value")]
    InvalidApiKey,
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("schedule API returned status {status}")]
    ServerError { status: StatusCode },
}

/// Configuration for the schedule client.
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    pub base_url: String,
    /// Tracked and reported per run, never enforced as a gate; only
    /// `monthly_limit` blocks calls.
    pub max_calls_per_run: u32,
    /// How long a cached response stays fresh
    pub cache_duration: chrono::Duration,
    /// Hard ceiling on billable calls per calendar month
    pub monthly_limit: u32,
    pub timeout: Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            base_url: "https://aeroapi.flightaware.com/aeroapi".to_string(),
            max_calls_per_run: 5,
            cache_duration: chrono::Duration::minutes(15),
            monthly_limit: 3000,
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    cached_at: DateTime<Utc>,
    payload: FlightsResponse,
}

/// Quota- and cache-gated client for the schedule API.
///
/// Owns the quota store and the cache mapping; callers construct one
/// instance and pass it explicitly rather than sharing ambient state.
pub struct ScheduleClient {
    client: Client,
    config: ScheduleConfig,
    quota: QuotaStore,
    cache: HashMap<String, CacheEntry>,
    calls_this_run: u32,
}

impl ScheduleClient {
    pub fn new(
        api_key: &str,
        quota: QuotaStore,
        config: ScheduleConfig,
    ) -> Result<Self, ScheduleError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-apikey",
            HeaderValue::from_str(api_key).map_err(|_| ScheduleError::InvalidApiKey)?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            config,
            quota,
            cache: HashMap::new(),
            calls_this_run: 0,
        })
    }

    /// Look up schedule data for a flight identifier.
    ///
    /// Returns `None` when the monthly limit is reached (no network call),
    /// and on any request failure; both are soft conditions the caller
    /// treats as "no data this cycle". A fresh cache entry is served
    /// without a network call. Failures never mutate cache or quota.
    pub async fn fetch(&mut self, ident: &str) -> Option<FlightsResponse> {
        if self.quota.calls() >= self.config.monthly_limit {
            tracing::info!(
                "monthly API call limit ({}) reached, skipping lookup for {}",
                self.config.monthly_limit,
                ident
            );
            return None;
        }

        let now = Utc::now();
        if let Some(entry) = self.cache.get(ident) {
            if now - entry.cached_at < self.config.cache_duration {
                tracing::debug!("using cached schedule data for {}", ident);
                return Some(entry.payload.clone());
            }
        }

        match self.request(ident, now).await {
            Ok(payload) => {
                self.cache.insert(
                    ident.to_string(),
                    CacheEntry {
                        cached_at: now,
                        payload: payload.clone(),
                    },
                );
                self.calls_this_run += 1;
                Some(payload)
            }
            Err(e) => {
                tracing::warn!("schedule lookup failed for {}: {}", ident, e);
                None
            }
        }
    }

    /// Issue the actual API request for a fixed window from two hours
    /// before now to one hour after (UTC).
    async fn request(
        &self,
        ident: &str,
        now: DateTime<Utc>,
    ) -> Result<FlightsResponse, ScheduleError> {
        let start = (now - chrono::Duration::hours(2))
            .format("%Y-%m-%dT%H:%M:%SZ")
            .to_string();
        let end = (now + chrono::Duration::hours(1))
            .format("%Y-%m-%dT%H:%M:%SZ")
            .to_string();

        let url = format!("{}/flights/{}", self.config.base_url, ident);
        tracing::debug!("requesting {} ({} .. {})", url, start, end);

        let response = self
            .client
            .get(&url)
            .query(&[("start", start.as_str()), ("end", end.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScheduleError::ServerError { status });
        }

        Ok(response.json().await?)
    }

    /// Charge one billable call against the monthly quota and persist the
    /// new count. Deliberately separate from `fetch`: the orchestrator
    /// charges only after confirming the response contained flight data.
    pub fn charge(&mut self) -> Result<(), QuotaError> {
        self.quota.increment()
    }

    /// Billable network calls issued during this run.
    pub fn calls_this_run(&self) -> u32 {
        self.calls_this_run
    }

    /// Billable calls charged this calendar month.
    pub fn monthly_calls(&self) -> u32 {
        self.quota.calls()
    }

    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }
}

#[cfg(test)]
impl ScheduleClient {
    fn seed_cache(&mut self, ident: &str, cached_at: DateTime<Utc>, payload: FlightsResponse) {
        self.cache.insert(
            ident.to_string(),
            CacheEntry { cached_at, payload },
        );
    }
}

/// Normalize the first flight entry of a raw response into a
/// [`FlightDetail`]. Pure with respect to selection: callers wanting a
/// specific entry (e.g. the one closest to now) pre-select before calling.
/// Returns `None` when the response has no flight entries.
pub fn extract_detail(
    response: &FlightsResponse,
    airports: &AirportDirectory,
) -> Option<FlightDetail> {
    let flight = response.flights.first()?;
    let now = Utc::now();

    let time_in_air = flight.estimated_off.map(|off| now - off);

    let departure_estimate = flight.estimated_out.or(flight.actual_out);
    let is_delayed = match (flight.scheduled_out, departure_estimate) {
        (Some(scheduled), Some(estimated)) => estimated > scheduled,
        _ => false,
    };

    let total_seats = flight.seats_cabin_business.unwrap_or(0)
        + flight.seats_cabin_coach.unwrap_or(0)
        + flight.seats_cabin_first.unwrap_or(0);

    Some(FlightDetail {
        callsign: flight.ident.clone(),
        origin: route_end(flight.origin.as_ref(), airports),
        destination: route_end(flight.destination.as_ref(), airports),
        operator: flight.operator.clone(),
        aircraft_type: flight.aircraft_type.clone(),
        status: flight.status.clone(),
        scheduled_out: flight.scheduled_out,
        estimated_out: flight.estimated_out,
        actual_out: flight.actual_out,
        scheduled_in: flight.scheduled_in,
        estimated_in: flight.estimated_in,
        actual_in: flight.actual_in,
        is_delayed,
        time_in_air,
        total_seats,
        aircraft_size: AircraftSize::from_seats(total_seats),
        filed_airspeed: flight.filed_airspeed,
        route_distance: flight.route_distance,
    })
}

fn route_end(reference: Option<&AirportRef>, airports: &AirportDirectory) -> RouteEnd {
    let code = reference.and_then(|r| r.code.clone());
    let info = match code.as_deref() {
        Some(c) => airports.lookup(c),
        None => AirportInfo::unknown(),
    };

    let display = if HOME_DISPLAY_COUNTRIES.contains(&info.country_name.as_str()) {
        info.municipality.clone()
    } else {
        format!("{}, {}", info.municipality, info.country_name)
    };

    RouteEnd {
        code,
        city: info.municipality,
        country: info.country_name,
        iso_country: info.iso_country,
        display,
    }
}
