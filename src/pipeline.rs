//! Enrichment pipeline: filters live aircraft states, looks up schedules
//! through the quota-gated client, and merges airport and position data
//! into report-ready records.

use crate::airports::AirportDirectory;
use crate::schedule::{self, ScheduleClient};
use crate::states::{BoundingBox, FeedError, StateFeed};
use crate::types::{FlightsResponse, ScheduledFlight, SightedFlight, StateVector};
use chrono::{DateTime, Local, LocalResult, TimeZone, Utc};

/// Tracks below 45° or above 315° (north-ish) are excluded.
const MIN_HEADING: f64 = 45.0;
const MAX_HEADING: f64 = 315.0;
/// Headings up to here count as departing (eastbound), beyond as arriving.
const DEPARTING_MAX: f64 = 225.0;
/// States with a last contact older than this are stale.
const MAX_CONTACT_AGE_SECS: i64 = 3600;

/// A state vector that survived filtering, with the fields the enrichment
/// stage needs derived up front.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub state: StateVector,
    pub callsign: String,
    pub heading: f64,
    pub departing: bool,
    pub last_contact_local: DateTime<Local>,
}

/// Drop on-ground aircraft, stale contacts, north-bound tracks, and
/// aircraft without a callsign; classify the rest.
pub fn filter_candidates(states: &[StateVector], now_unix: i64) -> Vec<Candidate> {
    let cutoff = now_unix - MAX_CONTACT_AGE_SECS;
    let mut candidates = Vec::new();

    for state in states {
        if state.on_ground || state.last_contact <= cutoff {
            continue;
        }

        let heading = match state.true_track {
            Some(h) if (MIN_HEADING..=MAX_HEADING).contains(&h) => h,
            _ => continue,
        };

        let Some(callsign) = state.callsign.clone() else {
            tracing::info!("no callsign available for aircraft {}", state.icao24);
            continue;
        };

        let last_contact_local = match Local.timestamp_opt(state.last_contact, 0) {
            LocalResult::Single(t) => t,
            _ => continue,
        };

        candidates.push(Candidate {
            callsign,
            heading,
            departing: (MIN_HEADING..=DEPARTING_MAX).contains(&heading),
            last_contact_local,
            state: state.clone(),
        });
    }

    candidates
}

/// Pick the schedule entry whose scheduled departure is nearest to `now`.
/// Entries without a scheduled departure rank last.
pub fn closest_flight(
    flights: &[ScheduledFlight],
    now: DateTime<Utc>,
) -> Option<&ScheduledFlight> {
    flights.iter().min_by_key(|f| {
        f.scheduled_out
            .map(|t| (t - now).num_seconds().abs())
            .unwrap_or(i64::MAX)
    })
}

/// Select the closest schedule entry, normalize it, and merge in the live
/// position. `None` when the response holds no flights.
fn merge_sighting(
    candidate: &Candidate,
    response: &FlightsResponse,
    airports: &AirportDirectory,
    now: DateTime<Utc>,
) -> Option<SightedFlight> {
    let chosen = closest_flight(&response.flights, now)?.clone();
    let selected = FlightsResponse {
        flights: vec![chosen],
    };
    let detail = schedule::extract_detail(&selected, airports)?;

    Some(SightedFlight {
        detail,
        icao24: candidate.state.icao24.clone(),
        latitude: candidate.state.latitude,
        longitude: candidate.state.longitude,
        altitude_m: candidate.state.baro_altitude,
        heading: candidate.heading,
        departing: candidate.departing,
        last_contact_local: candidate.last_contact_local,
    })
}

/// One polling cycle: states in, enriched sightings out.
///
/// Owns every collaborator explicitly; nothing here is process-global.
pub struct Pipeline {
    feed: StateFeed,
    schedule: ScheduleClient,
    airports: AirportDirectory,
    bbox: BoundingBox,
}

impl Pipeline {
    pub fn new(
        feed: StateFeed,
        schedule: ScheduleClient,
        airports: AirportDirectory,
        bbox: BoundingBox,
    ) -> Self {
        Self {
            feed,
            schedule,
            airports,
            bbox,
        }
    }

    /// Fetch states for the bounding box and enrich each qualifying
    /// aircraft in turn, sequentially. Schedule lookups that yield no data
    /// are logged and skipped, never fatal.
    pub async fn run(&mut self) -> Result<Vec<SightedFlight>, FeedError> {
        tracing::info!("fetching flight data");
        let states = self.feed.fetch_states(self.bbox).await?;
        if states.is_empty() {
            tracing::info!("no data received");
            return Ok(Vec::new());
        }

        let candidates = filter_candidates(&states, Utc::now().timestamp());
        tracing::debug!("{} of {} states qualify", candidates.len(), states.len());

        let mut sighted = Vec::new();
        for candidate in &candidates {
            tracing::info!(
                "processing aircraft {} with callsign {}",
                candidate.state.icao24,
                candidate.callsign
            );

            let Some(response) = self.schedule.fetch(&candidate.callsign).await else {
                tracing::info!("no schedule data available for {}", candidate.callsign);
                continue;
            };
            if response.flights.is_empty() {
                tracing::info!("no schedule match for {}", candidate.callsign);
                continue;
            }

            // Usable data confirmed, so this response is billable.
            if let Err(e) = self.schedule.charge() {
                tracing::error!("failed to persist quota charge: {}", e);
            }

            match merge_sighting(candidate, &response, &self.airports, Utc::now()) {
                Some(flight) => sighted.push(flight),
                None => {
                    tracing::info!("no detailed flight information for {}", candidate.callsign)
                }
            }
        }

        Ok(sighted)
    }

    pub fn schedule(&self) -> &ScheduleClient {
        &self.schedule
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn airborne_state(icao24: &str, callsign: Option<&str>, track: Option<f64>) -> StateVector {
        StateVector {
            icao24: icao24.to_string(),
            callsign: callsign.map(String::from),
            last_contact: Utc::now().timestamp() - 60,
            on_ground: false,
            latitude: Some(41.98),
            longitude: Some(-87.90),
            baro_altitude: Some(2800.0),
            velocity: Some(120.0),
            true_track: track,
        }
    }

    #[test]
    fn filter_keeps_eastbound_airborne_aircraft() {
        let now = Utc::now().timestamp();
        let states = vec![airborne_state("a1b2c3", Some("UAL123"), Some(90.0))];

        let candidates = filter_candidates(&states, now);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].callsign, "UAL123");
        assert!(candidates[0].departing);
    }

    #[test]
    fn filter_classifies_westbound_as_arriving() {
        let now = Utc::now().timestamp();
        let states = vec![airborne_state("a1b2c3", Some("UAL123"), Some(270.0))];

        let candidates = filter_candidates(&states, now);
        assert_eq!(candidates.len(), 1);
        assert!(!candidates[0].departing);
    }

    #[test]
    fn filter_drops_north_bound_tracks() {
        let now = Utc::now().timestamp();
        let states = vec![
            airborne_state("a", Some("UAL1"), Some(30.0)),
            airborne_state("b", Some("UAL2"), Some(350.0)),
            airborne_state("c", Some("UAL3"), None),
        ];

        assert!(filter_candidates(&states, now).is_empty());
    }

    #[test]
    fn filter_keeps_heading_span_boundaries() {
        let now = Utc::now().timestamp();
        let states = vec![
            airborne_state("a", Some("UAL1"), Some(45.0)),
            airborne_state("b", Some("UAL2"), Some(315.0)),
        ];

        let candidates = filter_candidates(&states, now);
        assert_eq!(candidates.len(), 2);
        assert!(candidates[0].departing);
        assert!(!candidates[1].departing);
    }

    #[test]
    fn filter_drops_on_ground_and_stale() {
        let now = Utc::now().timestamp();

        let mut grounded = airborne_state("a", Some("UAL1"), Some(90.0));
        grounded.on_ground = true;

        let mut stale = airborne_state("b", Some("UAL2"), Some(90.0));
        stale.last_contact = now - 3700;

        assert!(filter_candidates(&[grounded, stale], now).is_empty());
    }

    #[test]
    fn filter_drops_missing_callsign() {
        let now = Utc::now().timestamp();
        let states = vec![airborne_state("a1b2c3", None, Some(90.0))];

        assert!(filter_candidates(&states, now).is_empty());
    }

    #[test]
    fn closest_flight_picks_nearest_scheduled_out() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let far = ScheduledFlight {
            ident: Some("far".to_string()),
            scheduled_out: Some(Utc.with_ymd_and_hms(2024, 1, 1, 6, 0, 0).unwrap()),
            ..ScheduledFlight::default()
        };
        let near = ScheduledFlight {
            ident: Some("near".to_string()),
            scheduled_out: Some(Utc.with_ymd_and_hms(2024, 1, 1, 11, 50, 0).unwrap()),
            ..ScheduledFlight::default()
        };

        let binding = [far, near];
        let chosen = closest_flight(&binding, now).unwrap();
        assert_eq!(chosen.ident.as_deref(), Some("near"));
    }

    #[test]
    fn unscheduled_entries_rank_last() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let unscheduled = ScheduledFlight {
            ident: Some("unscheduled".to_string()),
            ..ScheduledFlight::default()
        };
        let scheduled = ScheduledFlight {
            ident: Some("scheduled".to_string()),
            scheduled_out: Some(Utc.with_ymd_and_hms(2024, 1, 2, 8, 0, 0).unwrap()),
            ..ScheduledFlight::default()
        };

        let binding = [unscheduled, scheduled];
        let chosen = closest_flight(&binding, now).unwrap();
        assert_eq!(chosen.ident.as_deref(), Some("scheduled"));
    }

    #[test]
    fn closest_flight_on_empty_list_is_none() {
        assert!(closest_flight(&[], Utc::now()).is_none());
    }

    #[test]
    fn merge_sighting_carries_live_position() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "ident,iso_country,country_name,municipality").unwrap();
        writeln!(file, "KORD,US,United States of America,Chicago").unwrap();
        let airports = AirportDirectory::load(file.path()).unwrap();

        let now = Utc::now();
        let state = airborne_state("a1b2c3", Some("UAL123"), Some(90.0));
        let candidates = filter_candidates(&[state], now.timestamp());

        let response = FlightsResponse {
            flights: vec![ScheduledFlight {
                ident: Some("UAL123".to_string()),
                scheduled_out: Some(now - chrono::Duration::minutes(20)),
                seats_cabin_coach: Some(160),
                ..ScheduledFlight::default()
            }],
        };

        let sighting = merge_sighting(&candidates[0], &response, &airports, now).unwrap();
        assert_eq!(sighting.icao24, "a1b2c3");
        assert_eq!(sighting.heading, 90.0);
        assert!(sighting.departing);
        assert_eq!(sighting.latitude, Some(41.98));
        assert_eq!(sighting.detail.callsign.as_deref(), Some("UAL123"));
        assert_eq!(sighting.detail.total_seats, 160);
    }

    #[test]
    fn merge_sighting_on_empty_response_is_none() {
        let now = Utc::now();
        let state = airborne_state("a1b2c3", Some("UAL123"), Some(90.0));
        let candidates = filter_candidates(&[state], now.timestamp());

        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "ident,iso_country,country_name,municipality").unwrap();
        let airports = AirportDirectory::load(file.path()).unwrap();

        let response = FlightsResponse { flights: vec![] };
        assert!(merge_sighting(&candidates[0], &response, &airports, now).is_none());
    }
}
