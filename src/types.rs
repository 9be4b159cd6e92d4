//! Core data types shared across the feed, schedule, and report layers.

use chrono::{DateTime, Duration, Local, Utc};
use serde::Deserialize;
use std::fmt;

/// One aircraft-state row from the live feed.
///
/// The feed returns each state as a positional JSON array rather than an
/// object; [`StateVector::from_row`] decodes one row, tolerating nulls in
/// any optional slot.
#[derive(Debug, Clone, PartialEq)]
pub struct StateVector {
    /// ICAO 24-bit address, lowercase hex
    pub icao24: String,
    /// Callsign, trimmed; `None` when missing or blank
    pub callsign: Option<String>,
    /// Unix seconds of the last received message
    pub last_contact: i64,
    pub on_ground: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Barometric altitude in meters
    pub baro_altitude: Option<f64>,
    /// Ground speed in m/s
    pub velocity: Option<f64>,
    /// True track in degrees clockwise from north
    pub true_track: Option<f64>,
}

impl StateVector {
    /// Decode a positional state row. Returns `None` when the row is too
    /// short or lacks the required icao24 / last-contact slots.
    pub fn from_row(row: &[serde_json::Value]) -> Option<Self> {
        if row.len() < 11 {
            return None;
        }

        let icao24 = row[0].as_str()?.trim().to_lowercase();
        let callsign = row[1]
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from);
        let last_contact = row[4].as_i64()?;

        Some(Self {
            icao24,
            callsign,
            last_contact,
            on_ground: row[8].as_bool().unwrap_or(false),
            longitude: row[5].as_f64(),
            latitude: row[6].as_f64(),
            baro_altitude: row[7].as_f64(),
            velocity: row[9].as_f64(),
            true_track: row[10].as_f64(),
        })
    }
}

/// Top-level schedule-API response: a list of candidate flight records for
/// one identifier.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlightsResponse {
    #[serde(default)]
    pub flights: Vec<ScheduledFlight>,
}

/// Airport reference nested in a schedule record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AirportRef {
    pub code: Option<String>,
}

/// One raw flight record as returned by the schedule API. Every field the
/// API may omit or null is an `Option`; unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScheduledFlight {
    pub ident: Option<String>,
    pub operator: Option<String>,
    pub aircraft_type: Option<String>,
    pub status: Option<String>,
    pub origin: Option<AirportRef>,
    pub destination: Option<AirportRef>,
    pub scheduled_out: Option<DateTime<Utc>>,
    pub estimated_out: Option<DateTime<Utc>>,
    pub actual_out: Option<DateTime<Utc>>,
    pub scheduled_in: Option<DateTime<Utc>>,
    pub estimated_in: Option<DateTime<Utc>>,
    pub actual_in: Option<DateTime<Utc>>,
    pub estimated_off: Option<DateTime<Utc>>,
    /// Filed cruise speed in knots
    pub filed_airspeed: Option<u32>,
    /// Great-circle route distance in nautical miles
    pub route_distance: Option<u32>,
    pub seats_cabin_business: Option<u32>,
    pub seats_cabin_coach: Option<u32>,
    pub seats_cabin_first: Option<u32>,
}

/// Aircraft size class derived from total seat count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AircraftSize {
    Small,
    Medium,
    Large,
}

impl AircraftSize {
    pub fn from_seats(total_seats: u32) -> Self {
        if total_seats < 50 {
            Self::Small
        } else if total_seats < 150 {
            Self::Medium
        } else {
            Self::Large
        }
    }
}

impl fmt::Display for AircraftSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Small => write!(f, "Small"),
            Self::Medium => write!(f, "Medium"),
            Self::Large => write!(f, "Large"),
        }
    }
}

/// One end of a route (origin or destination), resolved against the airport
/// directory.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteEnd {
    /// Airport identifier as reported by the schedule API
    pub code: Option<String>,
    pub city: String,
    pub country: String,
    pub iso_country: String,
    /// Human-readable form: city alone for home-display countries,
    /// "city, country" otherwise
    pub display: String,
}

/// Normalized output of a schedule lookup. Built once per response entry,
/// immutable afterwards, never persisted.
#[derive(Debug, Clone)]
pub struct FlightDetail {
    pub callsign: Option<String>,
    pub origin: RouteEnd,
    pub destination: RouteEnd,
    pub operator: Option<String>,
    pub aircraft_type: Option<String>,
    pub status: Option<String>,
    pub scheduled_out: Option<DateTime<Utc>>,
    pub estimated_out: Option<DateTime<Utc>>,
    pub actual_out: Option<DateTime<Utc>>,
    pub scheduled_in: Option<DateTime<Utc>>,
    pub estimated_in: Option<DateTime<Utc>>,
    pub actual_in: Option<DateTime<Utc>>,
    pub is_delayed: bool,
    pub time_in_air: Option<Duration>,
    pub total_seats: u32,
    pub aircraft_size: AircraftSize,
    /// Filed cruise speed in knots
    pub filed_airspeed: Option<u32>,
    /// Route distance in nautical miles
    pub route_distance: Option<u32>,
}

/// A schedule-enriched flight merged with its live position, ready for
/// the report.
#[derive(Debug, Clone)]
pub struct SightedFlight {
    pub detail: FlightDetail,
    pub icao24: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Barometric altitude in meters, straight from the state feed
    pub altitude_m: Option<f64>,
    /// True track in degrees
    pub heading: f64,
    /// Heading 45°..=225° reads as departing (eastbound), the rest arriving
    pub departing: bool,
    pub last_contact_local: DateTime<Local>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn state_vector_from_full_row() {
        let row = json!([
            "a1b2c3", "UAL123  ", "United States", 1700000000, 1700000100,
            -87.75, 41.98, 3200.5, false, 230.0, 92.5, 4.2
        ]);
        let state = StateVector::from_row(row.as_array().unwrap()).unwrap();
        assert_eq!(state.icao24, "a1b2c3");
        assert_eq!(state.callsign.as_deref(), Some("UAL123"));
        assert_eq!(state.last_contact, 1700000100);
        assert!(!state.on_ground);
        assert_eq!(state.latitude, Some(41.98));
        assert_eq!(state.longitude, Some(-87.75));
        assert_eq!(state.true_track, Some(92.5));
    }

    #[test]
    fn state_vector_tolerates_nulls() {
        let row = json!([
            "abc123", null, "Unknown", null, 1700000100,
            null, null, null, true, null, null, null
        ]);
        let state = StateVector::from_row(row.as_array().unwrap()).unwrap();
        assert_eq!(state.callsign, None);
        assert!(state.on_ground);
        assert_eq!(state.latitude, None);
        assert_eq!(state.true_track, None);
    }

    #[test]
    fn state_vector_rejects_short_row() {
        let row = json!(["abc123", "UAL1"]);
        assert!(StateVector::from_row(row.as_array().unwrap()).is_none());
    }

    #[test]
    fn blank_callsign_becomes_none() {
        let row = json!([
            "abc123", "        ", "US", 0, 1700000100,
            null, null, null, false, null, 90.0, null
        ]);
        let state = StateVector::from_row(row.as_array().unwrap()).unwrap();
        assert_eq!(state.callsign, None);
    }

    #[test]
    fn aircraft_size_thresholds() {
        assert_eq!(AircraftSize::from_seats(0), AircraftSize::Small);
        assert_eq!(AircraftSize::from_seats(49), AircraftSize::Small);
        assert_eq!(AircraftSize::from_seats(50), AircraftSize::Medium);
        assert_eq!(AircraftSize::from_seats(149), AircraftSize::Medium);
        assert_eq!(AircraftSize::from_seats(150), AircraftSize::Large);
    }

    #[test]
    fn flights_response_defaults_to_empty() {
        let resp: FlightsResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.flights.is_empty());
    }

    #[test]
    fn scheduled_flight_ignores_unknown_fields() {
        let resp: FlightsResponse = serde_json::from_value(json!({
            "flights": [{
                "ident": "UAL123",
                "fa_flight_id": "UAL123-1700000000-airline-0500",
                "seats_cabin_coach": 120,
                "origin": {"code": "KORD", "timezone": "America/Chicago"}
            }],
            "links": {"next": null}
        }))
        .unwrap();
        let flight = &resp.flights[0];
        assert_eq!(flight.ident.as_deref(), Some("UAL123"));
        assert_eq!(flight.seats_cabin_coach, Some(120));
        assert_eq!(flight.origin.as_ref().unwrap().code.as_deref(), Some("KORD"));
    }
}
