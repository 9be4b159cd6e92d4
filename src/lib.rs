//! Overhead-flight spotter library.
//!
//! This library provides functionality to:
//! - Fetch live aircraft states for a geographic bounding box
//! - Enrich callsigns through a quota-gated, cached schedule-API client
//! - Resolve airport identifiers to country and city names
//! - Render a console report of the enriched sightings
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐    ┌──────────────┐    ┌─────────────┐
//! │  StateFeed  │───▶│   Pipeline   │───▶│   Report    │
//! │  (bbox)     │    │ (filter +    │    │  (console)  │
//! └─────────────┘    │  enrich)     │    └─────────────┘
//!                    └──────┬───────┘
//!                           ▼
//!                  ┌─────────────────┐    ┌─────────────┐
//!                  │ ScheduleClient  │───▶│ QuotaStore  │
//!                  │ (cache + quota) │    │ (persisted) │
//!                  └────────┬────────┘    └─────────────┘
//!                           ▼
//!                  ┌──────────────────┐
//!                  │ AirportDirectory │
//!                  │   (CSV, static)  │
//!                  └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use skywatch::{
//!     airports::AirportDirectory,
//!     pipeline::Pipeline,
//!     quota::QuotaStore,
//!     schedule::{ScheduleClient, ScheduleConfig},
//!     states::{BoundingBox, FeedConfig, StateFeed},
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let airports = AirportDirectory::load("processed_airports.csv")?;
//!     let quota = QuotaStore::load("monthly_calls.json")?;
//!     let schedule = ScheduleClient::new("api-key", quota, ScheduleConfig::default())?;
//!     let feed = StateFeed::new(FeedConfig::default())?;
//!
//!     let mut pipeline = Pipeline::new(feed, schedule, airports, BoundingBox::OHARE);
//!     let flights = pipeline.run().await?;
//!     println!("{} flight(s) overhead", flights.len());
//!
//!     Ok(())
//! }
//! ```

pub mod airports;
pub mod pipeline;
pub mod quota;
pub mod report;
pub mod schedule;
pub mod states;
pub mod types;

pub use airports::{AirportDirectory, AirportInfo};
pub use pipeline::Pipeline;
pub use quota::{FileBackend, QuotaBackend, QuotaRecord, QuotaStore};
pub use schedule::{extract_detail, ScheduleClient, ScheduleConfig};
pub use states::{BoundingBox, FeedConfig, StateFeed};
pub use types::{AircraftSize, FlightDetail, SightedFlight, StateVector};
