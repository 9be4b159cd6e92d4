//! Airport reference directory.
//!
//! Maps an airport identifier to its country and municipality. The mapping
//! is loaded once from a processed CSV (`ident,iso_country,country_name,
//! municipality`) and is read-only afterwards; identifiers not in the file
//! resolve to the `Unknown` sentinel triple. [`build`] regenerates the
//! processed CSV from the public country and airport-code datasets.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

const COUNTRY_CODES_URL: &str =
    "https://raw.githubusercontent.com/lukes/ISO-3166-Countries-with-Regional-Codes/master/all/all.csv";
const AIRPORT_CODES_URL: &str =
    "https://raw.githubusercontent.com/datasets/airport-codes/master/data/airport-codes.csv";

#[derive(Debug, Error)]
pub enum AirportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("server returned status {status} for {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },
}

/// Country and municipality for one airport identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AirportInfo {
    pub iso_country: String,
    pub country_name: String,
    pub municipality: String,
}

impl AirportInfo {
    /// Sentinel returned for identifiers absent from the directory.
    pub fn unknown() -> Self {
        Self {
            iso_country: "Unknown".to_string(),
            country_name: "Unknown".to_string(),
            municipality: "Unknown".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct ProcessedRow {
    ident: String,
    iso_country: String,
    country_name: String,
    municipality: String,
}

/// In-memory airport directory, immutable after load.
pub struct AirportDirectory {
    airports: HashMap<String, AirportInfo>,
}

impl AirportDirectory {
    /// Load the processed-airports CSV fully into memory. A missing or
    /// unreadable file is fatal for any caller that needs display names.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, AirportError> {
        let mut reader = csv::Reader::from_path(path.as_ref())?;
        let mut airports = HashMap::new();

        for row in reader.deserialize() {
            let row: ProcessedRow = row?;
            airports.insert(
                row.ident,
                AirportInfo {
                    iso_country: row.iso_country,
                    country_name: row.country_name,
                    municipality: row.municipality,
                },
            );
        }

        tracing::debug!("loaded {} airports from {}", airports.len(), path.as_ref().display());
        Ok(Self { airports })
    }

    /// Exact lookup; `None` when the identifier is not in the directory.
    pub fn get(&self, ident: &str) -> Option<&AirportInfo> {
        self.airports.get(ident)
    }

    /// Lookup that falls back to the `Unknown` sentinel. Absence never
    /// blocks processing; callers render the sentinel as-is.
    pub fn lookup(&self, ident: &str) -> AirportInfo {
        self.get(ident).cloned().unwrap_or_else(AirportInfo::unknown)
    }

    pub fn len(&self) -> usize {
        self.airports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.airports.is_empty()
    }
}

/// Regenerate the processed-airports CSV: download the ISO-3166 country
/// table and the airport-codes dataset, keep large airports, and join
/// country display names. Returns the number of airports written.
pub async fn build(client: &reqwest::Client, out_path: &Path) -> Result<usize, AirportError> {
    let countries = parse_country_table(&fetch_csv(client, COUNTRY_CODES_URL).await?)?;
    tracing::info!("loaded {} country codes", countries.len());

    let rows = process_airports(&countries, &fetch_csv(client, AIRPORT_CODES_URL).await?)?;

    let mut writer = csv::Writer::from_path(out_path)?;
    for row in &rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    tracing::info!("wrote {} airports to {}", rows.len(), out_path.display());
    Ok(rows.len())
}

async fn fetch_csv(client: &reqwest::Client, url: &str) -> Result<Vec<u8>, AirportError> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(AirportError::Status {
            status,
            url: url.to_string(),
        });
    }
    Ok(response.bytes().await?.to_vec())
}

#[derive(Debug, Deserialize)]
struct CountryRow {
    name: String,
    #[serde(rename = "alpha-2")]
    alpha2: String,
}

fn parse_country_table(raw: &[u8]) -> Result<HashMap<String, String>, AirportError> {
    let mut reader = csv::Reader::from_reader(raw);
    let mut countries = HashMap::new();
    for row in reader.deserialize() {
        let row: CountryRow = row?;
        countries.insert(row.alpha2, row.name);
    }
    Ok(countries)
}

#[derive(Debug, Deserialize)]
struct AirportCodeRow {
    ident: String,
    #[serde(rename = "type")]
    kind: String,
    iso_country: String,
    municipality: Option<String>,
}

fn process_airports(
    countries: &HashMap<String, String>,
    raw: &[u8],
) -> Result<Vec<ProcessedRow>, AirportError> {
    let mut reader = csv::Reader::from_reader(raw);
    let mut rows = Vec::new();

    for row in reader.deserialize() {
        let row: AirportCodeRow = row?;
        if row.kind != "large_airport" {
            continue;
        }
        let country_name = countries
            .get(&row.iso_country)
            .cloned()
            .unwrap_or_else(|| "Unknown".to_string());
        rows.push(ProcessedRow {
            ident: row.ident,
            iso_country: row.iso_country,
            country_name,
            municipality: row.municipality.unwrap_or_default(),
        });
    }

    Ok(rows)
}
