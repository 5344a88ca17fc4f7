//! The production HTTP client for the Agromet API v2.
//!
//! Responses come wrapped as `{"response": [...]}`; every request carries the
//! API key as a `key` query parameter. Transient failures (network errors,
//! 5xx) are retried with exponential backoff; 4xx responses are never
//! retried.

use crate::gateway::error::GatewayError;
use crate::gateway::{Gateway, API_KEY_ENV};
use crate::types::interval::Interval;
use crate::types::observation::{Observation, ObservationSeries};
use crate::types::station::StationRecord;
use crate::types::variable::{category_of, VariableDescriptor, VariableId};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, NaiveDateTime};
use log::{debug, info, warn};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const BASE_URL: &str = "https://agromet.inia.cl/api/v2";
const RETRY_ATTEMPTS: u32 = 3;

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

/// The service wraps list payloads in `{"response": [...]}`, but older
/// endpoints answer with a bare list.
#[derive(Deserialize)]
#[serde(untagged)]
enum ApiPayload {
    Wrapped { response: Vec<Value> },
    Bare(Vec<Value>),
}

impl ApiPayload {
    fn into_rows(self) -> Vec<Value> {
        match self {
            ApiPayload::Wrapped { response } => response,
            ApiPayload::Bare(rows) => rows,
        }
    }
}

enum RequestFailure {
    /// Worth another attempt: network error or 5xx.
    Transient(reqwest::Error),
    /// Surfaced immediately: auth, 4xx, undecodable body.
    Fatal(GatewayError),
}

impl ApiClient {
    /// Builds a client. The key is taken from `api_key`, falling back to the
    /// `AGROMET_API_KEY` environment variable; with neither available the
    /// client fails fast instead of producing doomed requests.
    pub fn new(api_key: Option<&str>, timeout: Duration) -> Result<Self, GatewayError> {
        let api_key = match api_key {
            Some(key) if !key.trim().is_empty() => key.trim().to_string(),
            _ => std::env::var(API_KEY_ENV)
                .ok()
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty())
                .ok_or(GatewayError::MissingApiKey)?,
        };
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("agromet-rs/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(GatewayError::ClientBuild)?;
        Ok(Self {
            http,
            base_url: BASE_URL.to_string(),
            api_key,
        })
    }

    async fn request(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<Vec<Value>, GatewayError> {
        let url = format!("{}/{}/", self.base_url, endpoint);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_request(&url, params).await {
                Ok(rows) => return Ok(rows),
                Err(RequestFailure::Fatal(e)) => return Err(e),
                Err(RequestFailure::Transient(source)) if attempt < RETRY_ATTEMPTS => {
                    let wait = Duration::from_secs(1 << (attempt - 1));
                    warn!(
                        "Request to {url} failed (attempt {attempt}/{RETRY_ATTEMPTS}): {source}. \
                         Retrying in {wait:?}"
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(RequestFailure::Transient(source)) => {
                    return Err(GatewayError::ServiceUnavailable {
                        url,
                        attempts: RETRY_ATTEMPTS,
                        source,
                    })
                }
            }
        }
    }

    async fn try_request(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<Vec<Value>, RequestFailure> {
        let response = self
            .http
            .get(url)
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(RequestFailure::Transient)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(RequestFailure::Fatal(GatewayError::AuthRejected {
                url: url.to_string(),
                status,
            }));
        }
        if status.is_client_error() {
            return Err(RequestFailure::Fatal(GatewayError::InvalidRequest {
                url: url.to_string(),
                status,
            }));
        }
        let response = response.error_for_status().map_err(RequestFailure::Transient)?;
        let payload: ApiPayload = response.json().await.map_err(|source| {
            RequestFailure::Fatal(GatewayError::Decode {
                url: url.to_string(),
                source,
            })
        })?;
        Ok(payload.into_rows())
    }
}

#[async_trait]
impl Gateway for ApiClient {
    async fn fetch_stations(&self) -> Result<Vec<StationRecord>, GatewayError> {
        info!("Fetching station catalog from API");
        let rows = self.request("estaciones", &[]).await?;
        let stations: Vec<StationRecord> = rows.iter().filter_map(station_from_row).collect();
        info!("Retrieved {} stations", stations.len());
        Ok(stations)
    }

    async fn fetch_variables(
        &self,
        station: &str,
    ) -> Result<Vec<VariableDescriptor>, GatewayError> {
        info!("Fetching variables for station {station}");
        let rows = self
            .request("variables", &[("estacion", station)])
            .await?;
        let variables: Vec<VariableDescriptor> = rows.iter().filter_map(variable_from_row).collect();
        if variables.is_empty() {
            return Err(GatewayError::NotFound {
                context: format!("station {station}"),
            });
        }
        info!("Retrieved {} variables for {station}", variables.len());
        Ok(variables)
    }

    async fn fetch_series(
        &self,
        station: &str,
        variable: VariableId,
        interval: &Interval,
    ) -> Result<ObservationSeries, GatewayError> {
        // The service takes inclusive dates; our intervals are half-open, so
        // the exclusive end maps to the date one second earlier.
        let desde = interval.start.date().format("%Y-%m-%d").to_string();
        let hasta = (interval.end - ChronoDuration::seconds(1))
            .date()
            .format("%Y-%m-%d")
            .to_string();
        let variable = variable.to_string();
        info!("Fetching {station}/{variable} from {desde} to {hasta}");
        let rows = self
            .request(
                "muestras",
                &[
                    ("estacion", station),
                    ("variable", variable.as_str()),
                    ("desde", desde.as_str()),
                    ("hasta", hasta.as_str()),
                ],
            )
            .await?;
        if rows.is_empty() {
            return Err(GatewayError::NotFound {
                context: format!("{station}/{variable} in {interval}"),
            });
        }
        let observations: Vec<Observation> = rows.iter().filter_map(observation_from_row).collect();
        debug!(
            "Retrieved {} observations for {station}/{variable}",
            observations.len()
        );
        Ok(ObservationSeries::from_observations(observations))
    }
}

/// Numeric fields arrive either as JSON numbers or as numeric strings.
fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn value_as_str(row: &Value, field: &str) -> Option<String> {
    row.get(field)
        .and_then(Value::as_str)
        .map(|s| s.to_string())
}

fn station_from_row(row: &Value) -> Option<StationRecord> {
    let code = value_as_str(row, "identificador")?;
    let latitude = row.get("latitud").and_then(value_as_f64);
    let longitude = row.get("longitud").and_then(value_as_f64);
    let (Some(latitude), Some(longitude)) = (latitude, longitude) else {
        debug!("Skipping station {code}: no coordinates");
        return None;
    };
    let region = value_as_str(row, "region").and_then(|name| name.parse().ok());
    Some(StationRecord {
        network: StationRecord::network_of(&code),
        name: value_as_str(row, "nombre").unwrap_or_default(),
        commune: value_as_str(row, "comuna").unwrap_or_default(),
        elevation: row.get("elevacion").and_then(value_as_f64),
        first_reading: value_as_str(row, "primer_dato"),
        code,
        region,
        latitude,
        longitude,
    })
}

fn variable_from_row(row: &Value) -> Option<VariableDescriptor> {
    let variable_id = row
        .get("identificador")
        .and_then(value_as_f64)
        .map(|id| id as VariableId)?;
    Some(VariableDescriptor {
        variable_id,
        display_name: value_as_str(row, "nombre").unwrap_or_default(),
        unit: value_as_str(row, "unidad").unwrap_or_default(),
        category: category_of(variable_id),
    })
}

fn observation_from_row(row: &Value) -> Option<Observation> {
    let raw_time = value_as_str(row, "tiempo")?;
    let timestamp = parse_timestamp(&raw_time);
    let Some(timestamp) = timestamp else {
        warn!("Skipping observation with unparsable timestamp '{raw_time}'");
        return None;
    };
    let value = row.get("valor").and_then(value_as_f64);
    Some(Observation::new(timestamp, value))
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .ok()
}
