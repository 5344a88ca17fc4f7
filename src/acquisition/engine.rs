//! The acquisition engine: serves requests from the local store where it can,
//! fetches only the uncovered gaps, and keeps the store's coverage interval
//! consistent with what it actually holds.

use crate::acquisition::aggregate::aggregate_series;
use crate::error::AgrometError;
use crate::gateway::Gateway;
use crate::store::LocalStore;
use crate::types::aggregation::Aggregation;
use crate::types::interval::Interval;
use crate::types::observation::ObservationSeries;
use crate::types::variable::{category_of, resolve_variable, VariableId, VariableRef};
use log::{info, warn};
use polars::prelude::DataFrame;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub struct DataAcquisition<G> {
    gateway: Arc<G>,
    store: Option<Arc<LocalStore>>,
}

impl<G: Gateway> DataAcquisition<G> {
    pub fn new(gateway: Arc<G>, store: Option<Arc<LocalStore>>) -> Self {
        Self { gateway, store }
    }

    /// Fetches the series for one (station, variable) pair over `interval`,
    /// optionally resampled, serving as much as possible from the store.
    pub async fn get_data(
        &self,
        station: &str,
        variable: &VariableRef,
        interval: Interval,
        aggregation: Option<Aggregation>,
        use_cache: bool,
    ) -> Result<DataFrame, AgrometError> {
        let (frame, _) = self
            .get_data_traced(station, variable, interval, aggregation, use_cache)
            .await?;
        Ok(frame)
    }

    /// Like [`Self::get_data`], additionally reporting whether the request
    /// touched the gateway (bulk downloads only pause after network pairs).
    pub(crate) async fn get_data_traced(
        &self,
        station: &str,
        variable: &VariableRef,
        interval: Interval,
        aggregation: Option<Aggregation>,
        use_cache: bool,
    ) -> Result<(DataFrame, bool), AgrometError> {
        let variable_id = resolve_variable(variable)?;
        let store = if use_cache { self.store.as_deref() } else { None };

        let cached = match store {
            Some(store) => store.get_series_chunk(station, variable_id).await,
            None => None,
        };
        let (cached_interval, mut merged) = match cached {
            Some((cached_interval, series)) => (Some(cached_interval), series),
            None => (None, ObservationSeries::empty()),
        };

        let gaps = interval.gaps_against(cached_interval.as_ref());
        if gaps.is_empty() && cached_interval.is_some() {
            info!(
                "Serving {station}/{variable_id} {interval} entirely from cache ({} records)",
                merged.len()
            );
        }

        let mut touched_gateway = false;
        for gap in &gaps {
            touched_gateway = true;
            let fetched = match self.gateway.fetch_series(station, variable_id, gap).await {
                // The service may answer with more than the gap; keep only
                // what the coverage bookkeeping will claim.
                Ok(series) => series.slice(gap),
                Err(e) if e.is_not_found() => {
                    info!("No data for {station}/{variable_id} in {gap}");
                    ObservationSeries::empty()
                }
                Err(e) => return Err(e.into()),
            };
            merged = merged.merge(&fetched);
        }

        if touched_gateway {
            if let Some(store) = store {
                let union = match cached_interval {
                    Some(cached_interval) => cached_interval.hull(&interval),
                    None => interval,
                };
                if let Err(e) = store
                    .put_series_chunk(station, variable_id, union, &merged)
                    .await
                {
                    // Memoization is best-effort; the caller still gets data.
                    warn!("Failed to cache series for {station}/{variable_id}: {e}");
                }
            }
        }

        let sliced = merged.slice(&interval);
        let frame = match aggregation {
            Some(bucket) => aggregate_series(&sliced, category_of(variable_id), bucket)?,
            None => sliced.to_data_frame()?,
        };
        Ok((frame, touched_gateway))
    }

    /// Downloads the full station × variable cross product sequentially.
    ///
    /// Each pair is an independent `Result`: failures are logged and excluded
    /// from the returned map, never aborting the remaining pairs. `delay` is
    /// the courtesy pause between consecutive gateway-touching pairs;
    /// cache-satisfied pairs skip it.
    pub async fn bulk_download(
        &self,
        stations: &[String],
        variables: &[VariableRef],
        interval: Interval,
        delay: f64,
    ) -> HashMap<(String, VariableId), DataFrame> {
        let total = stations.len() * variables.len();
        let mut results = HashMap::new();
        let mut current = 0;
        info!(
            "Bulk download: {} stations x {} variables = {total} pairs",
            stations.len(),
            variables.len()
        );

        for station in stations {
            for variable in variables {
                current += 1;
                let outcome = self
                    .get_data_traced(station, variable, interval, None, true)
                    .await;
                match outcome {
                    Ok((frame, touched_gateway)) => {
                        if frame.height() > 0 {
                            info!("[{current}/{total}] {station}/{variable}: {} records", frame.height());
                            if let Ok(variable_id) = resolve_variable(variable) {
                                results.insert((station.clone(), variable_id), frame);
                            }
                        } else {
                            warn!("[{current}/{total}] {station}/{variable}: no data");
                        }
                        if touched_gateway && current < total && delay > 0.0 {
                            tokio::time::sleep(Duration::from_secs_f64(delay)).await;
                        }
                    }
                    Err(e) => {
                        warn!("[{current}/{total}] {station}/{variable}: {e}");
                    }
                }
            }
        }

        info!(
            "Bulk download complete: {}/{total} pairs with data",
            results.len()
        );
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::testing::MockGateway;
    use crate::gateway::GatewayError;
    use crate::types::observation::Observation;
    use chrono::{Duration as ChronoDuration, NaiveDate, NaiveDateTime};

    fn dt(d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 9, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn iv(start: NaiveDateTime, end: NaiveDateTime) -> Interval {
        Interval::new(start, end).unwrap()
    }

    /// A deterministic 15-minute temperature signal so any two fetches of the
    /// same range agree.
    fn synthetic_series(interval: &Interval) -> ObservationSeries {
        let mut observations = Vec::new();
        let mut ts = interval.start;
        while ts < interval.end {
            let minutes = ts.and_utc().timestamp() / 60;
            let value = 12.0 + ((minutes % 96) as f64) * 0.1;
            observations.push(Observation::new(ts, Some(value)));
            ts += ChronoDuration::minutes(15);
        }
        ObservationSeries::from_observations(observations)
    }

    fn synthetic_gateway() -> MockGateway {
        MockGateway::with_series(|_, _, interval| Ok(synthetic_series(interval)))
    }

    async fn engine_with_store(
        gateway: MockGateway,
    ) -> (tempfile::TempDir, Arc<MockGateway>, DataAcquisition<MockGateway>) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(
            LocalStore::open(dir.path().to_path_buf()).await.unwrap(),
        );
        let gateway = Arc::new(gateway);
        let engine = DataAcquisition::new(Arc::clone(&gateway), Some(store));
        (dir, gateway, engine)
    }

    #[tokio::test]
    async fn second_identical_call_is_served_from_cache() {
        let (_dir, gateway, engine) = engine_with_store(synthetic_gateway()).await;
        let request = iv(dt(1, 0, 0), dt(3, 0, 0));
        let variable = VariableRef::Id(2002);

        let first = engine
            .get_data("INIA-47", &variable, request, None, true)
            .await
            .unwrap();
        assert_eq!(gateway.series_calls(), 1);

        let second = engine
            .get_data("INIA-47", &variable, request, None, true)
            .await
            .unwrap();
        assert_eq!(gateway.series_calls(), 1, "second call must not hit the gateway");
        assert!(first.equals(&second));
    }

    #[tokio::test]
    async fn subrange_of_cached_request_matches_direct_fetch() {
        let (_dir, _gateway, engine) = engine_with_store(synthetic_gateway()).await;
        let outer = iv(dt(1, 0, 0), dt(5, 0, 0));
        let inner = iv(dt(2, 0, 0), dt(3, 0, 0));
        let variable = VariableRef::Id(2002);

        engine
            .get_data("INIA-47", &variable, outer, None, true)
            .await
            .unwrap();
        let from_cache = engine
            .get_data("INIA-47", &variable, inner, None, true)
            .await
            .unwrap();

        // A fresh engine with no store fetches the subrange directly.
        let direct_engine = DataAcquisition::new(Arc::new(synthetic_gateway()), None);
        let direct = direct_engine
            .get_data("INIA-47", &variable, inner, None, false)
            .await
            .unwrap();
        assert!(from_cache.equals(&direct));
    }

    #[tokio::test]
    async fn extending_request_fetches_only_the_gaps() {
        let (_dir, gateway, engine) = engine_with_store(synthetic_gateway()).await;
        let variable = VariableRef::Id(2002);

        engine
            .get_data("INIA-47", &variable, iv(dt(2, 0, 0), dt(3, 0, 0)), None, true)
            .await
            .unwrap();
        assert_eq!(gateway.series_calls(), 1);

        // Extends the cached range on both sides: exactly two gap fetches.
        engine
            .get_data("INIA-47", &variable, iv(dt(1, 0, 0), dt(4, 0, 0)), None, true)
            .await
            .unwrap();
        assert_eq!(gateway.series_calls(), 3);

        // Now fully covered.
        engine
            .get_data("INIA-47", &variable, iv(dt(1, 0, 0), dt(4, 0, 0)), None, true)
            .await
            .unwrap();
        assert_eq!(gateway.series_calls(), 3);
    }

    #[tokio::test]
    async fn variable_name_and_id_yield_identical_frames() {
        let (_dir, _gateway, engine) = engine_with_store(synthetic_gateway()).await;
        let request = iv(dt(1, 0, 0), dt(2, 0, 0));

        let by_id = engine
            .get_data("INIA-47", &VariableRef::Id(2002), request, None, true)
            .await
            .unwrap();
        let by_name = engine
            .get_data("INIA-47", &"temperatura".into(), request, None, true)
            .await
            .unwrap();
        assert!(by_id.equals(&by_name));
    }

    #[tokio::test]
    async fn not_found_gap_is_recorded_as_empty() {
        let gateway = MockGateway::with_series(|_, _, interval| {
            Err(GatewayError::NotFound {
                context: format!("{interval}"),
            })
        });
        let (_dir, gateway, engine) = engine_with_store(gateway).await;
        let request = iv(dt(1, 0, 0), dt(2, 0, 0));

        let frame = engine
            .get_data("INIA-47", &VariableRef::Id(2002), request, None, true)
            .await
            .unwrap();
        assert_eq!(frame.height(), 0);
        assert_eq!(gateway.series_calls(), 1);

        // The empty coverage is cached too: no second fetch.
        engine
            .get_data("INIA-47", &VariableRef::Id(2002), request, None, true)
            .await
            .unwrap();
        assert_eq!(gateway.series_calls(), 1);
    }

    #[tokio::test]
    async fn service_errors_propagate() {
        let gateway = MockGateway::with_series(|_, _, _| {
            Err(GatewayError::AuthRejected {
                url: "https://example.invalid".into(),
                status: reqwest::StatusCode::FORBIDDEN,
            })
        });
        let (_dir, _gateway, engine) = engine_with_store(gateway).await;
        let request = iv(dt(1, 0, 0), dt(2, 0, 0));
        let result = engine
            .get_data("INIA-47", &VariableRef::Id(2002), request, None, true)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn use_cache_false_always_fetches_and_never_writes() {
        let (_dir, gateway, engine) = engine_with_store(synthetic_gateway()).await;
        let request = iv(dt(1, 0, 0), dt(2, 0, 0));
        let variable = VariableRef::Id(2002);

        engine
            .get_data("INIA-47", &variable, request, None, false)
            .await
            .unwrap();
        engine
            .get_data("INIA-47", &variable, request, None, false)
            .await
            .unwrap();
        assert_eq!(gateway.series_calls(), 2);

        // Nothing was cached: a cached call still needs the gateway.
        engine
            .get_data("INIA-47", &variable, request, None, true)
            .await
            .unwrap();
        assert_eq!(gateway.series_calls(), 3);
    }

    #[tokio::test]
    async fn daily_temperature_scenario_yields_one_ordered_row() {
        let (_dir, _gateway, engine) = engine_with_store(synthetic_gateway()).await;
        let request = iv(dt(1, 0, 0), dt(2, 0, 0));

        let frame = engine
            .get_data(
                "INIA-47",
                &VariableRef::Id(2002),
                request,
                Some(Aggregation::Daily),
                true,
            )
            .await
            .unwrap();

        // One daily bucket, no raw 15-minute rows leaking through.
        assert_eq!(frame.height(), 1);
        assert_eq!(
            frame.get_column_names(),
            ["tiempo", "valor_mean", "valor_min", "valor_max"]
        );
        let mean = frame.column("valor_mean").unwrap().f64().unwrap().get(0).unwrap();
        let min = frame.column("valor_min").unwrap().f64().unwrap().get(0).unwrap();
        let max = frame.column("valor_max").unwrap().f64().unwrap().get(0).unwrap();
        assert!(min <= mean && mean <= max);
    }

    #[tokio::test]
    async fn bulk_download_isolates_failing_pairs() {
        let gateway = MockGateway::with_series(|station, variable, interval| {
            if station == "INIA-139" && variable == 2003 {
                Err(GatewayError::NotFound {
                    context: format!("{station}/{variable}"),
                })
            } else {
                Ok(synthetic_series(interval))
            }
        });
        let (_dir, _gateway, engine) = engine_with_store(gateway).await;

        let stations: Vec<String> = ["INIA-47", "INIA-139", "INIA-202"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let variables = vec![VariableRef::Id(2002), VariableRef::Id(2003)];
        let results = engine
            .bulk_download(
                &stations,
                &variables,
                iv(dt(1, 0, 0), dt(2, 0, 0)),
                0.0,
            )
            .await;

        assert_eq!(results.len(), 5);
        assert!(!results.contains_key(&("INIA-139".to_string(), 2003)));
        assert!(results.contains_key(&("INIA-139".to_string(), 2002)));
    }

    #[tokio::test]
    async fn bulk_download_serves_cached_pairs_without_fetching() {
        let (_dir, gateway, engine) = engine_with_store(synthetic_gateway()).await;
        let request = iv(dt(1, 0, 0), dt(2, 0, 0));
        let stations = vec!["INIA-47".to_string()];
        let variables = vec![VariableRef::Id(2002)];

        engine
            .bulk_download(&stations, &variables, request, 0.0)
            .await;
        assert_eq!(gateway.series_calls(), 1);
        engine
            .bulk_download(&stations, &variables, request, 0.0)
            .await;
        assert_eq!(gateway.series_calls(), 1);
    }
}
