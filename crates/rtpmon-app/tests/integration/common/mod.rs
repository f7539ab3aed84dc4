//! Shared fixtures for integration tests.

#![allow(dead_code)]

pub mod mock_ws;

use serde_json::{json, Map, Value};

/// One pair's payload with `points` observations in every series.
pub fn pair_json(points: usize) -> Value {
    let times: Vec<f64> = (0..points).map(|i| 1_700_000_000.0 + i as f64 * 60.0).collect();
    let values: Vec<f64> = (0..points).map(|i| 0.95 + i as f64 * 0.001).collect();
    json!({
        "history_times": times,
        "history_rtps": values,
        "ewma_1hr": values,
        "ewma_24hr": values,
        "ewma_10day": values,
        "upper_band": values,
        "lower_band": values,
        "anomaly_times": [],
        "anomaly_values": [],
        "daily_times": times,
        "daily_rtps": values,
        "forecast_times_obs": times,
        "forecast_rtps_obs": values,
        "forecast_times": times,
        "forecast_yhat": values,
        "forecast_lower": values,
        "forecast_upper": values,
    })
}

/// Snapshot object with the given pairs, in order.
pub fn snapshot_json(pairs: &[&str]) -> Value {
    let mut map = Map::new();
    for pair in pairs {
        map.insert(pair.to_string(), pair_json(3));
    }
    Value::Object(map)
}
