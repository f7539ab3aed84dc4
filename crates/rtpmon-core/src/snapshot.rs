//! Full dataset pushed by the server.

use crate::error::{ProtocolError, SeriesError};
use crate::pair::PairId;
use crate::series::PairSeries;
use serde_json::Value;

/// One pair of a snapshot. Invalid pairs keep their validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotEntry {
    pub pair: PairId,
    pub series: Result<PairSeries, SeriesError>,
}

impl SnapshotEntry {
    pub fn is_valid(&self) -> bool {
        self.series.is_ok()
    }
}

/// Mapping pair → series, in the key order of the wire object.
///
/// A snapshot always replaces its predecessor wholesale; nothing is merged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    entries: Vec<SnapshotEntry>,
}

impl Snapshot {
    /// Decode a snapshot from a parsed JSON message.
    ///
    /// Only a non-object payload fails as a whole; individual pairs that do
    /// not validate are kept as invalid entries.
    pub fn from_value(value: Value) -> Result<Self, ProtocolError> {
        let Value::Object(map) = value else {
            return Err(ProtocolError::NotAnObject);
        };

        let entries = map
            .into_iter()
            .map(|(key, value)| SnapshotEntry {
                pair: PairId::new(key),
                series: PairSeries::from_value(value),
            })
            .collect();

        Ok(Self { entries })
    }

    /// Decode a snapshot from message text.
    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        Self::from_value(serde_json::from_str(text)?)
    }

    /// Build a snapshot from already validated series, keeping iteration order.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (PairId, PairSeries)>) -> Self {
        Self {
            entries: pairs
                .into_iter()
                .map(|(pair, series)| SnapshotEntry {
                    pair,
                    series: Ok(series),
                })
                .collect(),
        }
    }

    pub fn entries(&self) -> &[SnapshotEntry] {
        &self.entries
    }

    pub fn pair_ids(&self) -> impl Iterator<Item = &PairId> {
        self.entries.iter().map(|e| &e.pair)
    }

    pub fn get(&self, pair: &PairId) -> Option<&SnapshotEntry> {
        self.entries.iter().find(|e| &e.pair == pair)
    }

    pub fn contains(&self, pair: &PairId) -> bool {
        self.get(pair).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn invalid_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_valid()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn empty_pair() -> Value {
        json!({
            "history_times": [], "history_rtps": [], "ewma_1hr": [], "ewma_24hr": [],
            "ewma_10day": [], "upper_band": [], "lower_band": [], "anomaly_times": [],
            "anomaly_values": [], "daily_times": [], "daily_rtps": [],
            "forecast_times_obs": [], "forecast_rtps_obs": [], "forecast_times": [],
            "forecast_yhat": [], "forecast_lower": [], "forecast_upper": []
        })
    }

    #[test]
    fn test_preserves_wire_key_order() {
        let text = format!(
            r#"{{"GBPUSD": {p}, "EURUSD": {p}, "AUDUSD": {p}}}"#,
            p = empty_pair()
        );
        let snapshot = Snapshot::from_json(&text).unwrap();
        let keys: Vec<&str> = snapshot.pair_ids().map(|p| p.as_str()).collect();
        assert_eq!(keys, vec!["GBPUSD", "EURUSD", "AUDUSD"]);
    }

    #[test]
    fn test_invalid_pair_kept_as_entry() {
        let value = json!({ "EURUSD": empty_pair(), "BROKEN": 42 });
        let snapshot = Snapshot::from_value(value).unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.invalid_count(), 1);
        let broken = snapshot.get(&PairId::from("BROKEN")).unwrap();
        assert_eq!(broken.series, Err(SeriesError::NotAnObject));
    }

    #[test]
    fn test_non_object_message_rejected() {
        assert!(matches!(
            Snapshot::from_value(json!([1, 2])),
            Err(ProtocolError::NotAnObject)
        ));
        assert!(matches!(
            Snapshot::from_json("not json"),
            Err(ProtocolError::Json(_))
        ));
    }

    #[test]
    fn test_empty_object_is_empty_snapshot() {
        let snapshot = Snapshot::from_json("{}").unwrap();
        assert!(snapshot.is_empty());
    }
}
