//! Per-pair time series and their validation.
//!
//! The wire format is flat: seventeen parallel arrays keyed by name. It is
//! decoded into `RawPairSeries` and then validated into the grouped
//! `PairSeries`. All arrays are required; a value array must either be empty
//! or match the length of the time axis it is plotted against.

use crate::error::SeriesError;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Datetime label formats the server emits, most specific first.
const LABEL_DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"];
const LABEL_DATE_FORMAT: &str = "%Y-%m-%d";

/// One element of a time axis.
///
/// The server emits formatted labels (`"2024-05-01 13:00"`, `"2024-05-01"`);
/// numeric axes (epoch seconds or ordinals) are accepted as well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimePoint {
    Epoch(f64),
    Label(String),
}

impl fmt::Display for TimePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Epoch(v) => write!(f, "{v}"),
            Self::Label(s) => f.write_str(s),
        }
    }
}

impl TimePoint {
    /// Position on a numeric time axis in seconds (labels are read as UTC).
    ///
    /// `None` for labels in none of the known formats.
    pub fn epoch_seconds(&self) -> Option<f64> {
        match self {
            Self::Epoch(v) => Some(*v),
            Self::Label(s) => parse_label(s.trim()),
        }
    }
}

fn parse_label(label: &str) -> Option<f64> {
    let datetime = LABEL_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(label, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(label, LABEL_DATE_FORMAT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;
    Some(datetime.and_utc().timestamp() as f64)
}

impl From<f64> for TimePoint {
    fn from(value: f64) -> Self {
        Self::Epoch(value)
    }
}

impl From<&str> for TimePoint {
    fn from(value: &str) -> Self {
        Self::Label(value.to_string())
    }
}

/// Raw observations, moving averages, bands and anomaly markers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistorySeries {
    pub times: Vec<TimePoint>,
    pub rtps: Vec<Option<f64>>,
    pub ewma_1hr: Vec<Option<f64>>,
    pub ewma_24hr: Vec<Option<f64>>,
    pub ewma_10day: Vec<Option<f64>>,
    pub upper_band: Vec<Option<f64>>,
    pub lower_band: Vec<Option<f64>>,
    /// Anomaly markers live on their own axis.
    pub anomaly_times: Vec<TimePoint>,
    pub anomaly_values: Vec<Option<f64>>,
}

/// One aggregate point per day.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailySeries {
    pub times: Vec<TimePoint>,
    pub rtps: Vec<Option<f64>>,
}

/// Observed tail plus point forecast and its confidence band.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForecastSeries {
    pub times_obs: Vec<TimePoint>,
    pub rtps_obs: Vec<Option<f64>>,
    pub times: Vec<TimePoint>,
    pub yhat: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
    pub upper: Vec<Option<f64>>,
}

/// Validated series for one pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPairSeries", into = "RawPairSeries")]
pub struct PairSeries {
    pub history: HistorySeries,
    pub daily: DailySeries,
    pub forecast: ForecastSeries,
}

impl PairSeries {
    /// Decode and validate one pair's JSON payload.
    pub fn from_value(value: serde_json::Value) -> Result<Self, SeriesError> {
        if !value.is_object() {
            return Err(SeriesError::NotAnObject);
        }
        let raw: RawPairSeries =
            serde_json::from_value(value).map_err(|e| SeriesError::Malformed(e.to_string()))?;
        Self::try_from(raw)
    }

    /// Total number of observations across all groups.
    pub fn point_count(&self) -> usize {
        self.history.times.len()
            + self.history.anomaly_times.len()
            + self.daily.times.len()
            + self.forecast.times_obs.len()
            + self.forecast.times.len()
    }
}

/// Flat wire representation of a pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPairSeries {
    pub history_times: Vec<TimePoint>,
    pub history_rtps: Vec<Option<f64>>,
    pub ewma_1hr: Vec<Option<f64>>,
    pub ewma_24hr: Vec<Option<f64>>,
    pub ewma_10day: Vec<Option<f64>>,
    pub upper_band: Vec<Option<f64>>,
    pub lower_band: Vec<Option<f64>>,
    pub anomaly_times: Vec<TimePoint>,
    pub anomaly_values: Vec<Option<f64>>,
    pub daily_times: Vec<TimePoint>,
    pub daily_rtps: Vec<Option<f64>>,
    pub forecast_times_obs: Vec<TimePoint>,
    pub forecast_rtps_obs: Vec<Option<f64>>,
    pub forecast_times: Vec<TimePoint>,
    pub forecast_yhat: Vec<Option<f64>>,
    pub forecast_lower: Vec<Option<f64>>,
    pub forecast_upper: Vec<Option<f64>>,
}

fn check_len(
    series: &'static str,
    axis: &'static str,
    expected: usize,
    actual: usize,
) -> Result<(), SeriesError> {
    // Empty value arrays are allowed: upstream omits indicators it could not compute.
    if actual == 0 || actual == expected {
        Ok(())
    } else {
        Err(SeriesError::LengthMismatch {
            series,
            axis,
            expected,
            actual,
        })
    }
}

impl TryFrom<RawPairSeries> for PairSeries {
    type Error = SeriesError;

    fn try_from(raw: RawPairSeries) -> Result<Self, Self::Error> {
        let history_len = raw.history_times.len();
        for (name, values) in [
            ("history_rtps", &raw.history_rtps),
            ("ewma_1hr", &raw.ewma_1hr),
            ("ewma_24hr", &raw.ewma_24hr),
            ("ewma_10day", &raw.ewma_10day),
            ("upper_band", &raw.upper_band),
            ("lower_band", &raw.lower_band),
        ] {
            check_len(name, "history_times", history_len, values.len())?;
        }
        check_len(
            "anomaly_values",
            "anomaly_times",
            raw.anomaly_times.len(),
            raw.anomaly_values.len(),
        )?;
        check_len(
            "daily_rtps",
            "daily_times",
            raw.daily_times.len(),
            raw.daily_rtps.len(),
        )?;
        check_len(
            "forecast_rtps_obs",
            "forecast_times_obs",
            raw.forecast_times_obs.len(),
            raw.forecast_rtps_obs.len(),
        )?;
        let forecast_len = raw.forecast_times.len();
        for (name, values) in [
            ("forecast_yhat", &raw.forecast_yhat),
            ("forecast_lower", &raw.forecast_lower),
            ("forecast_upper", &raw.forecast_upper),
        ] {
            check_len(name, "forecast_times", forecast_len, values.len())?;
        }

        Ok(Self {
            history: HistorySeries {
                times: raw.history_times,
                rtps: raw.history_rtps,
                ewma_1hr: raw.ewma_1hr,
                ewma_24hr: raw.ewma_24hr,
                ewma_10day: raw.ewma_10day,
                upper_band: raw.upper_band,
                lower_band: raw.lower_band,
                anomaly_times: raw.anomaly_times,
                anomaly_values: raw.anomaly_values,
            },
            daily: DailySeries {
                times: raw.daily_times,
                rtps: raw.daily_rtps,
            },
            forecast: ForecastSeries {
                times_obs: raw.forecast_times_obs,
                rtps_obs: raw.forecast_rtps_obs,
                times: raw.forecast_times,
                yhat: raw.forecast_yhat,
                lower: raw.forecast_lower,
                upper: raw.forecast_upper,
            },
        })
    }
}

impl From<PairSeries> for RawPairSeries {
    fn from(series: PairSeries) -> Self {
        let PairSeries {
            history,
            daily,
            forecast,
        } = series;
        Self {
            history_times: history.times,
            history_rtps: history.rtps,
            ewma_1hr: history.ewma_1hr,
            ewma_24hr: history.ewma_24hr,
            ewma_10day: history.ewma_10day,
            upper_band: history.upper_band,
            lower_band: history.lower_band,
            anomaly_times: history.anomaly_times,
            anomaly_values: history.anomaly_values,
            daily_times: daily.times,
            daily_rtps: daily.rtps,
            forecast_times_obs: forecast.times_obs,
            forecast_rtps_obs: forecast.rtps_obs,
            forecast_times: forecast.times,
            forecast_yhat: forecast.yhat,
            forecast_lower: forecast.lower,
            forecast_upper: forecast.upper,
        }
    }
}
