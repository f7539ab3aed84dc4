//! Plot requests for the three chart kinds.
//!
//! Field names follow Plotly's trace/layout/config schema so a request can
//! be serialized straight into a `Plotly.newPlot` call by a web frontend.

use rtpmon_core::{ChartKind, DailySeries, ForecastSeries, HistorySeries, PairSeries, TimePoint};
use serde::Serialize;
use std::collections::BTreeMap;

// ============================================================================
// Trace model
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TraceMode {
    #[serde(rename = "lines")]
    Lines,
    #[serde(rename = "markers")]
    Markers,
    #[serde(rename = "lines+markers")]
    LinesMarkers,
}

impl TraceMode {
    pub fn has_lines(&self) -> bool {
        matches!(self, Self::Lines | Self::LinesMarkers)
    }

    pub fn has_markers(&self) -> bool {
        matches!(self, Self::Markers | Self::LinesMarkers)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dash {
    Dot,
    Dash,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineStyle {
    pub color: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dash: Option<Dash>,
}

impl LineStyle {
    fn solid(color: &'static str) -> Self {
        Self { color, dash: None }
    }

    fn dashed(color: &'static str, dash: Dash) -> Self {
        Self {
            color,
            dash: Some(dash),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkerStyle {
    pub color: &'static str,
    pub size: u8,
    pub symbol: &'static str,
}

/// One plotted series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trace {
    pub name: &'static str,
    pub x: Vec<TimePoint>,
    pub y: Vec<Option<f64>>,
    #[serde(rename = "type")]
    pub trace_type: &'static str,
    pub mode: TraceMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<LineStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<MarkerStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fillcolor: Option<&'static str>,
}

impl Trace {
    fn scatter(name: &'static str, x: &[TimePoint], y: &[Option<f64>], mode: TraceMode) -> Self {
        Self {
            name,
            x: x.to_vec(),
            y: y.to_vec(),
            trace_type: "scatter",
            mode,
            line: None,
            marker: None,
            fill: None,
            fillcolor: None,
        }
    }

    fn with_line(mut self, line: LineStyle) -> Self {
        self.line = Some(line);
        self
    }

    fn with_marker(mut self, marker: MarkerStyle) -> Self {
        self.marker = Some(marker);
        self
    }

    /// `(x, y)` pairs with x placed on `axis` and a present y.
    pub fn numeric_points(&self, axis: &TimeAxis) -> Vec<(f64, f64)> {
        self.x
            .iter()
            .zip(&self.y)
            .filter_map(|(x, y)| Some((axis.position(x)?, (*y)?)))
            .collect()
    }
}

/// Numeric x axis shared by every trace of one chart.
///
/// Timestamps (numbers or datetime labels) map to epoch seconds. If any
/// label is not a known datetime, every label is placed by its rank among
/// all labels of the chart instead.
#[derive(Debug, Clone, PartialEq)]
pub enum TimeAxis {
    Seconds,
    Ordinal(BTreeMap<String, usize>),
}

impl TimeAxis {
    pub fn for_traces(traces: &[Trace]) -> Self {
        let points = || traces.iter().flat_map(|t| t.x.iter());
        if points().all(|p| p.epoch_seconds().is_some()) {
            return Self::Seconds;
        }

        let mut ranks: BTreeMap<String, usize> = points()
            .filter_map(|p| match p {
                TimePoint::Label(label) => Some((label.clone(), 0)),
                TimePoint::Epoch(_) => None,
            })
            .collect();
        for (rank, slot) in ranks.values_mut().enumerate() {
            *slot = rank;
        }
        Self::Ordinal(ranks)
    }

    pub fn position(&self, point: &TimePoint) -> Option<f64> {
        match (self, point) {
            (_, TimePoint::Epoch(v)) => Some(*v),
            (Self::Seconds, label) => label.epoch_seconds(),
            (Self::Ordinal(ranks), TimePoint::Label(label)) => ranks.get(label).map(|r| *r as f64),
        }
    }
}

// ============================================================================
// Layout and options
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Margins {
    pub t: u16,
    pub b: u16,
    pub l: u16,
    pub r: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AxisSpec {
    pub title: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlotLayout {
    pub autosize: bool,
    pub margin: Margins,
    pub xaxis: AxisSpec,
    pub yaxis: AxisSpec,
    pub showlegend: bool,
}

impl PlotLayout {
    fn with_x_title(x_title: &'static str) -> Self {
        Self {
            autosize: true,
            margin: Margins {
                t: 40,
                b: 50,
                l: 50,
                r: 50,
            },
            xaxis: AxisSpec { title: x_title },
            yaxis: AxisSpec { title: "RTP" },
            showlegend: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlotOptions {
    pub responsive: bool,
    pub display_mode_bar: bool,
    pub mode_bar_buttons_to_add: Vec<&'static str>,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            responsive: true,
            display_mode_bar: true,
            mode_bar_buttons_to_add: vec!["resetScale2d"],
        }
    }
}

/// Everything a backend needs to draw one chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotRequest {
    pub kind: ChartKind,
    pub traces: Vec<Trace>,
    pub layout: PlotLayout,
    pub options: PlotOptions,
}

impl PlotRequest {
    pub fn trace(&self, name: &str) -> Option<&Trace> {
        self.traces.iter().find(|t| t.name == name)
    }

    pub fn point_count(&self) -> usize {
        self.traces.iter().map(|t| t.x.len()).sum()
    }

    pub fn time_axis(&self) -> TimeAxis {
        TimeAxis::for_traces(&self.traces)
    }
}

// ============================================================================
// Builders
// ============================================================================

pub fn history_plot(history: &HistorySeries) -> PlotRequest {
    let t = &history.times;
    let traces = vec![
        Trace::scatter("RTP", t, &history.rtps, TraceMode::Lines).with_line(LineStyle::solid("blue")),
        Trace::scatter("EWMA 1hr", t, &history.ewma_1hr, TraceMode::Lines)
            .with_line(LineStyle::dashed("green", Dash::Dot)),
        Trace::scatter("EWMA 24hr", t, &history.ewma_24hr, TraceMode::Lines)
            .with_line(LineStyle::dashed("pink", Dash::Dot)),
        Trace::scatter("EWMA 10day", t, &history.ewma_10day, TraceMode::Lines)
            .with_line(LineStyle::dashed("purple", Dash::Dot)),
        Trace::scatter("Upper Band", t, &history.upper_band, TraceMode::Lines)
            .with_line(LineStyle::solid("red")),
        Trace::scatter("Lower Band", t, &history.lower_band, TraceMode::Lines)
            .with_line(LineStyle::solid("orange")),
        Trace::scatter(
            "Anomaly",
            &history.anomaly_times,
            &history.anomaly_values,
            TraceMode::Markers,
        )
        .with_marker(MarkerStyle {
            color: "red",
            size: 8,
            symbol: "x",
        }),
    ];

    PlotRequest {
        kind: ChartKind::History,
        traces,
        layout: PlotLayout::with_x_title("Time"),
        options: PlotOptions::default(),
    }
}

/// Daily aggregate, optionally with a horizontal target line.
pub fn daily_plot(daily: &DailySeries, target_rtp: Option<f64>) -> PlotRequest {
    let mut traces = vec![
        Trace::scatter("Daily RTP", &daily.times, &daily.rtps, TraceMode::LinesMarkers)
            .with_line(LineStyle::solid("blue")),
    ];

    if let (Some(target), Some(first), Some(last)) =
        (target_rtp, daily.times.first(), daily.times.last())
    {
        let x = [first.clone(), last.clone()];
        traces.push(
            Trace::scatter("Target RTP", &x, &[Some(target), Some(target)], TraceMode::Lines)
                .with_line(LineStyle::dashed("gray", Dash::Dash)),
        );
    }

    PlotRequest {
        kind: ChartKind::Daily,
        traces,
        layout: PlotLayout::with_x_title("Date"),
        options: PlotOptions::default(),
    }
}

pub fn forecast_plot(forecast: &ForecastSeries) -> PlotRequest {
    let mut traces = vec![
        Trace::scatter(
            "Observed RTP",
            &forecast.times_obs,
            &forecast.rtps_obs,
            TraceMode::LinesMarkers,
        ),
        Trace::scatter("Forecast", &forecast.times, &forecast.yhat, TraceMode::Lines)
            .with_line(LineStyle::solid("green")),
    ];
    traces.extend(forecast_band(forecast));

    PlotRequest {
        kind: ChartKind::Forecast,
        traces,
        layout: PlotLayout::with_x_title("Time"),
        options: PlotOptions::default(),
    }
}

/// Closed polygon around the forecast: lower bound forward, upper bound
/// backward. Only drawn when both bounds cover every forecast time.
fn forecast_band(forecast: &ForecastSeries) -> Option<Trace> {
    let n = forecast.times.len();
    if forecast.lower.len() != n || forecast.upper.len() != n {
        return None;
    }

    let x: Vec<TimePoint> = forecast
        .times
        .iter()
        .chain(forecast.times.iter().rev())
        .cloned()
        .collect();
    let y: Vec<Option<f64>> = forecast
        .lower
        .iter()
        .chain(forecast.upper.iter().rev())
        .copied()
        .collect();

    let mut band = Trace::scatter("Forecast Band", &x, &y, TraceMode::Lines)
        .with_line(LineStyle::solid("transparent"));
    band.fill = Some("toself");
    band.fillcolor = Some("rgba(0,255,0,0.2)");
    Some(band)
}

/// Plot request for one chart kind of a pair.
pub fn plot_request(kind: ChartKind, series: &PairSeries, target_rtp: Option<f64>) -> PlotRequest {
    match kind {
        ChartKind::History => history_plot(&series.history),
        ChartKind::Daily => daily_plot(&series.daily, target_rtp),
        ChartKind::Forecast => forecast_plot(&series.forecast),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn times(values: &[f64]) -> Vec<TimePoint> {
        values.iter().map(|&v| TimePoint::from(v)).collect()
    }

    #[test]
    fn test_history_trace_order_and_styles() {
        let history = HistorySeries {
            times: times(&[1.0, 2.0]),
            rtps: vec![Some(0.95), Some(0.97)],
            ..Default::default()
        };
        let request = history_plot(&history);
        let names: Vec<&str> = request.traces.iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec!["RTP", "EWMA 1hr", "EWMA 24hr", "EWMA 10day", "Upper Band", "Lower Band", "Anomaly"]
        );
        assert_eq!(request.trace("EWMA 24hr").unwrap().line.as_ref().unwrap().dash, Some(Dash::Dot));
        assert_eq!(request.trace("Anomaly").unwrap().mode, TraceMode::Markers);
        assert_eq!(request.layout.xaxis.title, "Time");
    }

    #[test]
    fn test_daily_target_line_optional() {
        let daily = DailySeries {
            times: vec!["2024-01-01".into(), "2024-01-02".into(), "2024-01-03".into()],
            rtps: vec![Some(0.9), None, Some(0.97)],
        };
        assert_eq!(daily_plot(&daily, None).traces.len(), 1);

        let with_target = daily_plot(&daily, Some(0.96));
        let target = with_target.trace("Target RTP").unwrap();
        assert_eq!(target.y, vec![Some(0.96), Some(0.96)]);
        assert_eq!(target.x, vec![TimePoint::from("2024-01-01"), TimePoint::from("2024-01-03")]);
        assert_eq!(with_target.layout.xaxis.title, "Date");
    }

    #[test]
    fn test_daily_target_skipped_without_points() {
        let request = daily_plot(&DailySeries::default(), Some(0.96));
        assert!(request.trace("Target RTP").is_none());
    }

    #[test]
    fn test_forecast_band_is_closed_polygon() {
        let forecast = ForecastSeries {
            times: times(&[10.0, 20.0, 30.0]),
            yhat: vec![Some(0.95); 3],
            lower: vec![Some(0.90), Some(0.91), Some(0.92)],
            upper: vec![Some(0.98), Some(0.99), Some(1.0)],
            ..Default::default()
        };
        let request = forecast_plot(&forecast);
        let band = request.trace("Forecast Band").unwrap();
        assert_eq!(band.x, times(&[10.0, 20.0, 30.0, 30.0, 20.0, 10.0]));
        assert_eq!(
            band.y,
            vec![Some(0.90), Some(0.91), Some(0.92), Some(1.0), Some(0.99), Some(0.98)]
        );
        assert_eq!(band.fill, Some("toself"));
    }

    #[test]
    fn test_serializes_with_plotly_names() {
        let request = daily_plot(&DailySeries::default(), None);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["traces"][0]["type"], "scatter");
        assert_eq!(json["traces"][0]["mode"], "lines+markers");
        assert_eq!(json["layout"]["margin"]["t"], 40);
        assert_eq!(json["options"]["modeBarButtonsToAdd"][0], "resetScale2d");
        assert_eq!(json["options"]["displayModeBar"], true);
    }

    #[test]
    fn test_numeric_points_skip_nulls() {
        let trace = Trace::scatter(
            "RTP",
            &times(&[1.0, 2.0, 3.0]),
            &[Some(0.5), None, Some(0.7)],
            TraceMode::Lines,
        );
        assert_eq!(
            trace.numeric_points(&TimeAxis::Seconds),
            vec![(1.0, 0.5), (3.0, 0.7)]
        );
    }

    fn labels(values: &[&str]) -> Vec<TimePoint> {
        values.iter().map(|&v| TimePoint::from(v)).collect()
    }

    #[test]
    fn test_anomaly_aligned_with_history_labels() {
        let history = HistorySeries {
            times: labels(&["2024-01-01 10:00", "2024-01-01 11:00", "2024-01-01 12:00"]),
            rtps: vec![Some(0.95), Some(0.99), Some(0.96)],
            anomaly_times: labels(&["2024-01-01 11:00"]),
            anomaly_values: vec![Some(0.99)],
            ..Default::default()
        };
        let request = history_plot(&history);
        let axis = request.time_axis();
        assert_eq!(axis, TimeAxis::Seconds);

        let rtp = request.trace("RTP").unwrap().numeric_points(&axis);
        let anomaly = request.trace("Anomaly").unwrap().numeric_points(&axis);
        assert_eq!(anomaly, vec![(rtp[1].0, 0.99)]);
        assert_eq!(rtp[2].0 - rtp[1].0, 3600.0);
    }

    #[test]
    fn test_forecast_band_spans_forecast_times() {
        let forecast = ForecastSeries {
            times_obs: labels(&["2024-01-01 09:00", "2024-01-01 10:00"]),
            rtps_obs: vec![Some(0.94), Some(0.95)],
            times: labels(&["2024-01-01 11:00", "2024-01-01 12:00"]),
            yhat: vec![Some(0.95), Some(0.96)],
            lower: vec![Some(0.90), Some(0.91)],
            upper: vec![Some(0.99), Some(1.0)],
        };
        let request = forecast_plot(&forecast);
        let axis = request.time_axis();

        let fc = request.trace("Forecast").unwrap().numeric_points(&axis);
        let obs = request.trace("Observed RTP").unwrap().numeric_points(&axis);
        let band = request.trace("Forecast Band").unwrap().numeric_points(&axis);
        let band_x: Vec<f64> = band.iter().map(|(x, _)| *x).collect();
        assert_eq!(band_x, vec![fc[0].0, fc[1].0, fc[1].0, fc[0].0]);
        assert!(obs[1].0 < fc[0].0);
    }

    #[test]
    fn test_unknown_labels_share_one_ordinal_axis() {
        let history = HistorySeries {
            times: labels(&["w1", "w2", "w3"]),
            rtps: vec![Some(0.9), Some(0.91), Some(0.92)],
            anomaly_times: labels(&["w2"]),
            anomaly_values: vec![Some(0.91)],
            ..Default::default()
        };
        let request = history_plot(&history);
        let axis = request.time_axis();
        assert!(matches!(axis, TimeAxis::Ordinal(_)));
        assert_eq!(
            request.trace("Anomaly").unwrap().numeric_points(&axis),
            vec![(1.0, 0.91)]
        );
    }

    #[test]
    fn test_band_skipped_when_bound_missing() {
        let forecast = ForecastSeries {
            times: times(&[10.0, 20.0]),
            yhat: vec![Some(0.95); 2],
            lower: Vec::new(),
            upper: vec![Some(0.98), Some(0.99)],
            ..Default::default()
        };
        let request = forecast_plot(&forecast);
        assert!(request.trace("Forecast Band").is_none());
        assert!(request.trace("Forecast").is_some());
    }
}
