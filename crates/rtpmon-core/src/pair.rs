//! Pair identification and view selection types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stored value of the "show every pair" selection.
pub const ALL_PAIRS: &str = "all";

/// Identifier of one tracked instrument stream (e.g. `"EURUSD"`, `"game42:vendor7"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PairId(String);

impl PairId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PairId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PairId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PairId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// The three charts rendered for every pair, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    History,
    Daily,
    Forecast,
}

impl ChartKind {
    /// Fixed construction order of a pair's charts.
    pub const ALL: [ChartKind; 3] = [ChartKind::History, ChartKind::Daily, ChartKind::Forecast];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::History => "history",
            Self::Daily => "daily",
            Self::Forecast => "forecast",
        }
    }

    /// Short label shown in the chart header next to the focus control.
    pub fn header_label(&self) -> &'static str {
        match self {
            Self::History => "History",
            Self::Daily => "Daily RTP",
            Self::Forecast => "Forecast",
        }
    }

    /// Per-pair chart title, e.g. `History (EURUSD)`.
    pub fn title(&self, pair: &PairId) -> String {
        let prefix = match self {
            Self::History => "History",
            Self::Daily => "Daily",
            Self::Forecast => "Forecast",
        };
        format!("{prefix} ({pair})")
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which pairs the user wants to see.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Selection {
    #[default]
    All,
    Pair(PairId),
}

impl Selection {
    /// Decode a persisted selection value. Empty values fall back to `All`.
    pub fn from_stored(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value == ALL_PAIRS {
            Self::All
        } else {
            Self::Pair(PairId::new(value))
        }
    }

    /// Value written to durable storage.
    pub fn as_stored(&self) -> &str {
        match self {
            Self::All => ALL_PAIRS,
            Self::Pair(pair) => pair.as_str(),
        }
    }

    /// Human readable label for selectors.
    pub fn label(&self) -> &str {
        match self {
            Self::All => "All",
            Self::Pair(pair) => pair.as_str(),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    /// Whether `pair` is shown under this selection.
    pub fn includes(&self, pair: &PairId) -> bool {
        match self {
            Self::All => true,
            Self::Pair(selected) => selected == pair,
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_stored())
    }
}

impl From<PairId> for Selection {
    fn from(pair: PairId) -> Self {
        Self::Pair(pair)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chart_titles() {
        let pair = PairId::from("EURUSD");
        assert_eq!(ChartKind::History.title(&pair), "History (EURUSD)");
        assert_eq!(ChartKind::Daily.title(&pair), "Daily (EURUSD)");
        assert_eq!(ChartKind::Forecast.title(&pair), "Forecast (EURUSD)");
        assert_eq!(ChartKind::Daily.header_label(), "Daily RTP");
    }

    #[test]
    fn test_chart_kind_serde() {
        let json = serde_json::to_string(&ChartKind::Forecast).unwrap();
        assert_eq!(json, "\"forecast\"");
    }

    #[test]
    fn test_selection_stored_round_trip() {
        assert_eq!(Selection::from_stored("all"), Selection::All);
        assert_eq!(Selection::from_stored(""), Selection::All);
        assert_eq!(
            Selection::from_stored("game42:vendor7"),
            Selection::Pair(PairId::from("game42:vendor7"))
        );
        assert_eq!(Selection::Pair(PairId::from("EURUSD")).as_stored(), "EURUSD");
        assert_eq!(Selection::All.as_stored(), ALL_PAIRS);
    }

    #[test]
    fn test_selection_includes() {
        let eur = PairId::from("EURUSD");
        let gbp = PairId::from("GBPUSD");
        assert!(Selection::All.includes(&eur));
        let only_eur = Selection::from(eur.clone());
        assert!(only_eur.includes(&eur));
        assert!(!only_eur.includes(&gbp));
    }
}
