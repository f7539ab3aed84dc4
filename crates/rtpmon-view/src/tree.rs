//! Visual tree produced by a render.
//!
//! The tree is the crate's stand-in for page markup: a pair selector and
//! one row per visible pair, each row holding three chart containers.
//! Frontends read it to lay out whatever the chart backend drew.

use rtpmon_core::{ChartKind, PairId, Selection, Snapshot};
use serde::Serialize;
use std::fmt;

/// Identity of a chart container: one chart kind of one pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ContainerId {
    pub pair: PairId,
    pub kind: ChartKind,
}

impl ContainerId {
    pub fn new(pair: impl Into<PairId>, kind: ChartKind) -> Self {
        Self {
            pair: pair.into(),
            kind,
        }
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.pair, self.kind)
    }
}

/// A length in the layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Dimension {
    Auto,
    Percent(f32),
    Cells(u16),
}

/// Container geometry that focus captures and restores.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Geometry {
    pub width: Dimension,
    pub height: Dimension,
    pub flex_basis: Dimension,
    pub margin: u16,
    pub padding: u16,
    pub border: bool,
}

impl Geometry {
    /// Normal flow: one third of the pair's row.
    pub fn natural() -> Self {
        Self {
            width: Dimension::Auto,
            height: Dimension::Auto,
            flex_basis: Dimension::Percent(100.0 / 3.0),
            margin: 1,
            padding: 1,
            border: true,
        }
    }

    /// Exclusive presentation: fills the viewport, no flex participation.
    pub fn exclusive() -> Self {
        Self {
            width: Dimension::Percent(100.0),
            height: Dimension::Percent(100.0),
            flex_basis: Dimension::Auto,
            margin: 0,
            padding: 0,
            border: false,
        }
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self::natural()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Presentation {
    Normal,
    Exclusive,
}

/// Outcome of handing a container to the chart backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PlotStatus {
    Pending,
    Plotted,
    Failed(String),
}

/// One chart slot with its header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartContainer {
    pub id: ContainerId,
    /// Per-pair title, e.g. `History (EURUSD)`.
    pub title: String,
    /// Short header label next to the focus control.
    pub header_label: &'static str,
    pub geometry: Geometry,
    pub presentation: Presentation,
    pub z_index: i32,
    pub status: PlotStatus,
}

impl ChartContainer {
    pub fn new(pair: PairId, kind: ChartKind) -> Self {
        Self {
            title: kind.title(&pair),
            header_label: kind.header_label(),
            id: ContainerId { pair, kind },
            geometry: Geometry::natural(),
            presentation: Presentation::Normal,
            z_index: 0,
            status: PlotStatus::Pending,
        }
    }

    pub fn is_exclusive(&self) -> bool {
        self.presentation == Presentation::Exclusive
    }

    pub fn is_plotted(&self) -> bool {
        self.status == PlotStatus::Plotted
    }
}

/// What a pair's row shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RowContent {
    /// History, daily and forecast, in that order.
    Charts(Vec<ChartContainer>),
    /// The pair's series failed validation.
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairRow {
    pub pair: PairId,
    pub content: RowContent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectorOption {
    #[serde(serialize_with = "serialize_selection")]
    pub value: Selection,
    pub label: String,
}

fn serialize_selection<S: serde::Serializer>(value: &Selection, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(value.as_stored())
}

/// Pair selector: "All" followed by every snapshot key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairSelector {
    pub options: Vec<SelectorOption>,
    /// Index of the current selection; `None` when the stored pair is
    /// not part of the snapshot.
    pub selected: Option<usize>,
}

impl PairSelector {
    pub fn build(snapshot: Option<&Snapshot>, selection: &Selection) -> Self {
        let mut options = vec![SelectorOption {
            value: Selection::All,
            label: Selection::All.label().to_string(),
        }];
        if let Some(snapshot) = snapshot {
            options.extend(snapshot.pair_ids().map(|pair| SelectorOption {
                label: pair.to_string(),
                value: Selection::Pair(pair.clone()),
            }));
        }
        let selected = options.iter().position(|o| &o.value == selection);
        Self { options, selected }
    }

    pub fn selected_value(&self) -> Option<&Selection> {
        self.selected.map(|i| &self.options[i].value)
    }

    /// Option `step` positions away from the current one, wrapping around.
    pub fn neighbor(&self, step: isize) -> Option<Selection> {
        if self.options.is_empty() {
            return None;
        }
        let len = self.options.len() as isize;
        let current = self.selected.unwrap_or(0) as isize;
        let index = (current + step).rem_euclid(len) as usize;
        Some(self.options[index].value.clone())
    }
}

/// Result of one render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewTree {
    /// Render counter; a settle pass only applies to the generation it was
    /// scheduled for.
    pub generation: u64,
    pub selector: PairSelector,
    pub rows: Vec<PairRow>,
    /// Some container is in exclusive presentation.
    pub full_screen_active: bool,
}

impl ViewTree {
    /// Tree shown before the first snapshot arrives.
    pub fn empty(selection: &Selection) -> Self {
        Self {
            generation: 0,
            selector: PairSelector::build(None, selection),
            rows: Vec::new(),
            full_screen_active: false,
        }
    }

    pub fn containers(&self) -> impl Iterator<Item = &ChartContainer> {
        self.rows
            .iter()
            .filter_map(|row| match &row.content {
                RowContent::Charts(charts) => Some(charts.iter()),
                RowContent::Invalid(_) => None,
            })
            .flatten()
    }

    pub fn containers_mut(&mut self) -> impl Iterator<Item = &mut ChartContainer> {
        self.rows
            .iter_mut()
            .filter_map(|row| match &mut row.content {
                RowContent::Charts(charts) => Some(charts.iter_mut()),
                RowContent::Invalid(_) => None,
            })
            .flatten()
    }

    pub fn find(&self, id: &ContainerId) -> Option<&ChartContainer> {
        self.containers().find(|c| &c.id == id)
    }

    pub fn find_mut(&mut self, id: &ContainerId) -> Option<&mut ChartContainer> {
        self.containers_mut().find(|c| &c.id == id)
    }

    pub fn container_count(&self) -> usize {
        self.containers().count()
    }

    pub fn exclusive_container(&self) -> Option<&ChartContainer> {
        self.containers().find(|c| c.is_exclusive())
    }

    pub fn pair_ids(&self) -> impl Iterator<Item = &PairId> {
        self.rows.iter().map(|row| &row.pair)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtpmon_core::PairSeries;

    fn snapshot(pairs: &[&str]) -> Snapshot {
        Snapshot::from_pairs(
            pairs
                .iter()
                .map(|p| (PairId::from(*p), PairSeries::default())),
        )
    }

    #[test]
    fn test_selector_lists_all_then_pairs() {
        let snap = snapshot(&["EURUSD", "GBPUSD"]);
        let selector = PairSelector::build(Some(&snap), &Selection::Pair("GBPUSD".into()));
        let labels: Vec<&str> = selector.options.iter().map(|o| o.label.as_str()).collect();
        assert_eq!(labels, vec!["All", "EURUSD", "GBPUSD"]);
        assert_eq!(selector.selected, Some(2));
    }

    #[test]
    fn test_selector_without_matching_pair() {
        let snap = snapshot(&["EURUSD"]);
        let selector = PairSelector::build(Some(&snap), &Selection::Pair("GONE".into()));
        assert_eq!(selector.selected, None);
        assert_eq!(selector.selected_value(), None);
    }

    #[test]
    fn test_selector_neighbor_wraps() {
        let snap = snapshot(&["EURUSD", "GBPUSD"]);
        let selector = PairSelector::build(Some(&snap), &Selection::All);
        assert_eq!(selector.neighbor(1), Some(Selection::Pair("EURUSD".into())));
        assert_eq!(selector.neighbor(-1), Some(Selection::Pair("GBPUSD".into())));
        assert_eq!(selector.neighbor(3), Some(Selection::All));
    }

    #[test]
    fn test_container_defaults() {
        let container = ChartContainer::new("EURUSD".into(), ChartKind::Daily);
        assert_eq!(container.title, "Daily (EURUSD)");
        assert_eq!(container.header_label, "Daily RTP");
        assert_eq!(container.geometry, Geometry::natural());
        assert!(!container.is_exclusive());
        assert_eq!(container.status, PlotStatus::Pending);
    }

    #[test]
    fn test_tree_lookup_skips_invalid_rows() {
        let tree = ViewTree {
            generation: 1,
            selector: PairSelector::build(None, &Selection::All),
            rows: vec![
                PairRow {
                    pair: "BAD".into(),
                    content: RowContent::Invalid("nope".to_string()),
                },
                PairRow {
                    pair: "EURUSD".into(),
                    content: RowContent::Charts(
                        ChartKind::ALL
                            .iter()
                            .map(|&k| ChartContainer::new("EURUSD".into(), k))
                            .collect(),
                    ),
                },
            ],
            full_screen_active: false,
        };
        assert_eq!(tree.container_count(), 3);
        assert!(tree
            .find(&ContainerId::new("EURUSD", ChartKind::Forecast))
            .is_some());
        assert!(tree.find(&ContainerId::new("BAD", ChartKind::History)).is_none());
    }
}
