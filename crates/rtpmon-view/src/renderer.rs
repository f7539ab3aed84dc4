//! Full-rebuild renderer.
//!
//! Each render clears the backend, builds a new tree from the latest
//! snapshot and selection, plots every chart, then reapplies focus. Layout
//! settling is a separate pass the caller runs after a short delay.

use crate::backend::ChartBackend;
use crate::focus::FocusState;
use crate::store::visible_pairs;
use crate::traces::plot_request;
use crate::tree::{ChartContainer, PairRow, PairSelector, PlotStatus, RowContent, ViewTree};
use rtpmon_core::{ChartKind, Selection, Snapshot, SnapshotEntry};
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderOptions {
    /// Draw a horizontal reference line at this RTP on daily charts.
    pub daily_target_rtp: Option<f64>,
}

pub struct ViewRenderer {
    options: RenderOptions,
    generation: u64,
}

impl ViewRenderer {
    pub fn new(options: RenderOptions) -> Self {
        Self {
            options,
            generation: 0,
        }
    }

    /// Generation of the most recent render.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Rebuild the view.
    ///
    /// Pairs whose series failed validation get an error row; a failed plot
    /// marks only its own container. Neither stops the render.
    pub fn render<B: ChartBackend + ?Sized>(
        &mut self,
        snapshot: Option<&Snapshot>,
        selection: &Selection,
        focus: &mut FocusState,
        backend: &mut B,
    ) -> ViewTree {
        self.generation += 1;
        backend.clear();

        let rows = match snapshot {
            Some(snapshot) => visible_pairs(snapshot, selection)
                .iter()
                .filter_map(|pair| snapshot.get(pair))
                .map(|entry| self.render_pair(entry, backend))
                .collect(),
            None => Vec::new(),
        };

        let mut tree = ViewTree {
            generation: self.generation,
            selector: PairSelector::build(snapshot, selection),
            rows,
            full_screen_active: false,
        };
        focus.reapply_after_render(&mut tree);
        backend.commit(&tree);

        debug!(
            generation = tree.generation,
            pairs = tree.rows.len(),
            charts = tree.container_count(),
            "Rendered view"
        );
        tree
    }

    fn render_pair<B: ChartBackend + ?Sized>(&self, entry: &SnapshotEntry, backend: &mut B) -> PairRow {
        let series = match &entry.series {
            Ok(series) => series,
            Err(e) => {
                warn!(pair = %entry.pair, error = %e, "Skipping invalid pair data");
                return PairRow {
                    pair: entry.pair.clone(),
                    content: RowContent::Invalid(e.to_string()),
                };
            }
        };

        let charts = ChartKind::ALL
            .iter()
            .map(|&kind| {
                let mut container = ChartContainer::new(entry.pair.clone(), kind);
                let request = plot_request(kind, series, self.options.daily_target_rtp);
                container.status = match backend.plot(&container.id, &request) {
                    Ok(()) => PlotStatus::Plotted,
                    Err(e) => {
                        warn!(error = %e, "Chart plot failed");
                        PlotStatus::Failed(e.reason)
                    }
                };
                container
            })
            .collect();

        PairRow {
            pair: entry.pair.clone(),
            content: RowContent::Charts(charts),
        }
    }

    /// Ask the backend to re-fit every plotted chart. Returns how many were
    /// resized.
    pub fn settle<B: ChartBackend + ?Sized>(&self, tree: &ViewTree, backend: &mut B) -> usize {
        let mut resized = 0;
        for container in tree.containers().filter(|c| c.is_plotted()) {
            backend.resize(&container.id);
            resized += 1;
        }
        debug!(generation = tree.generation, resized, "Layout settled");
        resized
    }
}
