//! Chart backend seam.
//!
//! The renderer only talks to a `ChartBackend`; the terminal frontend, the
//! headless logger and the test recorder all implement it.

use crate::error::PlotError;
use crate::traces::PlotRequest;
use crate::tree::{ContainerId, ViewTree};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Draws charts into containers.
pub trait ChartBackend {
    /// Draw `request` into `container`, replacing whatever was there.
    fn plot(&mut self, container: &ContainerId, request: &PlotRequest) -> Result<(), PlotError>;

    /// Re-fit a plotted chart to its container's current size.
    fn resize(&mut self, container: &ContainerId);

    /// Drop every chart (full rebuild).
    fn clear(&mut self);

    /// Called once the tree for a render or focus change is final.
    fn commit(&mut self, _tree: &ViewTree) {}
}

// ============================================================================
// LogBackend
// ============================================================================

/// Backend for headless mode: records nothing, logs what would be drawn.
#[derive(Debug, Default)]
pub struct LogBackend {
    plotted: usize,
}

impl LogBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChartBackend for LogBackend {
    fn plot(&mut self, container: &ContainerId, request: &PlotRequest) -> Result<(), PlotError> {
        self.plotted += 1;
        debug!(
            container = %container,
            traces = request.traces.len(),
            points = request.point_count(),
            "Plot"
        );
        Ok(())
    }

    fn resize(&mut self, container: &ContainerId) {
        debug!(container = %container, "Resize");
    }

    fn clear(&mut self) {
        self.plotted = 0;
    }

    fn commit(&mut self, tree: &ViewTree) {
        info!(
            generation = tree.generation,
            pairs = tree.rows.len(),
            charts = self.plotted,
            focused = tree.exclusive_container().map(|c| c.id.to_string()),
            "View updated"
        );
    }
}

// ============================================================================
// RecordingBackend
// ============================================================================

/// Backend that keeps every call for inspection.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    plots: Vec<(ContainerId, PlotRequest)>,
    resizes: HashMap<ContainerId, usize>,
    failing: HashSet<ContainerId>,
    clears: usize,
    commits: usize,
    last_tree: Option<ViewTree>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `plot` into `container` fail.
    pub fn fail_on(&mut self, container: ContainerId) {
        self.failing.insert(container);
    }

    /// Charts currently drawn, in plot order.
    pub fn plots(&self) -> &[(ContainerId, PlotRequest)] {
        &self.plots
    }

    pub fn plotted_ids(&self) -> Vec<&ContainerId> {
        self.plots.iter().map(|(id, _)| id).collect()
    }

    pub fn plot_for(&self, container: &ContainerId) -> Option<&PlotRequest> {
        self.plots
            .iter()
            .find(|(id, _)| id == container)
            .map(|(_, request)| request)
    }

    pub fn resize_count(&self, container: &ContainerId) -> usize {
        self.resizes.get(container).copied().unwrap_or(0)
    }

    pub fn total_resizes(&self) -> usize {
        self.resizes.values().sum()
    }

    pub fn clears(&self) -> usize {
        self.clears
    }

    pub fn commits(&self) -> usize {
        self.commits
    }

    pub fn last_tree(&self) -> Option<&ViewTree> {
        self.last_tree.as_ref()
    }
}

impl ChartBackend for RecordingBackend {
    fn plot(&mut self, container: &ContainerId, request: &PlotRequest) -> Result<(), PlotError> {
        if self.failing.contains(container) {
            return Err(PlotError::new(container.clone(), "injected failure"));
        }
        self.plots.retain(|(id, _)| id != container);
        self.plots.push((container.clone(), request.clone()));
        Ok(())
    }

    fn resize(&mut self, container: &ContainerId) {
        *self.resizes.entry(container.clone()).or_default() += 1;
    }

    fn clear(&mut self) {
        self.plots.clear();
        self.clears += 1;
    }

    fn commit(&mut self, tree: &ViewTree) {
        self.commits += 1;
        self.last_tree = Some(tree.clone());
    }
}
