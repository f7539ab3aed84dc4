//! Full-screen focus of a single chart.
//!
//! At most one container is exclusive at a time. Activating a new target
//! restores the previous one first, so a container never keeps exclusive
//! geometry after losing focus. Because every render rebuilds the tree, the
//! target is remembered by `(pair, kind)` and reapplied to the new container.

use crate::error::{FocusError, FocusResult};
use crate::tree::{ChartContainer, ContainerId, Geometry, Presentation, ViewTree};
use tracing::debug;

/// Z-order of the focused container.
pub const FOCUS_Z_INDEX: i32 = 1000;

/// A focus target is identified like the container it points at.
pub type FocusTarget = ContainerId;

/// Result of a toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FocusChange {
    Activated(FocusTarget),
    Deactivated(FocusTarget),
}

#[derive(Debug, Clone, PartialEq)]
struct ActiveFocus {
    target: FocusTarget,
    /// Geometry to restore on deactivation.
    saved: Geometry,
}

/// Process-wide focus state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FocusState {
    active: Option<ActiveFocus>,
}

impl FocusState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The focused target, if any.
    pub fn active(&self) -> Option<&FocusTarget> {
        self.active.as_ref().map(|a| &a.target)
    }

    pub fn is_active(&self, target: &FocusTarget) -> bool {
        self.active() == Some(target)
    }

    /// Geometry captured when the active target was focused.
    pub fn saved_geometry(&self) -> Option<&Geometry> {
        self.active.as_ref().map(|a| &a.saved)
    }

    /// Put `target` into exclusive presentation.
    ///
    /// Any previously active target is restored first. Fails without
    /// touching the state when the container is not in `tree`.
    pub fn activate(&mut self, tree: &mut ViewTree, target: FocusTarget) -> FocusResult<()> {
        if tree.find(&target).is_none() {
            return Err(FocusError::ContainerNotFound(target));
        }

        self.deactivate(tree);

        let container = tree
            .find_mut(&target)
            .ok_or_else(|| FocusError::ContainerNotFound(target.clone()))?;
        let saved = container.geometry.clone();
        make_exclusive(container);
        tree.full_screen_active = true;

        debug!(target = %target, "Chart focused");
        self.active = Some(ActiveFocus { target, saved });
        Ok(())
    }

    /// Restore the active container and clear focus. Returns the target
    /// that was active.
    pub fn deactivate(&mut self, tree: &mut ViewTree) -> Option<FocusTarget> {
        let active = self.active.take()?;
        if let Some(container) = tree.find_mut(&active.target) {
            restore(container, active.saved);
        }
        tree.full_screen_active = false;
        debug!(target = %active.target, "Chart focus released");
        Some(active.target)
    }

    /// Deactivate when `target` is the active one, activate it otherwise.
    pub fn toggle(&mut self, tree: &mut ViewTree, target: FocusTarget) -> FocusResult<FocusChange> {
        if self.is_active(&target) {
            self.deactivate(tree);
            Ok(FocusChange::Deactivated(target))
        } else {
            self.activate(tree, target.clone())?;
            Ok(FocusChange::Activated(target))
        }
    }

    /// Reapply focus to a freshly rendered tree.
    ///
    /// The saved geometry is recaptured from the new container's natural
    /// state. If the target no longer exists, focus is cleared. Returns
    /// whether a container is focused afterwards.
    pub fn reapply_after_render(&mut self, tree: &mut ViewTree) -> bool {
        let Some(active) = self.active.as_mut() else {
            return false;
        };

        match tree.find_mut(&active.target) {
            Some(container) => {
                active.saved = container.geometry.clone();
                make_exclusive(container);
                tree.full_screen_active = true;
                true
            }
            None => {
                debug!(target = %active.target, "Focused chart not in new view, clearing focus");
                self.active = None;
                tree.full_screen_active = false;
                false
            }
        }
    }
}

fn make_exclusive(container: &mut ChartContainer) {
    container.geometry = Geometry::exclusive();
    container.presentation = Presentation::Exclusive;
    container.z_index = FOCUS_Z_INDEX;
}

fn restore(container: &mut ChartContainer, saved: Geometry) {
    container.geometry = saved;
    container.presentation = Presentation::Normal;
    container.z_index = 0;
}
