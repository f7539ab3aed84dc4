//! rtpmon-view - selection, focus and chart layout for the RTP monitor.
//!
//! Everything in this crate is synchronous state; the application crate
//! drives it from a single event loop.
//!
//! # Architecture
//!
//! ```text
//!  Snapshot ──▶ SnapshotStore ──(snapshot, selection)──▶ ViewRenderer
//!                                                            │
//!                      FocusState ◀── reapply_after_render ──┤
//!                                                            ▼
//!                                   ViewTree + ChartBackend::plot/resize
//! ```
//!
//! Every render rebuilds the whole `ViewTree`; the focused chart is found
//! again by `(pair, kind)` and put back into exclusive presentation.

pub mod backend;
pub mod error;
pub mod focus;
pub mod renderer;
pub mod store;
pub mod traces;
pub mod tree;

pub use backend::{ChartBackend, LogBackend, RecordingBackend};
pub use error::{FocusError, FocusResult, PlotError};
pub use focus::{FocusChange, FocusState, FocusTarget, FOCUS_Z_INDEX};
pub use renderer::{RenderOptions, ViewRenderer};
pub use store::{visible_pairs, SnapshotStore};
pub use traces::{PlotLayout, PlotOptions, PlotRequest, TimeAxis, Trace, TraceMode};
pub use tree::{
    ChartContainer, ContainerId, Dimension, Geometry, PairRow, PairSelector, PlotStatus,
    Presentation, RowContent, SelectorOption, ViewTree,
};
