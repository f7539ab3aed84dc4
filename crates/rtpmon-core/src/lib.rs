//! Core domain types for the RTP monitor dashboard.
//!
//! This crate provides the data model shared by the connection, view and
//! application crates:
//! - `PairId`, `ChartKind`, `Selection`: what the user looks at
//! - `PairSeries`: validated per-pair series (history, daily, forecast)
//! - `Snapshot`: the full dataset pushed by the server, in wire order

pub mod error;
pub mod pair;
pub mod series;
pub mod snapshot;

pub use error::{ProtocolError, SeriesError};
pub use pair::{ChartKind, PairId, Selection, ALL_PAIRS};
pub use series::{DailySeries, ForecastSeries, HistorySeries, PairSeries, TimePoint};
pub use snapshot::{Snapshot, SnapshotEntry};
