//! Core of the realtime interaction map.
//!
//! Interaction events are polled from a metrics backend, grouped by how long
//! ago they happened and where, and replayed onto a map surface as short-lived
//! markers colored by average duration.

pub mod config;
pub mod math;
pub mod model;
pub mod prelude;
pub mod processing;
pub mod query;
pub mod surface;
pub mod telemetry;
pub mod widget;

pub use config::{MapOptions, PollSettings, WidgetConfig};
pub use prelude::{MapSurface, MarkerId, QuerySource, SurfaceFactory};
pub use widget::{RealtimeMap, WidgetStatus};
