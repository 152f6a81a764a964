pub mod geo;
pub mod marker;
pub mod row;

pub use geo::{fixed_one_decimal, LngLat, LocationKey};
pub use marker::{MarkerSpec, PlacedMarker, Severity};
pub use row::QueryRow;
