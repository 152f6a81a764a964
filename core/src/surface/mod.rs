pub mod board;

pub use board::{BoardSurface, BoardSurfaceFactory, MapView, MarkerBoard, SharedBoard};
