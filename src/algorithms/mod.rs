//! Link classification algorithms

pub mod refine;
pub mod statistics;
pub mod classify;
pub mod select;

pub use refine::{clamp_antenna_height, GeospatialRefiner};
pub use statistics::aggregate;
pub use classify::{is_edge, measured_loss_db, ClassificationEngine, ClassificationParams};
pub use select::select_worst;
