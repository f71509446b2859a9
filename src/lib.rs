//! Link Residual Classification
//!
//! Flags hotspot links whose observed signal strength beats a terrain
//! propagation prediction by more than a configured margin, and prepares
//! report data (line of sight, Fresnel zone, RSSI profile) for the worst
//! link seen by each witness.

pub mod core;
pub mod algorithms;
pub mod propagation;
pub mod source;
pub mod report;
pub mod validation;
pub mod utils;
pub mod pipeline;

// Re-export commonly used types
pub use crate::core::{
    AssertedLink, ClassificationResult, EdgeRecord, GeoPoint, HotspotId, LinkRow, RefinedLocation,
    SignalHistogram, SignalStatistics, TerrainProfile,
};
pub use algorithms::{
    aggregate, clamp_antenna_height, select_worst, ClassificationEngine, ClassificationParams, GeospatialRefiner,
};
pub use propagation::{CellId, FlatEarthTerrain, HexGrid, PlanarHexGrid, PropagationError, TerrainModel};
pub use source::{InventoryPager, LinkQuery, LinkSource, MemoryLinkSource};
pub use report::{assemble_report, CsvFormatter, JsonFormatter, ReportData, TextFormatter};
pub use validation::{FatalError, LinkError, LinkValidator, Recovery, ValidationError};
pub use utils::{init_logging, ClassifierConfig, ConfigError, ConfigurationManager, LogConfig};
pub use pipeline::{BatchOutcome, BatchSummary, ClassifierContext, RunSummary};
