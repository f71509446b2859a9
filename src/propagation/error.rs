//! Errors raised by terrain, propagation and grid backends

use thiserror::Error;

/// Failure reported by a [`TerrainModel`](super::TerrainModel) or [`HexGrid`](super::HexGrid)
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PropagationError {
    /// No elevation data covers the requested point
    #[error("no terrain coverage at ({lat}, {lon})")]
    OutOfCoverage { lat: f64, lon: f64 },

    /// Terrain tiles could not be opened or read
    #[error("terrain tiles unavailable: {details}")]
    TilesUnavailable { details: String },

    /// The propagation model rejected its inputs or did not produce a loss
    #[error("propagation model failure: {details}")]
    ModelFailure { details: String },

    /// Cell id not produced by this grid
    #[error("invalid cell {cell:#x}")]
    InvalidCell { cell: u64 },

    /// Resolution outside what the grid supports
    #[error("unsupported grid resolution {resolution}")]
    InvalidResolution { resolution: u8 },
}

pub type PropagationResult<T> = Result<T, PropagationError>;
