//! Capability traits for the terrain/propagation model and the hex grid

use crate::core::{GeoPoint, RefinedLocation, TerrainProfile};
use crate::propagation::PropagationResult;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Terrain elevation and path loss backend
///
/// Implementations own their data handles (tile files, caches) and release them
/// when dropped. All methods take `&self` so one model can serve a worker pool.
pub trait TerrainModel: Send + Sync {
    /// Ground elevation at a point (meters)
    fn elevation(&self, point: &GeoPoint) -> PropagationResult<f64>;

    /// Terrain profile between two antennas; `None` when no profile can be formed
    fn profile(&self, from: &RefinedLocation, to: &RefinedLocation) -> PropagationResult<Option<TerrainProfile>>;

    /// Total path loss over the profile (dB). Cheap; used for batch classification.
    fn point_to_point_loss(&self, profile: &TerrainProfile, frequency_hz: f64) -> PropagationResult<f64>;

    /// Cumulative path loss along the profile (dB). Expensive; used for reports only.
    ///
    /// Returns one value per profile sample after the transmitter, so `n - 1`
    /// values for an `n`-sample profile. The last value is the total loss over
    /// the whole path.
    fn profile_loss(&self, profile: &TerrainProfile, frequency_hz: f64) -> PropagationResult<Vec<f64>>;

    /// Check that the underlying data source can be used
    fn ensure_available(&self) -> PropagationResult<()> {
        Ok(())
    }
}

/// Hexagonal grid cell identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellId(pub u64);

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

/// Hierarchical hexagonal grid index
pub trait HexGrid: Send + Sync {
    /// Cell containing a point at the given resolution
    fn cell_for(&self, point: &GeoPoint, resolution: u8) -> PropagationResult<CellId>;

    /// Cells exactly `radius` hops from `cell` (the hollow ring, not the disk).
    /// May be empty near grid distortions.
    fn ring(&self, cell: CellId, radius: u32) -> PropagationResult<Vec<CellId>>;

    /// Centre of a cell
    fn center_of(&self, cell: CellId) -> PropagationResult<GeoPoint>;
}
