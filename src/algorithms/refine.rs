//! Antenna location refinement over a hex-grid neighbourhood

use crate::core::{Endpoint, GeoPoint, RefinedLocation, MAX_ANTENNA_HEIGHT_M, MIN_ANTENNA_HEIGHT_M};
use crate::propagation::{HexGrid, PropagationError, TerrainModel};
use crate::validation::error::LinkError;
use tracing::trace;

/// Clamp an asserted antenna height to the supported mounting range
pub fn clamp_antenna_height(height_m: f64) -> f64 {
    height_m.clamp(MIN_ANTENNA_HEIGHT_M, MAX_ANTENNA_HEIGHT_M)
}

/// Picks the most plausible antenna position near an asserted coordinate
///
/// The asserted coordinate is mapped to a grid cell; every cell exactly
/// `radius` hops away is a candidate and the highest candidate wins.
pub struct GeospatialRefiner<'a> {
    grid: &'a dyn HexGrid,
    terrain: &'a dyn TerrainModel,
    resolution: u8,
}

impl<'a> GeospatialRefiner<'a> {
    pub fn new(grid: &'a dyn HexGrid, terrain: &'a dyn TerrainModel, resolution: u8) -> Self {
        Self {
            grid,
            terrain,
            resolution,
        }
    }

    /// Refine one endpoint. `height_m` must already be clamped.
    pub fn refine(
        &self,
        lon: f64,
        lat: f64,
        height_m: f64,
        radius: u32,
        endpoint: Endpoint,
    ) -> Result<RefinedLocation, LinkError> {
        let asserted = GeoPoint::new(lat, lon);
        let cell = self
            .grid
            .cell_for(&asserted, self.resolution)
            .map_err(LinkError::computation("hex cell lookup"))?;
        let candidates = self
            .grid
            .ring(cell, radius)
            .map_err(LinkError::computation("hex ring lookup"))?;

        let mut best: Option<(GeoPoint, f64)> = None;
        for candidate in candidates {
            let center = self
                .grid
                .center_of(candidate)
                .map_err(LinkError::computation("hex cell centre"))?;
            let elevation = self
                .terrain
                .elevation(&center)
                .map_err(LinkError::computation("elevation lookup"))?;
            if !elevation.is_finite() {
                return Err(LinkError::computation("elevation lookup")(PropagationError::ModelFailure {
                    details: format!("non-finite elevation at cell {}", candidate),
                }));
            }
            // first candidate wins ties
            if best.map_or(true, |(_, highest)| elevation > highest) {
                best = Some((center, elevation));
            }
        }

        let (point, elevation) = best.ok_or(LinkError::Geometry {
            endpoint,
            lat,
            lon,
            radius,
        })?;
        trace!(%endpoint, lat = point.lat, lon = point.lon, elevation, "refined antenna location");
        Ok(RefinedLocation::new(point, height_m))
    }
}
